pub mod content_page;
pub mod login;
pub mod toast;
pub mod tree_view;
