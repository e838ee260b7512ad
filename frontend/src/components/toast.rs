use common::commit::{Notice, NoticeLevel};
use yew::prelude::*;

#[derive(Properties, PartialEq)]
pub struct ToastsProps {
    pub items: Vec<(u64, Notice)>,
    pub on_dismiss: Callback<u64>,
}

#[function_component(Toasts)]
pub fn toasts(props: &ToastsProps) -> Html {
    html! {
        <div class="toasts" role="status" aria-live="polite">
            { for props.items.iter().map(|(id, notice)| {
                let id = *id;
                let on_dismiss = props.on_dismiss.clone();
                let level = match notice.level {
                    NoticeLevel::Success => "toast-success",
                    NoticeLevel::Error => "toast-error",
                };
                html! {
                    <div key={id} class={classes!("toast", level)}>
                        <span>{ &notice.message }</span>
                        <button class="toast-close" onclick={move |_| on_dismiss.emit(id)}>{"✕"}</button>
                    </div>
                }
            }) }
        </div>
    }
}
