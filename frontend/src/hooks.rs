use std::rc::Rc;

use common::commit::Notice;
use common::{Hierarchy, SessionInfo, Tree};
use gloo_timers::future::TimeoutFuture;
use yew::prelude::*;

use crate::api;

const TOAST_MS: u32 = 4_000;

#[derive(Clone, PartialEq, Debug)]
pub enum SessionState {
    Loading,
    SignedOut,
    SignedIn(SessionInfo),
}

#[derive(Clone, PartialEq)]
pub struct SessionHandle {
    pub state: SessionState,
    /// Ask the server again, e.g. after login or logout.
    pub refresh: Callback<()>,
}

#[hook]
pub fn use_session_info() -> SessionHandle {
    let state = use_state(|| SessionState::Loading);
    let generation = use_state(|| 0u32);

    {
        let state = state.clone();
        use_effect_with(*generation, move |_| {
            wasm_bindgen_futures::spawn_local(async move {
                let next = match api::me().await {
                    Ok(Some(info)) => SessionState::SignedIn(info),
                    Ok(None) => SessionState::SignedOut,
                    Err(err) => {
                        tracing::warn!(%err, "could not load session");
                        SessionState::SignedOut
                    }
                };
                state.set(next);
            });
            || ()
        });
    }

    let refresh = {
        let generation = generation.clone();
        Callback::from(move |_| generation.set(generation.wrapping_add(1)))
    };

    SessionHandle {
        state: (*state).clone(),
        refresh,
    }
}

#[derive(Clone, PartialEq)]
pub struct ContentTree {
    pub tree: Option<Tree>,
    pub error: Option<String>,
    pub reload: Callback<()>,
}

/// Last fetch result, tagged with the hierarchy it was fetched for.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct ContentTreeState {
    pub hierarchy: Option<Hierarchy>,
    pub tree: Option<Tree>,
    pub error: Option<String>,
}

pub enum ContentTreeAction {
    /// A fetch for this hierarchy is starting.
    Fetching(Hierarchy),
    Loaded(Hierarchy, Tree),
    Failed(Hierarchy, String),
}

impl ContentTreeState {
    /// The tree to show for `hierarchy`; never one fetched for another.
    pub fn tree_for(&self, hierarchy: Hierarchy) -> Option<&Tree> {
        self.tree.as_ref().filter(|_| self.hierarchy == Some(hierarchy))
    }

    pub fn error_for(&self, hierarchy: Hierarchy) -> Option<&str> {
        self.error.as_deref().filter(|_| self.hierarchy == Some(hierarchy))
    }
}

impl Reducible for ContentTreeState {
    type Action = ContentTreeAction;

    fn reduce(self: Rc<Self>, action: Self::Action) -> Rc<Self> {
        match action {
            // A reload keeps the current tree on screen until the new one lands.
            ContentTreeAction::Fetching(hierarchy) if self.hierarchy == Some(hierarchy) => self,
            ContentTreeAction::Fetching(hierarchy) => Rc::new(Self {
                hierarchy: Some(hierarchy),
                tree: None,
                error: None,
            }),
            ContentTreeAction::Loaded(hierarchy, tree) if self.hierarchy == Some(hierarchy) => {
                Rc::new(Self {
                    hierarchy: Some(hierarchy),
                    tree: Some(tree),
                    error: None,
                })
            }
            ContentTreeAction::Failed(hierarchy, error) if self.hierarchy == Some(hierarchy) => {
                Rc::new(Self {
                    hierarchy: Some(hierarchy),
                    tree: self.tree.clone(),
                    error: Some(error),
                })
            }
            // Late answer for a hierarchy no longer shown.
            ContentTreeAction::Loaded(..) | ContentTreeAction::Failed(..) => self,
        }
    }
}

/// Authoritative tree for one hierarchy, refetched whenever `reload` fires.
#[hook]
pub fn use_content_tree(hierarchy: Hierarchy) -> ContentTree {
    let state = use_reducer(ContentTreeState::default);
    let generation = use_state(|| 0u32);

    {
        let state = state.clone();
        use_effect_with((hierarchy, *generation), move |(hierarchy, _)| {
            let hierarchy = *hierarchy;
            state.dispatch(ContentTreeAction::Fetching(hierarchy));
            wasm_bindgen_futures::spawn_local(async move {
                match api::fetch_tree(hierarchy).await {
                    Ok(fetched) => state.dispatch(ContentTreeAction::Loaded(hierarchy, fetched)),
                    Err(err) => {
                        tracing::warn!(%err, hierarchy = hierarchy.as_str(), "tree fetch failed");
                        let message = format!("Could not load {}", hierarchy.as_str());
                        state.dispatch(ContentTreeAction::Failed(hierarchy, message));
                    }
                }
            });
            || ()
        });
    }

    let reload = {
        let generation = generation.clone();
        Callback::from(move |_| generation.set(generation.wrapping_add(1)))
    };

    ContentTree {
        tree: state.tree_for(hierarchy).cloned(),
        error: state.error_for(hierarchy).map(str::to_owned),
        reload,
    }
}

#[derive(Clone, PartialEq, Default)]
pub struct ToastList {
    pub items: Vec<(u64, Notice)>,
}

pub enum ToastAction {
    Push(u64, Notice),
    Dismiss(u64),
}

impl Reducible for ToastList {
    type Action = ToastAction;

    fn reduce(self: Rc<Self>, action: Self::Action) -> Rc<Self> {
        let mut next = (*self).clone();
        match action {
            ToastAction::Push(id, notice) => next.items.push((id, notice)),
            ToastAction::Dismiss(id) => next.items.retain(|(item, _)| *item != id),
        }
        Rc::new(next)
    }
}

#[derive(Clone)]
pub struct ToastHandle {
    pub list: UseReducerHandle<ToastList>,
    pub push: Callback<Notice>,
    pub dismiss: Callback<u64>,
}

/// Notifications that disappear on their own after a few seconds.
#[hook]
pub fn use_toasts() -> ToastHandle {
    let list = use_reducer(ToastList::default);
    let next_id = use_mut_ref(|| 0u64);

    let dismiss = {
        let list = list.dispatcher();
        Callback::from(move |id: u64| list.dispatch(ToastAction::Dismiss(id)))
    };

    let push = {
        let dispatcher = list.dispatcher();
        Callback::from(move |notice: Notice| {
            let id = {
                let mut next_id = next_id.borrow_mut();
                *next_id += 1;
                *next_id
            };
            dispatcher.dispatch(ToastAction::Push(id, notice));
            let dispatcher = dispatcher.clone();
            wasm_bindgen_futures::spawn_local(async move {
                TimeoutFuture::new(TOAST_MS).await;
                dispatcher.dispatch(ToastAction::Dismiss(id));
            });
        })
    };

    ToastHandle {
        list,
        push,
        dismiss,
    }
}
