use common::commit::{Notice, TransportError};
use common::{ActionResponse, CreateNodeRequest, Hierarchy, NodeKind, SessionInfo, Tree};
use yew::prelude::*;

use crate::api;
use crate::components::tree_view::{NodeAction, TreeEditor};
use crate::hooks::use_content_tree;

#[derive(Properties, PartialEq)]
pub struct ContentPageProps {
    pub hierarchy: Hierarchy,
    pub session: SessionInfo,
    pub on_notice: Callback<Notice>,
}

/// One hierarchy: the tree editor plus create/rename/delete.
#[function_component(ContentPage)]
pub fn content_page(props: &ContentPageProps) -> Html {
    let content = use_content_tree(props.hierarchy);
    let shown = use_state(|| None::<Tree>);
    let editable = props.session.can_edit;

    let on_nodes_change = {
        let shown = shown.clone();
        Callback::from(move |tree: Tree| shown.set(Some(tree)))
    };

    let on_action = {
        let reload = content.reload.clone();
        let on_notice = props.on_notice.clone();
        Callback::from(move |action: NodeAction| {
            run_action(action, reload.clone(), on_notice.clone());
        })
    };

    let root_buttons = editable.then(|| {
        let buttons = NodeKind::ALL
            .into_iter()
            .filter(|kind| kind.hierarchy() == props.hierarchy && kind.allowed_at_root())
            .map(|kind| {
                let reload = content.reload.clone();
                let on_notice = props.on_notice.clone();
                html! {
                    <button class="add-root" onclick={move |_| add_node(None, kind, reload.clone(), on_notice.clone())}>
                        { format!("New {kind}") }
                    </button>
                }
            });
        html! { <div class="page-actions">{ for buttons }</div> }
    });

    let count = shown
        .as_ref()
        .or(content.tree.as_ref())
        .map(Tree::node_count)
        .unwrap_or_default();

    html! {
        <section class="content-page">
            <header class="page-header">
                <h2>{ title(props.hierarchy) }</h2>
                <span class="page-count">{ format!("{count} items") }</span>
                { for root_buttons }
            </header>
            if let Some(error) = content.error.clone() {
                <div class="error">{ error }</div>
            }
            {
                match content.tree.clone() {
                    Some(tree) => html! {
                        <TreeEditor
                            key={props.hierarchy.as_str()}
                            hierarchy={props.hierarchy}
                            {tree}
                            {editable}
                            {on_nodes_change}
                            on_notice={props.on_notice.clone()}
                            {on_action}
                        />
                    },
                    None => html! { <p class="loading">{"Loading…"}</p> },
                }
            }
        </section>
    }
}

fn title(hierarchy: Hierarchy) -> &'static str {
    match hierarchy {
        Hierarchy::Courses => "Courses",
        Hierarchy::Documents => "Documents",
    }
}

fn run_action(action: NodeAction, reload: Callback<()>, on_notice: Callback<Notice>) {
    match action {
        NodeAction::Add { parent_id, kind } => add_node(Some(parent_id), kind, reload, on_notice),
        NodeAction::Rename { id, title } => {
            let Some(title) = gloo_dialogs::prompt("New title:", Some(&title)) else {
                return;
            };
            wasm_bindgen_futures::spawn_local(async move {
                report(api::rename_node(&id, title).await, &on_notice);
                reload.emit(());
            });
        }
        NodeAction::Delete { id, title } => {
            if !gloo_dialogs::confirm(&format!("Delete \"{title}\" and everything inside it?")) {
                return;
            }
            wasm_bindgen_futures::spawn_local(async move {
                report(api::delete_node(&id).await, &on_notice);
                reload.emit(());
            });
        }
    }
}

fn add_node(
    parent_id: Option<String>,
    kind: NodeKind,
    reload: Callback<()>,
    on_notice: Callback<Notice>,
) {
    let Some(title) = gloo_dialogs::prompt(&format!("Title of the new {kind}:"), None) else {
        return;
    };
    if title.trim().is_empty() {
        return;
    }
    let request = CreateNodeRequest {
        kind,
        title,
        parent_id,
    };
    wasm_bindgen_futures::spawn_local(async move {
        report(api::create_node(&request).await, &on_notice);
        reload.emit(());
    });
}

fn report(result: Result<ActionResponse, TransportError>, on_notice: &Callback<Notice>) {
    let notice = match result {
        Ok(resp) if resp.success => Notice::success(resp.message.unwrap_or_else(|| "Saved".into())),
        Ok(resp) => Notice::error(resp.error.unwrap_or_else(|| "Request failed".into())),
        Err(err) => {
            tracing::warn!(%err, "content request failed");
            Notice::error("Request failed")
        }
    };
    on_notice.emit(notice);
}
