//! Drag-and-drop tree editor.
//!
//! The component owns a [`TreeSession`] and a [`DropZoneTracker`] for its
//! lifetime. Drops are applied optimistically, sent through
//! [`HttpMoveTransport`], and reconciled when the server answers; the parent
//! hears about every displayed tree through `on_nodes_change`.

use std::cell::RefCell;
use std::rc::Rc;

use common::commit::{commit_move, MoveTicket, Notice, TreeSession};
use common::drop_zone::{classify, DropIndicator, DropOptions, DropZoneTracker, RowRect};
use common::{DropPosition, Hierarchy, NodeKind, Tree, TreeNode};
use wasm_bindgen::JsCast;
use web_sys::{DragEvent, Element, Node};
use yew::prelude::*;

use crate::api::HttpMoveTransport;

/// Edits the tree editor cannot perform itself and hands to its parent.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeAction {
    Add { parent_id: String, kind: NodeKind },
    Rename { id: String, title: String },
    Delete { id: String, title: String },
}

#[derive(Properties, PartialEq)]
pub struct TreeEditorProps {
    pub hierarchy: Hierarchy,
    pub tree: Tree,
    pub editable: bool,
    /// Called with every tree the editor displays, optimistic or reconciled.
    pub on_nodes_change: Callback<Tree>,
    #[prop_or_default]
    pub on_notice: Callback<Notice>,
    #[prop_or_default]
    pub on_action: Callback<NodeAction>,
}

#[derive(Default)]
struct DragState {
    tracker: DropZoneTracker,
    dragging: Option<String>,
}

#[function_component(TreeEditor)]
pub fn tree_editor(props: &TreeEditorProps) -> Html {
    let session = {
        let (hierarchy, tree, editable) = (props.hierarchy, props.tree.clone(), props.editable);
        use_mut_ref(move || TreeSession::new(hierarchy, tree, editable))
    };
    let drag = use_mut_ref(DragState::default);
    let indicator = use_state(|| None::<DropIndicator>);
    let dragging_kind = use_state(|| None::<NodeKind>);
    let container = use_node_ref();
    let redraw = use_force_update();

    // A tree echoed back from `on_nodes_change` is already displayed.
    {
        let session = session.clone();
        let redraw = redraw.clone();
        let on_nodes_change = props.on_nodes_change.clone();
        use_effect_with(props.tree.clone(), move |tree| {
            let replaced = {
                let mut session = session.borrow_mut();
                if session.tree() != tree {
                    session.replace_tree(tree.clone());
                    Some(session.tree().clone())
                } else {
                    None
                }
            };
            if let Some(displayed) = replaced {
                on_nodes_change.emit(displayed);
                redraw.force_update();
            }
            || ()
        });
    }

    {
        let session = session.clone();
        use_effect_with(props.editable, move |editable| {
            session.borrow_mut().set_editable(*editable);
            || ()
        });
    }

    // Commits still in flight when the editor goes away must not report back.
    {
        let session = session.clone();
        use_effect_with((), move |_| move || session.borrow_mut().close());
    }

    let on_drag_start = {
        let session = session.clone();
        let drag = drag.clone();
        let dragging_kind = dragging_kind.clone();
        Callback::from(move |(id, e): (String, DragEvent)| {
            let session = session.borrow();
            if !session.is_editable() {
                e.prevent_default();
                return;
            }
            if let Some(transfer) = e.data_transfer() {
                transfer.set_effect_allowed("move");
                if let Err(err) = transfer.set_data("text/plain", &id) {
                    tracing::debug!(?err, "could not set drag payload");
                }
            }
            dragging_kind.set(session.tree().find_node_by_id(&id).map(|node| node.kind));

            let mut drag = drag.borrow_mut();
            drag.tracker.reset();
            drag.dragging = Some(id);
        })
    };

    let on_drag_over = {
        let session = session.clone();
        let drag = drag.clone();
        let indicator = indicator.clone();
        Callback::from(move |(id, e): (String, DragEvent)| {
            let mut drag = drag.borrow_mut();
            let Some(drag_id) = drag.dragging.clone() else {
                return;
            };
            let Some(rect) = row_rect(&e) else {
                return;
            };
            let pointer_y = f64::from(e.client_y());

            let session = session.borrow();
            let change = drag.tracker.observe(now_ms(), || {
                classify(session.tree(), &drag_id, &id, rect, pointer_y).map(|position| {
                    DropIndicator {
                        target_id: id.clone(),
                        position,
                    }
                })
            });
            if let Some(change) = change {
                indicator.set(change);
            }

            if drag.tracker.current().is_some_and(|current| current.target_id == id) {
                e.prevent_default();
                if let Some(transfer) = e.data_transfer() {
                    transfer.set_drop_effect("move");
                }
            }
        })
    };

    let on_drop = {
        let session = session.clone();
        let drag = drag.clone();
        let indicator = indicator.clone();
        let dragging_kind = dragging_kind.clone();
        let on_nodes_change = props.on_nodes_change.clone();
        let on_notice = props.on_notice.clone();
        let redraw = redraw.clone();
        Callback::from(move |e: DragEvent| {
            e.prevent_default();
            let (drag_id, target) = {
                let mut drag = drag.borrow_mut();
                (drag.dragging.take(), drag.tracker.reset())
            };
            indicator.set(None);
            dragging_kind.set(None);

            let (Some(drag_id), Some(target)) = (drag_id, target) else {
                return;
            };
            let ticket = session
                .borrow_mut()
                .begin_move(&drag_id, &target.target_id, target.position);
            let Some(ticket) = ticket else {
                return;
            };

            on_nodes_change.emit(session.borrow().tree().clone());
            redraw.force_update();
            spawn_commit(
                session.clone(),
                ticket,
                on_nodes_change.clone(),
                on_notice.clone(),
                redraw.clone(),
            );
        })
    };

    let on_drag_end = {
        let drag = drag.clone();
        let indicator = indicator.clone();
        let dragging_kind = dragging_kind.clone();
        Callback::from(move |_: DragEvent| {
            let mut drag = drag.borrow_mut();
            drag.tracker.reset();
            drag.dragging = None;
            indicator.set(None);
            dragging_kind.set(None);
        })
    };

    let on_drag_leave = {
        let drag = drag.clone();
        let indicator = indicator.clone();
        let container = container.clone();
        Callback::from(move |e: DragEvent| {
            let next = e
                .related_target()
                .and_then(|target| target.dyn_into::<Node>().ok());
            let still_inside = match (container.get(), next) {
                (Some(container), Some(next)) => container.contains(Some(&next)),
                _ => false,
            };
            if !still_inside {
                drag.borrow_mut().tracker.reset();
                indicator.set(None);
            }
        })
    };

    let on_toggle = {
        let session = session.clone();
        let redraw = redraw.clone();
        Callback::from(move |id: String| {
            session.borrow_mut().toggle_expanded(&id);
            redraw.force_update();
        })
    };

    let rows = RowHandlers {
        editable: props.editable,
        indicator: (*indicator).clone(),
        dragging_kind: *dragging_kind,
        on_drag_start,
        on_drag_over,
        on_drop,
        on_drag_end,
        on_toggle,
        on_action: props.on_action.clone(),
    };

    let session = session.borrow();
    let tree = session.tree();
    html! {
        <div class="tree-editor" role="tree" ref={container} ondragleave={on_drag_leave}>
            if session.is_committing() {
                <div class="tree-status">{"Moving…"}</div>
            }
            if tree.is_empty() {
                <p class="tree-empty">{"Nothing here yet"}</p>
            } else {
                { render_nodes(&tree.roots, None, 0, &rows) }
            }
        </div>
    }
}

fn spawn_commit(
    session: Rc<RefCell<TreeSession>>,
    ticket: MoveTicket,
    on_nodes_change: Callback<Tree>,
    on_notice: Callback<Notice>,
    redraw: UseForceUpdateHandle,
) {
    session.borrow_mut().mark_committing(ticket.id);
    wasm_bindgen_futures::spawn_local(async move {
        let outcome = commit_move(&HttpMoveTransport, &ticket.request).await;
        let settlement = session.borrow_mut().settle(ticket.id, outcome);
        let Some(settlement) = settlement else {
            tracing::debug!(move_id = ticket.id, "settlement for a closed editor dropped");
            return;
        };
        tracing::debug!(
            move_id = ticket.id,
            hierarchy = session.borrow().hierarchy().as_str(),
            phase = ?settlement.phase,
            "move settled"
        );
        on_nodes_change.emit(session.borrow().tree().clone());
        on_notice.emit(settlement.notice);
        redraw.force_update();
    });
}

// Yew delegates listeners to the app root, so `current_target` is not the
// row; walk up from the element under the pointer instead.
fn row_rect(e: &DragEvent) -> Option<RowRect> {
    let target = e.target()?.dyn_into::<Element>().ok()?;
    let row = target.closest(".tree-row").ok()??;
    let rect = row.get_bounding_client_rect();
    Some(RowRect::new(rect.top(), rect.bottom()))
}

fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|window| window.performance())
        .map(|performance| performance.now())
        .unwrap_or_else(js_sys::Date::now)
}

#[derive(Clone)]
struct RowHandlers {
    editable: bool,
    indicator: Option<DropIndicator>,
    dragging_kind: Option<NodeKind>,
    on_drag_start: Callback<(String, DragEvent)>,
    on_drag_over: Callback<(String, DragEvent)>,
    on_drop: Callback<DragEvent>,
    on_drag_end: Callback<DragEvent>,
    on_toggle: Callback<String>,
    on_action: Callback<NodeAction>,
}

fn render_nodes(
    nodes: &[TreeNode],
    parent_kind: Option<NodeKind>,
    depth: usize,
    rows: &RowHandlers,
) -> Html {
    html! {
        <ul class="tree-list" role="group">
            { for nodes.iter().map(|node| render_node(node, parent_kind, depth, rows)) }
        </ul>
    }
}

fn render_node(
    node: &TreeNode,
    parent_kind: Option<NodeKind>,
    depth: usize,
    rows: &RowHandlers,
) -> Html {
    let marker = rows
        .indicator
        .as_ref()
        .filter(|indicator| indicator.target_id == node.id)
        .map(|indicator| match indicator.position {
            DropPosition::Before => "drop-before",
            DropPosition::After => "drop-after",
            DropPosition::Inside => "drop-inside",
        });
    let no_target = rows
        .dragging_kind
        .is_some_and(|dragged| !DropOptions::for_kinds(dragged, node.kind, parent_kind).any());

    let ondragstart = {
        let on_drag_start = rows.on_drag_start.clone();
        let id = node.id.clone();
        Callback::from(move |e: DragEvent| {
            e.stop_propagation();
            on_drag_start.emit((id.clone(), e));
        })
    };
    let ondragover = {
        let on_drag_over = rows.on_drag_over.clone();
        let id = node.id.clone();
        Callback::from(move |e: DragEvent| {
            e.stop_propagation();
            on_drag_over.emit((id.clone(), e));
        })
    };
    let ondrop = {
        let on_drop = rows.on_drop.clone();
        Callback::from(move |e: DragEvent| {
            e.stop_propagation();
            on_drop.emit(e);
        })
    };
    let ondragend = rows.on_drag_end.clone();

    let toggle = node.kind.is_container().then(|| {
        let on_toggle = rows.on_toggle.clone();
        let id = node.id.clone();
        let glyph = if node.is_expanded { "▾" } else { "▸" };
        html! {
            <button class="tree-toggle" onclick={move |_| on_toggle.emit(id.clone())}>{ glyph }</button>
        }
    });

    let actions = rows.editable.then(|| node_actions(node, &rows.on_action));

    html! {
        <li key={node.id.clone()} class="tree-item" role="treeitem"
            aria-expanded={node.kind.is_container().then(|| node.is_expanded.to_string())}>
            <div
                class={classes!(
                    "tree-row",
                    format!("kind-{}", node.kind.label()),
                    marker,
                    no_target.then_some("drop-disabled"),
                )}
                style={format!("padding-left: {:.2}rem", depth as f64 * 1.25)}
                draggable={if rows.editable { "true" } else { "false" }}
                {ondragstart}
                {ondragover}
                {ondrop}
                {ondragend}
            >
                if rows.editable {
                    <span class="drag-handle" aria-hidden="true">{"⠿"}</span>
                }
                { for toggle }
                <span class="tree-title">{ &node.title }</span>
                <span class="tree-kind">{ node.kind.label() }</span>
                { for actions }
            </div>
            if node.is_expanded && !node.children.is_empty() {
                { render_nodes(&node.children, Some(node.kind), depth + 1, rows) }
            }
        </li>
    }
}

fn node_actions(node: &TreeNode, on_action: &Callback<NodeAction>) -> Html {
    let add_buttons = NodeKind::ALL
        .into_iter()
        .filter(|kind| node.kind.accepts(*kind))
        .map(|kind| {
            let on_action = on_action.clone();
            let parent_id = node.id.clone();
            html! {
                <button class="tree-action" title={format!("Add {kind}")}
                    onclick={move |_| on_action.emit(NodeAction::Add { parent_id: parent_id.clone(), kind })}>
                    { format!("+ {kind}") }
                </button>
            }
        });

    let on_rename = {
        let on_action = on_action.clone();
        let (id, title) = (node.id.clone(), node.title.clone());
        Callback::from(move |_: MouseEvent| {
            on_action.emit(NodeAction::Rename {
                id: id.clone(),
                title: title.clone(),
            })
        })
    };
    let on_delete = {
        let on_action = on_action.clone();
        let (id, title) = (node.id.clone(), node.title.clone());
        Callback::from(move |_: MouseEvent| {
            on_action.emit(NodeAction::Delete {
                id: id.clone(),
                title: title.clone(),
            })
        })
    };

    html! {
        <span class="tree-actions">
            { for add_buttons }
            <button class="tree-action" onclick={on_rename}>{"Rename"}</button>
            <button class="tree-action danger" onclick={on_delete}>{"Delete"}</button>
        </span>
    }
}
