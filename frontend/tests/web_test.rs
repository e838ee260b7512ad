use std::rc::Rc;

use common::commit::{MoveOutcome, MovePhase, Notice, NoticeLevel, TreeSession};
use common::drop_zone::{classify, DropIndicator, DropZoneTracker, RowRect};
use common::{DropPosition, Hierarchy, NodeKind, Tree, TreeNode};
use frontend::hooks::{ContentTreeAction, ContentTreeState, ToastAction, ToastList};
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use yew::Reducible;

wasm_bindgen_test_configure!(run_in_browser);

fn course_tree() -> Tree {
    Tree::new(vec![
        TreeNode::new("c", "Course", NodeKind::Course).with_child(
            TreeNode::new("p", "Project", NodeKind::Project)
                .with_child(TreeNode::new("l1", "One", NodeKind::Lesson))
                .with_child(TreeNode::new("l2", "Two", NodeKind::Lesson)),
        ),
    ])
}

#[wasm_bindgen_test]
fn classifier_bands_rows() {
    let folders = Tree::new(vec![
        TreeNode::new("f1", "F1", NodeKind::Folder),
        TreeNode::new("f2", "F2", NodeKind::Folder),
    ]);
    let rect = RowRect::new(100.0, 140.0);

    assert_eq!(classify(&folders, "f1", "f2", rect, 105.0), Some(DropPosition::Before));
    assert_eq!(classify(&folders, "f1", "f2", rect, 120.0), Some(DropPosition::Inside));
    assert_eq!(classify(&folders, "f1", "f2", rect, 138.0), Some(DropPosition::After));
    assert_eq!(classify(&folders, "f1", "f1", rect, 120.0), None);

    // Projects cannot nest, so a project row only splits at its midpoint
    let projects = Tree::new(vec![
        TreeNode::new("c", "Course", NodeKind::Course)
            .with_child(TreeNode::new("p1", "P1", NodeKind::Project))
            .with_child(TreeNode::new("p2", "P2", NodeKind::Project)),
    ]);
    assert_eq!(classify(&projects, "p1", "p2", rect, 118.0), Some(DropPosition::Before));
    assert_eq!(classify(&projects, "p1", "p2", rect, 122.0), Some(DropPosition::After));
}

#[wasm_bindgen_test]
fn tracker_uses_browser_clock_values() {
    let mut tracker = DropZoneTracker::default();
    let indicator = DropIndicator {
        target_id: "l2".into(),
        position: DropPosition::After,
    };

    let first = tracker.observe(1_000.0, || Some(indicator.clone()));
    assert_eq!(first, Some(Some(indicator.clone())));
    // Within one frame nothing is re-evaluated
    assert_eq!(tracker.observe(1_005.0, || None), None);
    assert_eq!(tracker.observe(1_020.0, || Some(indicator.clone())), None);
    assert_eq!(tracker.reset(), Some(indicator));
}

#[wasm_bindgen_test]
fn session_applies_and_rolls_back_a_drop() {
    let mut session = TreeSession::new(Hierarchy::Courses, course_tree(), true);

    let ticket = session
        .begin_move("l1", "l2", DropPosition::After)
        .expect("legal drop");
    let order: Vec<&str> = session.tree().ids();
    assert_eq!(order, vec!["c", "p", "l2", "l1"]);

    assert!(session.mark_committing(ticket.id));
    assert!(session.is_committing());

    let settlement = session
        .settle(
            ticket.id,
            MoveOutcome::Failed {
                error: "Permission denied".into(),
            },
        )
        .expect("known move");
    assert_eq!(settlement.phase, MovePhase::RolledBack);
    assert_eq!(settlement.notice, Notice::error("Permission denied"));
    assert_eq!(session.tree(), &course_tree());
    assert!(!session.is_committing());
}

#[wasm_bindgen_test]
fn read_only_session_ignores_drops() {
    let mut session = TreeSession::new(Hierarchy::Courses, course_tree(), false);
    assert!(session.begin_move("l1", "l2", DropPosition::After).is_none());
    assert_eq!(session.tree(), &course_tree());
}

#[wasm_bindgen_test]
fn toasts_push_and_dismiss() {
    let list = Rc::new(ToastList::default());
    let list = list.reduce(ToastAction::Push(1, Notice::success("Lesson moved")));
    let list = list.reduce(ToastAction::Push(2, Notice::error("Failed to move item")));
    assert_eq!(list.items.len(), 2);

    let list = list.reduce(ToastAction::Dismiss(1));
    assert_eq!(list.items.len(), 1);
    assert_eq!(list.items[0].1.level, NoticeLevel::Error);
}

#[wasm_bindgen_test]
fn switching_hierarchy_drops_the_previous_tree() {
    let docs = Tree::new(vec![TreeNode::new("d", "Doc", NodeKind::Document)]);
    let state = Rc::new(ContentTreeState::default());
    let state = state.reduce(ContentTreeAction::Fetching(Hierarchy::Courses));
    let state = state.reduce(ContentTreeAction::Loaded(Hierarchy::Courses, course_tree()));
    assert_eq!(state.tree_for(Hierarchy::Courses), Some(&course_tree()));
    // Before the documents fetch even starts, the courses tree is not offered.
    assert_eq!(state.tree_for(Hierarchy::Documents), None);

    let state = state.reduce(ContentTreeAction::Fetching(Hierarchy::Documents));
    assert_eq!(state.tree, None);
    // A slow courses answer arriving after the switch is ignored.
    let state = state.reduce(ContentTreeAction::Loaded(Hierarchy::Courses, course_tree()));
    assert_eq!(state.tree_for(Hierarchy::Documents), None);

    let state = state.reduce(ContentTreeAction::Loaded(Hierarchy::Documents, docs.clone()));
    assert_eq!(state.tree_for(Hierarchy::Documents), Some(&docs));
    assert_eq!(state.tree_for(Hierarchy::Courses), None);
}

#[wasm_bindgen_test]
fn reload_keeps_tree_and_failure_keeps_it_too() {
    let state = Rc::new(ContentTreeState::default())
        .reduce(ContentTreeAction::Fetching(Hierarchy::Courses))
        .reduce(ContentTreeAction::Loaded(Hierarchy::Courses, course_tree()));
    let state = state.reduce(ContentTreeAction::Fetching(Hierarchy::Courses));
    assert_eq!(state.tree_for(Hierarchy::Courses), Some(&course_tree()));

    let state = state.reduce(ContentTreeAction::Failed(
        Hierarchy::Courses,
        "Could not load courses".into(),
    ));
    assert_eq!(state.error_for(Hierarchy::Courses), Some("Could not load courses"));
    assert_eq!(state.tree_for(Hierarchy::Courses), Some(&course_tree()));
    assert_eq!(state.error_for(Hierarchy::Documents), None);
}

#[wasm_bindgen_test]
fn closed_session_drops_late_settlement() {
    let mut session = TreeSession::new(Hierarchy::Courses, course_tree(), true);
    let ticket = session
        .begin_move("l1", "l2", DropPosition::After)
        .expect("legal drop");
    session.mark_committing(ticket.id);
    session.close();

    let late = MoveOutcome::Failed {
        error: "Permission denied".into(),
    };
    assert!(session.settle(ticket.id, late).is_none());
    assert!(!session.is_committing());
}
