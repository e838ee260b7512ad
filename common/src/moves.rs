//! Tree relocation.
//!
//! [`place`] is the single primitive: detach a node (with its subtree) and
//! re-insert it under a parent, relative to an anchor sibling. The
//! drag-and-drop reducer ([`apply_move`]) and the server-side move handlers
//! both go through it, so the client's optimistic result and the
//! authoritative result follow the same containment and cycle rules.

use serde::{Deserialize, Serialize};

use crate::tree::{Hierarchy, NodeKind, Tree};

/// Relationship between the dragged node and the hovered target at drop time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropPosition {
    Before,
    After,
    Inside,
}

/// The sibling-relative subset of [`DropPosition`] that goes over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiblingPosition {
    Before,
    After,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anchor {
    /// Append to the end of the parent's children.
    End,
    Before(String),
    After(String),
}

/// Where a node should end up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    /// `None` places the node among the roots.
    pub parent_id: Option<String>,
    pub anchor: Anchor,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error("cannot move an item relative to itself")]
    SameNode,
    #[error("item {0} not found")]
    NotFound(String),
    #[error("cannot move an item into its own subtree")]
    Cycle,
    #[error("a {child} cannot be placed {}", placement_label(.parent))]
    Containment {
        child: NodeKind,
        parent: Option<NodeKind>,
    },
    #[error("{anchor} is no longer a child of the target; refresh and try again")]
    StaleAnchor { anchor: String },
}

fn placement_label(parent: &Option<NodeKind>) -> String {
    match parent {
        Some(kind) => format!("inside a {kind}"),
        None => "at the top level".to_string(),
    }
}

/// Relocate `node_id` to `destination`, returning the new tree.
///
/// The receiver is never modified; on error nothing has been detached.
pub fn place(tree: &Tree, node_id: &str, destination: &Destination) -> Result<Tree, MoveError> {
    let node = tree
        .find_node_by_id(node_id)
        .ok_or_else(|| MoveError::NotFound(node_id.to_string()))?;

    let parent_kind = match destination.parent_id.as_deref() {
        Some(parent_id) => {
            if parent_id == node_id || tree.is_descendant(node_id, parent_id) {
                return Err(MoveError::Cycle);
            }
            let parent = tree
                .find_node_by_id(parent_id)
                .ok_or_else(|| MoveError::NotFound(parent_id.to_string()))?;
            Some(parent.kind)
        }
        None => None,
    };

    if !node.kind.fits_under(parent_kind) {
        return Err(MoveError::Containment {
            child: node.kind,
            parent: parent_kind,
        });
    }

    if let Anchor::Before(anchor) | Anchor::After(anchor) = &destination.anchor {
        if anchor == node_id {
            return Err(MoveError::SameNode);
        }
        let placement = tree
            .placement_of(anchor)
            .ok_or_else(|| MoveError::NotFound(anchor.clone()))?;
        if placement.parent_id != destination.parent_id {
            return Err(MoveError::StaleAnchor {
                anchor: anchor.clone(),
            });
        }
    }

    let mut next = tree.clone();
    let from = next
        .placement_of(node_id)
        .ok_or_else(|| MoveError::NotFound(node_id.to_string()))?;
    let mut detached = next
        .children_of_mut(from.parent_id.as_deref())
        .map(|siblings| siblings.remove(from.index))
        .ok_or_else(|| MoveError::NotFound(node_id.to_string()))?;
    detached.parent_id = destination.parent_id.clone();

    let siblings = next
        .children_of_mut(destination.parent_id.as_deref())
        .ok_or_else(|| MoveError::NotFound(destination.parent_id.clone().unwrap_or_default()))?;
    let index = match &destination.anchor {
        Anchor::End => siblings.len(),
        Anchor::Before(anchor) | Anchor::After(anchor) => {
            let at = siblings
                .iter()
                .position(|sibling| &sibling.id == anchor)
                .ok_or_else(|| MoveError::NotFound(anchor.clone()))?;
            if matches!(destination.anchor, Anchor::After(_)) {
                at + 1
            } else {
                at
            }
        }
    };
    siblings.insert(index, detached);
    Ok(next)
}

/// Translate a drop gesture into a [`Destination`].
pub fn destination_for(
    tree: &Tree,
    drag_id: &str,
    drop_id: &str,
    position: DropPosition,
) -> Result<Destination, MoveError> {
    if drag_id == drop_id {
        return Err(MoveError::SameNode);
    }
    match position {
        DropPosition::Inside => {
            if tree.find_node_by_id(drop_id).is_none() {
                return Err(MoveError::NotFound(drop_id.to_string()));
            }
            Ok(Destination {
                parent_id: Some(drop_id.to_string()),
                anchor: Anchor::End,
            })
        }
        DropPosition::Before | DropPosition::After => {
            let placement = tree
                .placement_of(drop_id)
                .ok_or_else(|| MoveError::NotFound(drop_id.to_string()))?;
            let anchor = if position == DropPosition::Before {
                Anchor::Before(drop_id.to_string())
            } else {
                Anchor::After(drop_id.to_string())
            };
            Ok(Destination {
                parent_id: placement.parent_id,
                anchor,
            })
        }
    }
}

/// Like [`apply_move`], but reports why a move was refused.
pub fn try_apply_move(
    tree: &Tree,
    drag_id: &str,
    drop_id: &str,
    position: DropPosition,
) -> Result<Tree, MoveError> {
    let destination = destination_for(tree, drag_id, drop_id, position)?;
    place(tree, drag_id, &destination)
}

/// Optimistic reducer: the moved tree, or an identical copy of `tree` when
/// the move is not allowed.
pub fn apply_move(tree: &Tree, drag_id: &str, drop_id: &str, position: DropPosition) -> Tree {
    match try_apply_move(tree, drag_id, drop_id, position) {
        Ok(next) => next,
        Err(err) => {
            tracing::debug!(drag_id, drop_id, ?position, %err, "move rejected");
            tree.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveLessonRequest {
    pub lesson_id: String,
    pub target_project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<SiblingPosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_lesson_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveProjectRequest {
    pub project_id: String,
    pub target_course_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<SiblingPosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_project_id: Option<String>,
}

/// Courses only live at the top level, so they can only be reordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveCourseRequest {
    pub course_id: String,
    pub position: SiblingPosition,
    pub target_course_id: String,
}

/// Folders and documents share one relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveDocumentRequest {
    pub node_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_folder_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<SiblingPosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_node_id: Option<String>,
}

/// A durable move, addressed to the backend relation of the moved kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveRequest {
    Lesson(MoveLessonRequest),
    Project(MoveProjectRequest),
    Course(MoveCourseRequest),
    Document(MoveDocumentRequest),
}

fn anchor_from(position: Option<SiblingPosition>, target: Option<&String>) -> Anchor {
    match (position, target) {
        (Some(SiblingPosition::Before), Some(id)) => Anchor::Before(id.clone()),
        (Some(SiblingPosition::After), Some(id)) => Anchor::After(id.clone()),
        _ => Anchor::End,
    }
}

fn split_anchor(anchor: &Anchor) -> (Option<SiblingPosition>, Option<String>) {
    match anchor {
        Anchor::End => (None, None),
        Anchor::Before(id) => (Some(SiblingPosition::Before), Some(id.clone())),
        Anchor::After(id) => (Some(SiblingPosition::After), Some(id.clone())),
    }
}

impl MoveRequest {
    /// Build the request for a drop on the tree as it was before the move.
    pub fn resolve(
        tree: &Tree,
        drag_id: &str,
        drop_id: &str,
        position: DropPosition,
    ) -> Result<MoveRequest, MoveError> {
        let kind = tree
            .find_node_by_id(drag_id)
            .map(|node| node.kind)
            .ok_or_else(|| MoveError::NotFound(drag_id.to_string()))?;
        let destination = destination_for(tree, drag_id, drop_id, position)?;
        Self::for_destination(drag_id, kind, &destination)
    }

    pub fn for_destination(
        node_id: &str,
        kind: NodeKind,
        destination: &Destination,
    ) -> Result<MoveRequest, MoveError> {
        let (position, target) = split_anchor(&destination.anchor);
        let containment = || MoveError::Containment {
            child: kind,
            parent: None,
        };

        let request = match kind {
            NodeKind::Lesson => MoveRequest::Lesson(MoveLessonRequest {
                lesson_id: node_id.to_string(),
                target_project_id: destination.parent_id.clone().ok_or_else(containment)?,
                position,
                target_lesson_id: target,
            }),
            NodeKind::Project => MoveRequest::Project(MoveProjectRequest {
                project_id: node_id.to_string(),
                target_course_id: destination.parent_id.clone().ok_or_else(containment)?,
                position,
                target_project_id: target,
            }),
            NodeKind::Course => match (position, target) {
                (Some(position), Some(target)) if destination.parent_id.is_none() => {
                    MoveRequest::Course(MoveCourseRequest {
                        course_id: node_id.to_string(),
                        position,
                        target_course_id: target,
                    })
                }
                _ => return Err(containment()),
            },
            NodeKind::Folder | NodeKind::Document => MoveRequest::Document(MoveDocumentRequest {
                node_id: node_id.to_string(),
                target_folder_id: destination.parent_id.clone(),
                position,
                target_node_id: target,
            }),
        };
        Ok(request)
    }

    pub fn node_id(&self) -> &str {
        match self {
            MoveRequest::Lesson(req) => &req.lesson_id,
            MoveRequest::Project(req) => &req.project_id,
            MoveRequest::Course(req) => &req.course_id,
            MoveRequest::Document(req) => &req.node_id,
        }
    }

    pub fn destination(&self) -> Destination {
        match self {
            MoveRequest::Lesson(req) => Destination {
                parent_id: Some(req.target_project_id.clone()),
                anchor: anchor_from(req.position, req.target_lesson_id.as_ref()),
            },
            MoveRequest::Project(req) => Destination {
                parent_id: Some(req.target_course_id.clone()),
                anchor: anchor_from(req.position, req.target_project_id.as_ref()),
            },
            MoveRequest::Course(req) => Destination {
                parent_id: None,
                anchor: anchor_from(Some(req.position), Some(&req.target_course_id)),
            },
            MoveRequest::Document(req) => Destination {
                parent_id: req.target_folder_id.clone(),
                anchor: anchor_from(req.position, req.target_node_id.as_ref()),
            },
        }
    }

    /// The kinds the backend relation for this request may move.
    pub fn accepts_kind(&self, kind: NodeKind) -> bool {
        match self {
            MoveRequest::Lesson(_) => kind == NodeKind::Lesson,
            MoveRequest::Project(_) => kind == NodeKind::Project,
            MoveRequest::Course(_) => kind == NodeKind::Course,
            MoveRequest::Document(_) => matches!(kind, NodeKind::Folder | NodeKind::Document),
        }
    }

    pub fn hierarchy(&self) -> Hierarchy {
        match self {
            MoveRequest::Lesson(_) | MoveRequest::Project(_) | MoveRequest::Course(_) => {
                Hierarchy::Courses
            }
            MoveRequest::Document(_) => Hierarchy::Documents,
        }
    }

    pub fn endpoint(&self) -> &'static str {
        match self {
            MoveRequest::Lesson(_) => "/api/lessons/move",
            MoveRequest::Project(_) => "/api/projects/move",
            MoveRequest::Course(_) => "/api/courses/move",
            MoveRequest::Document(_) => "/api/documents/move",
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        match self {
            MoveRequest::Lesson(req) => serde_json::to_string(req),
            MoveRequest::Project(req) => serde_json::to_string(req),
            MoveRequest::Course(req) => serde_json::to_string(req),
            MoveRequest::Document(req) => serde_json::to_string(req),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::fixtures::{child_ids, sample};
    use crate::tree::TreeNode;

    const ALL: [DropPosition; 3] = [DropPosition::Before, DropPosition::After, DropPosition::Inside];

    #[test]
    fn moving_onto_itself_is_a_no_op() {
        let tree = sample();
        for id in tree.ids() {
            for position in ALL {
                assert_eq!(apply_move(&tree, id, id, position), tree);
            }
        }
    }

    #[test]
    fn reorder_lesson_within_project() {
        let tree = sample();
        let next = apply_move(&tree, "a", "b", DropPosition::After);
        assert_eq!(child_ids(&next, "p1"), vec!["b", "a", "c"]);
        assert_eq!(next.find_node_by_id("a").unwrap().parent_id.as_deref(), Some("p1"));
        assert_eq!(next.check_invariants(), Ok(()));
    }

    #[test]
    fn lesson_moves_before_sibling() {
        let next = apply_move(&sample(), "c", "a", DropPosition::Before);
        assert_eq!(child_ids(&next, "p1"), vec!["c", "a", "b"]);
    }

    #[test]
    fn nest_project_into_sibling_course() {
        let tree = sample();
        let next = apply_move(&tree, "p1", "y", DropPosition::Inside);
        assert!(child_ids(&next, "x").is_empty());
        assert_eq!(child_ids(&next, "y"), vec!["p1"]);
        let p1 = next.find_node_by_id("p1").unwrap();
        assert_eq!(p1.parent_id.as_deref(), Some("y"));
        assert_eq!(p1.children.len(), 3);
    }

    #[test]
    fn lesson_inside_lesson_is_inert() {
        let tree = sample();
        assert_eq!(
            try_apply_move(&tree, "a", "b", DropPosition::Inside),
            Err(MoveError::Containment {
                child: NodeKind::Lesson,
                parent: Some(NodeKind::Lesson)
            })
        );
        assert_eq!(apply_move(&tree, "a", "b", DropPosition::Inside), tree);
    }

    #[test]
    fn course_inside_lesson_is_rejected() {
        let tree = sample();
        assert_eq!(apply_move(&tree, "y", "a", DropPosition::Inside), tree);
    }

    #[test]
    fn cycles_are_rejected() {
        let tree = sample();
        for position in ALL {
            assert_eq!(apply_move(&tree, "x", "p1", position), tree);
            assert_eq!(apply_move(&tree, "x", "b", position), tree);
        }

        let nested = Tree::new(vec![TreeNode::new("f1", "F1", NodeKind::Folder)
            .with_child(TreeNode::new("f2", "F2", NodeKind::Folder))]);
        assert_eq!(
            try_apply_move(&nested, "f1", "f2", DropPosition::Inside),
            Err(MoveError::Cycle)
        );
    }

    #[test]
    fn valid_moves_conserve_nodes() {
        let tree = sample();
        let mut before: Vec<&str> = tree.ids();
        before.sort_unstable();

        for drag in tree.ids() {
            for drop in tree.ids() {
                for position in ALL {
                    let Ok(next) = try_apply_move(&tree, drag, drop, position) else {
                        continue;
                    };
                    assert_eq!(next.node_count(), tree.node_count());
                    let mut after = next.ids();
                    after.sort_unstable();
                    assert_eq!(after, before, "{drag} {position:?} {drop}");
                    assert_eq!(next.check_invariants(), Ok(()), "{drag} {position:?} {drop}");
                }
            }
        }
    }

    #[test]
    fn documents_move_between_folder_and_root() {
        let tree = sample();
        let next = apply_move(&tree, "e", "f", DropPosition::Inside);
        assert_eq!(child_ids(&next, "f"), vec!["d", "e"]);

        let next = apply_move(&next, "d", "f", DropPosition::Before);
        let roots: Vec<&str> = next.roots.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(roots, vec!["x", "y", "d", "f"]);
        assert!(next.find_node_by_id("d").unwrap().parent_id.is_none());
    }

    #[test]
    fn stale_anchor_is_reported() {
        let tree = sample();
        let destination = Destination {
            parent_id: Some("y".into()),
            anchor: Anchor::After("a".into()),
        };
        assert_eq!(
            place(&tree, "p1", &destination),
            Err(MoveError::StaleAnchor { anchor: "a".into() })
        );
    }

    #[test]
    fn resolve_builds_relation_specific_requests() {
        let tree = sample();
        let req = MoveRequest::resolve(&tree, "a", "c", DropPosition::After).unwrap();
        assert_eq!(
            req,
            MoveRequest::Lesson(MoveLessonRequest {
                lesson_id: "a".into(),
                target_project_id: "p1".into(),
                position: Some(SiblingPosition::After),
                target_lesson_id: Some("c".into()),
            })
        );
        assert_eq!(req.endpoint(), "/api/lessons/move");

        let req = MoveRequest::resolve(&tree, "p1", "y", DropPosition::Inside).unwrap();
        assert_eq!(
            req.destination(),
            Destination {
                parent_id: Some("y".into()),
                anchor: Anchor::End
            }
        );

        let req = MoveRequest::resolve(&tree, "y", "x", DropPosition::Before).unwrap();
        assert!(matches!(req, MoveRequest::Course(_)));

        let req = MoveRequest::resolve(&tree, "d", "e", DropPosition::After).unwrap();
        assert_eq!(req.hierarchy(), Hierarchy::Documents);
        assert_eq!(
            req.to_json().unwrap(),
            r#"{"nodeId":"d","position":"after","targetNodeId":"e"}"#
        );
    }

    #[test]
    fn request_destination_matches_reducer() {
        let tree = sample();
        let req = MoveRequest::resolve(&tree, "c", "a", DropPosition::Before).unwrap();
        let via_request = place(&tree, req.node_id(), &req.destination()).unwrap();
        assert_eq!(via_request, apply_move(&tree, "c", "a", DropPosition::Before));
    }
}
