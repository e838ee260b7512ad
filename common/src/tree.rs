//! In-memory content hierarchy.
//!
//! A [`Tree`] is an ordered forest of [`TreeNode`]s. A node's position is its
//! index in its parent's `children` (or in `roots`). Trees are treated as
//! values: every edit returns a new tree and leaves the receiver untouched, so
//! callers can keep the previous value around for rollback.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// The closed set of node types across both hierarchies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeKind {
    Course,
    Project,
    Lesson,
    Folder,
    Document,
}

/// Which of the two independent hierarchies a node lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hierarchy {
    Courses,
    Documents,
}

impl NodeKind {
    pub const ALL: [NodeKind; 5] = [
        NodeKind::Course,
        NodeKind::Project,
        NodeKind::Lesson,
        NodeKind::Folder,
        NodeKind::Document,
    ];

    /// Whether a node of this kind may hold `child` in its children list.
    pub fn accepts(self, child: NodeKind) -> bool {
        match self {
            NodeKind::Course => child == NodeKind::Project,
            NodeKind::Project => child == NodeKind::Lesson,
            NodeKind::Folder => matches!(child, NodeKind::Folder | NodeKind::Document),
            NodeKind::Lesson | NodeKind::Document => false,
        }
    }

    pub fn allowed_at_root(self) -> bool {
        match self {
            NodeKind::Course | NodeKind::Folder | NodeKind::Document => true,
            NodeKind::Project | NodeKind::Lesson => false,
        }
    }

    pub fn is_container(self) -> bool {
        match self {
            NodeKind::Course | NodeKind::Project | NodeKind::Folder => true,
            NodeKind::Lesson | NodeKind::Document => false,
        }
    }

    pub fn hierarchy(self) -> Hierarchy {
        match self {
            NodeKind::Course | NodeKind::Project | NodeKind::Lesson => Hierarchy::Courses,
            NodeKind::Folder | NodeKind::Document => Hierarchy::Documents,
        }
    }

    /// Whether a node of this kind may sit under `parent` (`None` = root).
    pub fn fits_under(self, parent: Option<NodeKind>) -> bool {
        match parent {
            Some(parent) => parent.accepts(self),
            None => self.allowed_at_root(),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            NodeKind::Course => "course",
            NodeKind::Project => "project",
            NodeKind::Lesson => "lesson",
            NodeKind::Folder => "folder",
            NodeKind::Document => "document",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Hierarchy {
    pub fn as_str(self) -> &'static str {
        match self {
            Hierarchy::Courses => "courses",
            Hierarchy::Documents => "documents",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub id: String,
    pub title: String,
    pub kind: NodeKind,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub children: Vec<TreeNode>,
    /// Transient UI state; never sent over the wire.
    #[serde(skip)]
    pub is_expanded: bool,
}

impl TreeNode {
    pub fn new(id: impl Into<String>, title: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            kind,
            parent_id: None,
            children: Vec::new(),
            is_expanded: false,
        }
    }

    /// Builder-style child append that keeps `parent_id` consistent.
    pub fn with_child(mut self, mut child: TreeNode) -> Self {
        child.parent_id = Some(self.id.clone());
        self.children.push(child);
        self
    }

    fn count(&self) -> usize {
        1 + self.children.iter().map(TreeNode::count).sum::<usize>()
    }

    fn find(&self, id: &str) -> Option<&TreeNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut TreeNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| child.find_mut(id))
    }

    fn collect_ids<'a>(&'a self, out: &mut Vec<&'a str>) {
        out.push(&self.id);
        for child in &self.children {
            child.collect_ids(out);
        }
    }
}

/// Where a node sits: its parent (`None` for roots) and its index there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub parent_id: Option<String>,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Tree {
    pub roots: Vec<TreeNode>,
}

impl Tree {
    pub fn new(roots: Vec<TreeNode>) -> Self {
        Self { roots }
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.roots.iter().map(TreeNode::count).sum()
    }

    /// All ids in pre-order.
    pub fn ids(&self) -> Vec<&str> {
        let mut out = Vec::new();
        for root in &self.roots {
            root.collect_ids(&mut out);
        }
        out
    }

    pub fn find_node_by_id(&self, id: &str) -> Option<&TreeNode> {
        self.roots.iter().find_map(|root| root.find(id))
    }

    pub(crate) fn find_node_mut(&mut self, id: &str) -> Option<&mut TreeNode> {
        self.roots.iter_mut().find_map(|root| root.find_mut(id))
    }

    /// True when `candidate_id` lives strictly below `ancestor_id`.
    pub fn is_descendant(&self, ancestor_id: &str, candidate_id: &str) -> bool {
        self.find_node_by_id(ancestor_id)
            .map(|ancestor| {
                ancestor
                    .children
                    .iter()
                    .any(|child| child.find(candidate_id).is_some())
            })
            .unwrap_or(false)
    }

    /// Locate a node's parent and sibling index.
    pub fn placement_of(&self, id: &str) -> Option<Placement> {
        if let Some(index) = self.roots.iter().position(|n| n.id == id) {
            return Some(Placement {
                parent_id: None,
                index,
            });
        }
        let mut stack: Vec<&TreeNode> = self.roots.iter().collect();
        while let Some(node) = stack.pop() {
            if let Some(index) = node.children.iter().position(|c| c.id == id) {
                return Some(Placement {
                    parent_id: Some(node.id.clone()),
                    index,
                });
            }
            stack.extend(node.children.iter());
        }
        None
    }

    /// Kind of the node that owns `id`, or `None` for a root or unknown id.
    pub fn parent_kind(&self, id: &str) -> Option<NodeKind> {
        let parent_id = self.placement_of(id)?.parent_id?;
        self.find_node_by_id(&parent_id).map(|parent| parent.kind)
    }

    /// Sibling list that holds `parent_id`'s children (`None` = roots).
    pub(crate) fn children_of_mut(&mut self, parent_id: Option<&str>) -> Option<&mut Vec<TreeNode>> {
        match parent_id {
            None => Some(&mut self.roots),
            Some(id) => self.find_node_mut(id).map(|node| &mut node.children),
        }
    }

    pub fn set_expanded(&self, id: &str, expanded: bool) -> Tree {
        let mut next = self.clone();
        if let Some(node) = next.find_node_mut(id) {
            node.is_expanded = expanded;
        }
        next
    }

    pub fn toggle_expanded(&self, id: &str) -> Tree {
        let expanded = self
            .find_node_by_id(id)
            .map(|node| node.is_expanded)
            .unwrap_or(false);
        self.set_expanded(id, !expanded)
    }

    /// Carry the transient expansion flags of `previous` over to `self`, for
    /// nodes present in both. Used when an authoritative fetch replaces the
    /// working copy.
    pub fn with_expansion_from(mut self, previous: &Tree) -> Tree {
        fn walk(node: &mut TreeNode, previous: &Tree) {
            if let Some(old) = previous.find_node_by_id(&node.id) {
                node.is_expanded = old.is_expanded;
            }
            for child in &mut node.children {
                walk(child, previous);
            }
        }
        for root in &mut self.roots {
            walk(root, previous);
        }
        self
    }

    /// Verify unique ids, consistent `parent_id`s and kind containment.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let mut seen = HashSet::new();
        let mut stack: Vec<(&TreeNode, Option<&TreeNode>)> =
            self.roots.iter().map(|root| (root, None)).collect();

        while let Some((node, parent)) = stack.pop() {
            if !seen.insert(node.id.as_str()) {
                return Err(InvariantViolation::DuplicateId(node.id.clone()));
            }
            let expected = parent.map(|p| p.id.as_str());
            if node.parent_id.as_deref() != expected {
                return Err(InvariantViolation::ParentMismatch(node.id.clone()));
            }
            if !node.kind.fits_under(parent.map(|p| p.kind)) {
                return Err(InvariantViolation::Containment {
                    id: node.id.clone(),
                    kind: node.kind,
                });
            }
            stack.extend(node.children.iter().map(|child| (child, Some(node))));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("node {0} appears more than once")]
    DuplicateId(String),
    #[error("node {0} has a parent id that does not match its position")]
    ParentMismatch(String),
    #[error("{kind} {id} is not allowed at its position")]
    Containment { id: String, kind: NodeKind },
}


#[cfg(test)]
mod tests {
    use super::fixtures::sample;
    use super::*;

    #[test]
    fn containment_rules() {
        assert!(NodeKind::Course.accepts(NodeKind::Project));
        assert!(NodeKind::Project.accepts(NodeKind::Lesson));
        assert!(!NodeKind::Course.accepts(NodeKind::Lesson));
        assert!(!NodeKind::Lesson.accepts(NodeKind::Lesson));
        assert!(NodeKind::Folder.accepts(NodeKind::Folder));
        assert!(NodeKind::Folder.accepts(NodeKind::Document));
        assert!(!NodeKind::Document.accepts(NodeKind::Document));
        assert!(!NodeKind::Project.allowed_at_root());
        assert!(NodeKind::Document.fits_under(None));
    }

    #[test]
    fn lookup_and_descendants() {
        let tree = sample();
        assert_eq!(tree.node_count(), 9);
        assert_eq!(tree.find_node_by_id("b").map(|n| n.kind), Some(NodeKind::Lesson));
        assert!(tree.find_node_by_id("nope").is_none());

        assert!(tree.is_descendant("x", "c"));
        assert!(tree.is_descendant("p1", "a"));
        assert!(!tree.is_descendant("a", "p1"));
        assert!(!tree.is_descendant("x", "x"));
        assert!(!tree.is_descendant("y", "a"));
    }

    #[test]
    fn placement_reports_parent_and_index() {
        let tree = sample();
        assert_eq!(
            tree.placement_of("c"),
            Some(Placement {
                parent_id: Some("p1".into()),
                index: 2
            })
        );
        assert_eq!(
            tree.placement_of("f"),
            Some(Placement {
                parent_id: None,
                index: 2
            })
        );
        assert_eq!(tree.parent_kind("a"), Some(NodeKind::Project));
        assert_eq!(tree.parent_kind("x"), None);
    }

    #[test]
    fn sample_is_consistent() {
        assert_eq!(sample().check_invariants(), Ok(()));
    }

    #[test]
    fn invariants_catch_bad_parent_and_containment() {
        let mut tree = sample();
        tree.roots[0].children[0].parent_id = Some("y".into());
        assert_eq!(
            tree.check_invariants(),
            Err(InvariantViolation::ParentMismatch("p1".into()))
        );

        let tree = Tree::new(vec![TreeNode::new("l", "Loose", NodeKind::Lesson)]);
        assert!(matches!(
            tree.check_invariants(),
            Err(InvariantViolation::Containment { .. })
        ));
    }

    #[test]
    fn expansion_is_transient_and_carried_over() {
        let tree = sample().toggle_expanded("p1");
        assert!(tree.find_node_by_id("p1").unwrap().is_expanded);

        let json = serde_json::to_string(&tree).unwrap();
        assert!(!json.contains("isExpanded"));
        let fetched: Tree = serde_json::from_str(&json).unwrap();
        assert!(!fetched.find_node_by_id("p1").unwrap().is_expanded);

        let restored = fetched.with_expansion_from(&tree);
        assert!(restored.find_node_by_id("p1").unwrap().is_expanded);
    }

    #[test]
    fn kinds_serialize_screaming_case() {
        let json = serde_json::to_string(&NodeKind::Lesson).unwrap();
        assert_eq!(json, "\"LESSON\"");
        let node = TreeNode::new("a", "A", NodeKind::Document);
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["kind"], "DOCUMENT");
        assert!(value.get("parentId").is_some());
    }
}
