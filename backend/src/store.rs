//! Authoritative content store.
//!
//! Nodes are kept as flat records with an explicit `position` per sibling
//! group, the way a relational table would hold them. Each mutation works on
//! a copy of the records, writes the snapshot, and only then swaps the copy
//! in, all under the write lock, so a move is a single detach+insert step and
//! concurrent requests never observe a node without a parent.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use common::moves::{place, MoveRequest};
use common::{CreateNodeRequest, Hierarchy, NodeKind, Tree, TreeNode};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::AppError;

const MAX_TITLE_LEN: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub id: String,
    pub title: String,
    pub kind: NodeKind,
    pub parent_id: Option<String>,
    pub position: u32,
}

#[derive(Debug, Deserialize)]
struct Snapshot {
    nodes: Vec<NodeRecord>,
}

pub struct ContentStore {
    path: Option<PathBuf>,
    records: RwLock<Vec<NodeRecord>>,
}

impl ContentStore {
    /// Load the snapshot at `path`, or start empty if there is none yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let path = path.into();
        let records = if path.exists() {
            let snapshot: Snapshot = serde_json::from_str(&fs::read_to_string(&path)?)?;
            info!(path = %path.display(), nodes = snapshot.nodes.len(), "loaded content snapshot");
            snapshot.nodes
        } else {
            info!(path = %path.display(), "no content snapshot, starting empty");
            Vec::new()
        };

        for hierarchy in [Hierarchy::Courses, Hierarchy::Documents] {
            let tree = build_tree(&records, hierarchy);
            tree.check_invariants()
                .map_err(|e| AppError::Validation(format!("content snapshot is inconsistent: {e}")))?;
            // Records whose parent is missing never make it into the tree
            let stored = records.iter().filter(|r| r.kind.hierarchy() == hierarchy).count();
            if tree.node_count() != stored {
                return Err(AppError::Validation(format!(
                    "content snapshot has {} unreachable {} records",
                    stored.saturating_sub(tree.node_count()),
                    hierarchy.as_str()
                )));
            }
        }

        Ok(Self {
            path: Some(path),
            records: RwLock::new(records),
        })
    }

    /// A store that never touches the filesystem.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            records: RwLock::new(Vec::new()),
        }
    }

    pub async fn tree(&self, hierarchy: Hierarchy) -> Tree {
        build_tree(&self.records.read().await, hierarchy)
    }

    pub async fn move_node(&self, request: &MoveRequest) -> Result<String, AppError> {
        let mut records = self.records.write().await;
        let node_id = request.node_id();
        let kind = records
            .iter()
            .find(|r| r.id == node_id)
            .map(|r| r.kind)
            .ok_or_else(|| AppError::NotFound(node_id.to_string()))?;
        if !request.accepts_kind(kind) {
            return Err(AppError::WrongKind {
                id: node_id.to_string(),
                expected: expected_label(request),
                actual: kind,
            });
        }

        let hierarchy = request.hierarchy();
        let tree = build_tree(&records, hierarchy);
        let moved = place(&tree, node_id, &request.destination())?;

        let mut next: Vec<NodeRecord> = records
            .iter()
            .filter(|r| r.kind.hierarchy() != hierarchy)
            .cloned()
            .collect();
        next.extend(flatten(&moved));
        self.commit(&mut records, next)?;

        debug!(node_id, ?hierarchy, "node moved");
        Ok(format!("{} moved successfully", capitalized(kind)))
    }

    /// Add a node at the end of its parent's children. Returns the new id.
    pub async fn create_node(&self, request: &CreateNodeRequest) -> Result<String, AppError> {
        let title = validate_title(&request.title)?;
        let mut records = self.records.write().await;

        let parent_kind = match request.parent_id.as_deref() {
            Some(parent_id) => Some(
                records
                    .iter()
                    .find(|r| r.id == parent_id)
                    .map(|r| r.kind)
                    .ok_or_else(|| AppError::NotFound(parent_id.to_string()))?,
            ),
            None => None,
        };
        if !request.kind.fits_under(parent_kind) {
            return Err(common::moves::MoveError::Containment {
                child: request.kind,
                parent: parent_kind,
            }
            .into());
        }

        let position = sibling_count(&records, request.parent_id.as_deref(), request.kind.hierarchy());
        let id = uuid::Uuid::new_v4().to_string();
        let mut next = records.clone();
        next.push(NodeRecord {
            id: id.clone(),
            title,
            kind: request.kind,
            parent_id: request.parent_id.clone(),
            position,
        });
        self.commit(&mut records, next)?;

        info!(%id, kind = %request.kind, "node created");
        Ok(id)
    }

    pub async fn rename_node(&self, id: &str, title: &str) -> Result<NodeKind, AppError> {
        let title = validate_title(title)?;
        let mut records = self.records.write().await;

        let mut next = records.clone();
        let record = next
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| AppError::NotFound(id.to_string()))?;
        record.title = title;
        let kind = record.kind;
        self.commit(&mut records, next)?;
        Ok(kind)
    }

    /// Delete a node and everything below it. Returns how many were removed.
    pub async fn delete_node(&self, id: &str) -> Result<(NodeKind, usize), AppError> {
        let mut records = self.records.write().await;
        let target = records
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(id.to_string()))?;

        let doomed = subtree_ids(&records, id);
        let mut next: Vec<NodeRecord> = records
            .iter()
            .filter(|r| !doomed.contains(r.id.as_str()))
            .cloned()
            .collect();
        let removed = doomed.len();
        renumber_siblings(&mut next, target.parent_id.as_deref(), target.kind.hierarchy());
        self.commit(&mut records, next)?;

        info!(id, removed, "node deleted");
        Ok((target.kind, removed))
    }

    fn commit(&self, records: &mut Vec<NodeRecord>, next: Vec<NodeRecord>) -> Result<(), AppError> {
        if let Some(path) = &self.path {
            write_snapshot(path, &next)?;
        }
        *records = next;
        Ok(())
    }
}

fn write_snapshot(path: &Path, nodes: &[NodeRecord]) -> Result<(), AppError> {
    let json = serde_json::to_string_pretty(&SnapshotRef { nodes })?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    nodes: &'a [NodeRecord],
}

fn validate_title(title: &str) -> Result<String, AppError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("Title must not be empty".into()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::Validation(format!(
            "Title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(title.to_string())
}

fn expected_label(request: &MoveRequest) -> &'static str {
    match request {
        MoveRequest::Lesson(_) => "lesson",
        MoveRequest::Project(_) => "project",
        MoveRequest::Course(_) => "course",
        MoveRequest::Document(_) => "folder or document",
    }
}

fn capitalized(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Course => "Course",
        NodeKind::Project => "Project",
        NodeKind::Lesson => "Lesson",
        NodeKind::Folder => "Folder",
        NodeKind::Document => "Document",
    }
}

fn in_group(record: &NodeRecord, parent_id: Option<&str>, hierarchy: Hierarchy) -> bool {
    record.parent_id.as_deref() == parent_id && record.kind.hierarchy() == hierarchy
}

fn sibling_count(records: &[NodeRecord], parent_id: Option<&str>, hierarchy: Hierarchy) -> u32 {
    let count = records
        .iter()
        .filter(|r| in_group(r, parent_id, hierarchy))
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

fn renumber_siblings(records: &mut [NodeRecord], parent_id: Option<&str>, hierarchy: Hierarchy) {
    let mut group: Vec<&mut NodeRecord> = records
        .iter_mut()
        .filter(|r| in_group(r, parent_id, hierarchy))
        .collect();
    group.sort_by_key(|r| r.position);
    for (position, record) in (0u32..).zip(group) {
        record.position = position;
    }
}

fn subtree_ids<'a>(records: &'a [NodeRecord], root: &'a str) -> HashSet<&'a str> {
    let mut doomed = HashSet::from([root]);
    let mut frontier = vec![root];
    while let Some(current) = frontier.pop() {
        for child in records
            .iter()
            .filter(|r| r.parent_id.as_deref() == Some(current))
        {
            if doomed.insert(child.id.as_str()) {
                frontier.push(child.id.as_str());
            }
        }
    }
    doomed
}

/// Assemble the ordered tree of one hierarchy from flat records.
pub fn build_tree(records: &[NodeRecord], hierarchy: Hierarchy) -> Tree {
    let mut by_parent: HashMap<Option<&str>, Vec<&NodeRecord>> = HashMap::new();
    for record in records.iter().filter(|r| r.kind.hierarchy() == hierarchy) {
        by_parent
            .entry(record.parent_id.as_deref())
            .or_default()
            .push(record);
    }
    for siblings in by_parent.values_mut() {
        siblings.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.id.cmp(&b.id)));
    }

    fn assemble<'a>(
        record: &'a NodeRecord,
        by_parent: &HashMap<Option<&'a str>, Vec<&'a NodeRecord>>,
        visiting: &mut HashSet<String>,
    ) -> TreeNode {
        let mut node = TreeNode::new(record.id.clone(), record.title.clone(), record.kind);
        node.parent_id = record.parent_id.clone();
        if visiting.insert(record.id.clone()) {
            if let Some(children) = by_parent.get(&Some(record.id.as_str())) {
                node.children = children
                    .iter()
                    .map(|child| assemble(child, by_parent, visiting))
                    .collect();
            }
        } else {
            warn!(id = %record.id, "cycle in stored records, truncating");
        }
        node
    }

    let mut visiting = HashSet::new();
    let roots = by_parent
        .get(&None)
        .map(|roots| {
            roots
                .iter()
                .map(|record| assemble(record, &by_parent, &mut visiting))
                .collect()
        })
        .unwrap_or_default();
    Tree::new(roots)
}

/// Inverse of [`build_tree`]: positions become dense sibling indexes.
pub fn flatten(tree: &Tree) -> Vec<NodeRecord> {
    fn walk(nodes: &[TreeNode], out: &mut Vec<NodeRecord>) {
        for (position, node) in (0u32..).zip(nodes) {
            out.push(NodeRecord {
                id: node.id.clone(),
                title: node.title.clone(),
                kind: node.kind,
                parent_id: node.parent_id.clone(),
                position,
            });
            walk(&node.children, out);
        }
    }
    let mut out = Vec::with_capacity(tree.node_count());
    walk(&tree.roots, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::moves::{MoveLessonRequest, SiblingPosition};

    fn record(id: &str, kind: NodeKind, parent: Option<&str>, position: u32) -> NodeRecord {
        NodeRecord {
            id: id.into(),
            title: id.to_uppercase(),
            kind,
            parent_id: parent.map(Into::into),
            position,
        }
    }

    fn records() -> Vec<NodeRecord> {
        vec![
            record("l2", NodeKind::Lesson, Some("p"), 1),
            record("c", NodeKind::Course, None, 0),
            record("l1", NodeKind::Lesson, Some("p"), 0),
            record("p", NodeKind::Project, Some("c"), 0),
            record("doc", NodeKind::Document, None, 0),
        ]
    }

    #[test]
    fn build_tree_orders_by_position_and_splits_hierarchies() {
        let courses = build_tree(&records(), Hierarchy::Courses);
        assert_eq!(courses.node_count(), 4);
        let lessons: Vec<&str> = courses.roots[0].children[0]
            .children
            .iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(lessons, vec!["l1", "l2"]);
        assert_eq!(courses.check_invariants(), Ok(()));

        let docs = build_tree(&records(), Hierarchy::Documents);
        assert_eq!(docs.ids(), vec!["doc"]);
    }

    #[test]
    fn flatten_renumbers_densely() {
        let mut records = records();
        records[0].position = 7;
        let tree = build_tree(&records, Hierarchy::Courses);
        let flat = flatten(&tree);
        let l2 = flat.iter().find(|r| r.id == "l2").unwrap();
        assert_eq!(l2.position, 1);
        assert_eq!(build_tree(&flat, Hierarchy::Courses), tree);
    }

    #[test]
    fn subtree_collects_descendants() {
        let records = records();
        let ids = subtree_ids(&records, "c");
        assert_eq!(ids, HashSet::from(["c", "p", "l1", "l2"]));
    }

    #[tokio::test]
    async fn move_then_reload_from_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("content.json");
        write_snapshot(&path, &records()).unwrap();

        let store = ContentStore::open(&path).unwrap();
        let request = MoveRequest::Lesson(MoveLessonRequest {
            lesson_id: "l1".into(),
            target_project_id: "p".into(),
            position: Some(SiblingPosition::After),
            target_lesson_id: Some("l2".into()),
        });
        let message = store.move_node(&request).await.unwrap();
        assert_eq!(message, "Lesson moved successfully");

        let reopened = ContentStore::open(&path).unwrap();
        let tree = reopened.tree(Hierarchy::Courses).await;
        let order: Vec<&str> = tree.roots[0].children[0]
            .children
            .iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(order, vec!["l2", "l1"]);
    }

    #[test]
    fn open_rejects_inconsistent_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("content.json");
        write_snapshot(&path, &[record("l", NodeKind::Lesson, None, 0)]).unwrap();
        assert!(matches!(
            ContentStore::open(&path),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn open_rejects_orphaned_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("content.json");
        let mut nodes = records();
        nodes.push(record("lost", NodeKind::Lesson, Some("gone"), 0));
        write_snapshot(&path, &nodes).unwrap();
        assert!(matches!(
            ContentStore::open(&path),
            Err(AppError::Validation(_))
        ));
    }
}
