//! Pointer position → drop position.
//!
//! Classification is advisory and side-effect free. It is recomputed on
//! every pointer move during a drag, so it only does a couple of tree
//! lookups and some arithmetic.

use crate::moves::DropPosition;
use crate::tree::{NodeKind, Tree};

/// Fraction of a container row's height given to the before/after edges.
const EDGE_BAND: f64 = 0.25;

/// Minimum spacing between two evaluations, ~60 per second.
pub const MIN_INTERVAL_MS: f64 = 1000.0 / 60.0;

/// Vertical extent of a rendered row, in client pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowRect {
    pub top: f64,
    pub bottom: f64,
}

impl RowRect {
    pub fn new(top: f64, bottom: f64) -> Self {
        Self { top, bottom }
    }

    pub fn height(&self) -> f64 {
        (self.bottom - self.top).max(0.0)
    }
}

/// Which positions a hovered row may offer to the dragged node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropOptions {
    pub inside: bool,
    pub siblings: bool,
}

impl DropOptions {
    /// `hovered_parent` is the kind of the hovered row's parent (`None` for
    /// a root row).
    pub fn for_kinds(
        dragged: NodeKind,
        hovered: NodeKind,
        hovered_parent: Option<NodeKind>,
    ) -> Self {
        Self {
            inside: hovered.accepts(dragged),
            siblings: dragged.fits_under(hovered_parent),
        }
    }

    pub fn any(&self) -> bool {
        self.inside || self.siblings
    }
}

/// Split a row into bands for the given options.
///
/// Container rows get before / inside / after at 25% / 50% / 25%. An edge
/// band whose sibling placement is not allowed folds into `Inside`.
/// Sibling-only rows split at the midpoint and never offer `Inside`.
pub fn band(options: DropOptions, rect: RowRect, pointer_y: f64) -> Option<DropPosition> {
    let height = rect.height();
    let relative_y = pointer_y - rect.top;

    match (options.inside, options.siblings) {
        (true, siblings) => {
            let edge = height * EDGE_BAND;
            let position = if relative_y < edge {
                DropPosition::Before
            } else if relative_y > height - edge {
                DropPosition::After
            } else {
                DropPosition::Inside
            };
            if position != DropPosition::Inside && !siblings {
                return Some(DropPosition::Inside);
            }
            Some(position)
        }
        (false, true) => {
            if relative_y < height / 2.0 {
                Some(DropPosition::Before)
            } else {
                Some(DropPosition::After)
            }
        }
        (false, false) => None,
    }
}

/// Decide where `drag_id` would land if released over `hovered_id`.
///
/// Returns `None` when the row is not a drop target at all: the dragged node
/// itself, one of its descendants, or a row where no placement is legal.
pub fn classify(
    tree: &Tree,
    drag_id: &str,
    hovered_id: &str,
    rect: RowRect,
    pointer_y: f64,
) -> Option<DropPosition> {
    if drag_id == hovered_id || tree.is_descendant(drag_id, hovered_id) {
        return None;
    }
    let dragged = tree.find_node_by_id(drag_id)?;
    let hovered = tree.find_node_by_id(hovered_id)?;
    let options = DropOptions::for_kinds(dragged.kind, hovered.kind, tree.parent_kind(hovered_id));
    band(options, rect, pointer_y)
}

/// The current drop indicator: which row, and where on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropIndicator {
    pub target_id: String,
    pub position: DropPosition,
}

/// Rate-limited, change-only view over [`classify`], owned by one tree
/// component for the duration of a drag.
#[derive(Debug, Clone)]
pub struct DropZoneTracker {
    min_interval_ms: f64,
    last_eval_ms: Option<f64>,
    current: Option<DropIndicator>,
}

impl Default for DropZoneTracker {
    fn default() -> Self {
        Self::new(MIN_INTERVAL_MS)
    }
}

impl DropZoneTracker {
    pub fn new(min_interval_ms: f64) -> Self {
        Self {
            min_interval_ms,
            last_eval_ms: None,
            current: None,
        }
    }

    pub fn current(&self) -> Option<&DropIndicator> {
        self.current.as_ref()
    }

    /// Feed one pointer sample taken at `now_ms`.
    ///
    /// `evaluate` is only called when the interval has elapsed. Returns
    /// `Some(new_indicator)` only if the decision changed; `Some(None)` means
    /// the indicator must be cleared.
    pub fn observe<F>(&mut self, now_ms: f64, evaluate: F) -> Option<Option<DropIndicator>>
    where
        F: FnOnce() -> Option<DropIndicator>,
    {
        if let Some(last) = self.last_eval_ms {
            if now_ms - last < self.min_interval_ms {
                return None;
            }
        }
        self.last_eval_ms = Some(now_ms);

        let next = evaluate();
        if next == self.current {
            return None;
        }
        self.current = next.clone();
        Some(next)
    }

    /// Forget the last decision and timing; called when a drag ends or
    /// leaves the tree.
    pub fn reset(&mut self) -> Option<DropIndicator> {
        self.last_eval_ms = None;
        self.current.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::fixtures::sample;
    use crate::tree::TreeNode;

    fn folders() -> Tree {
        Tree::new(vec![
            TreeNode::new("f1", "F1", NodeKind::Folder),
            TreeNode::new("f2", "F2", NodeKind::Folder)
                .with_child(TreeNode::new("f3", "F3", NodeKind::Folder)),
        ])
    }

    #[test]
    fn container_row_has_three_bands() {
        let tree = folders();
        let rect = RowRect::new(0.0, 100.0);
        assert_eq!(classify(&tree, "f1", "f2", rect, 10.0), Some(DropPosition::Before));
        assert_eq!(classify(&tree, "f1", "f2", rect, 50.0), Some(DropPosition::Inside));
        assert_eq!(classify(&tree, "f1", "f2", rect, 90.0), Some(DropPosition::After));
    }

    #[test]
    fn bands_are_relative_to_row_top() {
        let tree = folders();
        let rect = RowRect::new(200.0, 240.0);
        assert_eq!(classify(&tree, "f1", "f2", rect, 205.0), Some(DropPosition::Before));
        assert_eq!(classify(&tree, "f1", "f2", rect, 220.0), Some(DropPosition::Inside));
        assert_eq!(classify(&tree, "f1", "f2", rect, 238.0), Some(DropPosition::After));
    }

    #[test]
    fn sibling_row_splits_at_midpoint() {
        let tree = sample();
        let rect = RowRect::new(0.0, 100.0);
        assert_eq!(classify(&tree, "a", "c", rect, 40.0), Some(DropPosition::Before));
        assert_eq!(classify(&tree, "a", "c", rect, 60.0), Some(DropPosition::After));
        for y in (0..=100).step_by(5) {
            assert_ne!(
                classify(&tree, "a", "c", rect, f64::from(y)),
                Some(DropPosition::Inside)
            );
        }
    }

    #[test]
    fn lesson_over_project_only_nests() {
        // A lesson may not sit beside a project, so the edges fold into Inside.
        let tree = sample();
        let rect = RowRect::new(0.0, 100.0);
        for y in [5.0, 50.0, 95.0] {
            assert_eq!(classify(&tree, "a", "p1", rect, y), Some(DropPosition::Inside));
        }
    }

    #[test]
    fn project_over_course_edges_fold_inside() {
        // Projects never sit at the root, so a course row has no sibling bands.
        let tree = sample();
        let rect = RowRect::new(0.0, 100.0);
        for y in [2.0, 10.0, 50.0, 90.0, 98.0] {
            assert_eq!(classify(&tree, "p1", "y", rect, y), Some(DropPosition::Inside));
        }
    }

    #[test]
    fn self_descendants_and_illegal_rows_are_not_droppable() {
        let tree = sample();
        let rect = RowRect::new(0.0, 100.0);
        assert_eq!(classify(&tree, "x", "x", rect, 50.0), None);
        assert_eq!(classify(&tree, "x", "p1", rect, 50.0), None);
        assert_eq!(classify(&tree, "x", "b", rect, 10.0), None);
        // Lesson beside a course or a document: nowhere to go.
        assert_eq!(classify(&tree, "a", "y", rect, 50.0), None);
        assert_eq!(classify(&tree, "a", "e", rect, 50.0), None);
        assert_eq!(classify(&tree, "a", "missing", rect, 50.0), None);
    }

    #[test]
    fn project_over_course_and_documents_over_folders() {
        let tree = sample();
        let rect = RowRect::new(0.0, 100.0);
        assert_eq!(classify(&tree, "p1", "y", rect, 50.0), Some(DropPosition::Inside));
        assert_eq!(classify(&tree, "e", "f", rect, 10.0), Some(DropPosition::Before));
        assert_eq!(classify(&tree, "e", "f", rect, 50.0), Some(DropPosition::Inside));
        assert_eq!(classify(&tree, "f", "e", rect, 50.0), Some(DropPosition::After));
    }

    fn indicator(target: &str, position: DropPosition) -> Option<DropIndicator> {
        Some(DropIndicator {
            target_id: target.into(),
            position,
        })
    }

    #[test]
    fn tracker_throttles_and_reports_changes_only() {
        let mut tracker = DropZoneTracker::default();

        let first = tracker.observe(0.0, || indicator("a", DropPosition::Before));
        assert_eq!(first, Some(indicator("a", DropPosition::Before)));

        // Within the interval the evaluator must not even run.
        let skipped = tracker.observe(5.0, || panic!("evaluated while throttled"));
        assert_eq!(skipped, None);

        // Same decision after the interval: nothing to re-render.
        assert_eq!(tracker.observe(20.0, || indicator("a", DropPosition::Before)), None);

        let changed = tracker.observe(40.0, || indicator("a", DropPosition::After));
        assert_eq!(changed, Some(indicator("a", DropPosition::After)));

        let cleared = tracker.observe(60.0, || None);
        assert_eq!(cleared, Some(None));
        assert!(tracker.current().is_none());
    }

    #[test]
    fn tracker_reset_clears_state() {
        let mut tracker = DropZoneTracker::default();
        tracker.observe(100.0, || indicator("b", DropPosition::Inside));
        assert_eq!(tracker.reset(), indicator("b", DropPosition::Inside));
        assert!(tracker.current().is_none());
        // A fresh drag is evaluated immediately, regardless of timing.
        assert!(tracker
            .observe(101.0, || indicator("b", DropPosition::Inside))
            .is_some());
    }
}
