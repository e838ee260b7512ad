//! Optimistic move commits.
//!
//! Each drop goes through `Optimistic → Committing → {Committed | RolledBack}`.
//! [`TreeSession`] keeps the last server-confirmed tree as a plain value next
//! to the displayed one, so rolling back a move is dropping it and replaying
//! whatever is still in flight. [`commit_move`] talks to the backend through
//! [`MoveTransport`].

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::moves::{place, try_apply_move, DropPosition, MoveRequest};
use crate::tree::{Hierarchy, Tree};
use crate::ActionResponse;

/// Shown when a move fails without a structured error from the server.
pub const GENERIC_MOVE_ERROR: &str = "Failed to move item";
const DEFAULT_MOVE_MESSAGE: &str = "Item moved";

pub type MoveId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovePhase {
    Idle,
    Optimistic,
    Committing,
    Committed,
    RolledBack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A user-facing notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),
    #[error("could not decode response: {0}")]
    Decode(String),
    #[error("server responded with status {status}")]
    Status { status: u16 },
}

/// The backend as seen by the commit protocol.
#[allow(async_fn_in_trait)]
pub trait MoveTransport {
    async fn send_move(&self, request: &MoveRequest) -> Result<ActionResponse, TransportError>;

    async fn fetch_tree(&self, hierarchy: Hierarchy) -> Result<Tree, TransportError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum MoveOutcome {
    /// The server accepted the move. `tree` is the authoritative tree, or
    /// `None` if it could not be fetched afterwards.
    Committed { tree: Option<Tree>, message: String },
    Failed { error: String },
}

/// Send one move and, on success, fetch the authoritative tree. Never retried.
pub async fn commit_move<T>(transport: &T, request: &MoveRequest) -> MoveOutcome
where
    T: MoveTransport + ?Sized,
{
    let response = match transport.send_move(request).await {
        Ok(response) => response,
        Err(err) => {
            warn!(node_id = request.node_id(), %err, "move request did not complete");
            return MoveOutcome::Failed {
                error: GENERIC_MOVE_ERROR.to_string(),
            };
        }
    };

    if !response.success {
        let error = response
            .error
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| GENERIC_MOVE_ERROR.to_string());
        info!(node_id = request.node_id(), %error, "move rejected by server");
        return MoveOutcome::Failed { error };
    }

    let message = response
        .message
        .unwrap_or_else(|| DEFAULT_MOVE_MESSAGE.to_string());
    let tree = match transport.fetch_tree(request.hierarchy()).await {
        Ok(tree) => Some(tree),
        Err(err) => {
            warn!(%err, "move committed but refreshing the tree failed");
            None
        }
    };
    MoveOutcome::Committed { tree, message }
}

/// A move that has been applied locally and still awaits the server.
#[derive(Debug, Clone)]
struct PendingMove {
    id: MoveId,
    phase: MovePhase,
    request: MoveRequest,
}

/// Handed to the caller by [`TreeSession::begin_move`] so it can send the
/// request and later settle it.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveTicket {
    pub id: MoveId,
    pub request: MoveRequest,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub phase: MovePhase,
    pub notice: Notice,
}

/// Client-side owner of one rendered hierarchy.
///
/// `confirmed` is the last tree the server vouched for; the displayed tree is
/// always `confirmed` with the still-pending moves replayed on top, in the
/// order they were dropped.
#[derive(Debug, Clone)]
pub struct TreeSession {
    hierarchy: Hierarchy,
    editable: bool,
    confirmed: Tree,
    tree: Tree,
    pending: Vec<PendingMove>,
    next_id: MoveId,
}

impl TreeSession {
    pub fn new(hierarchy: Hierarchy, tree: Tree, editable: bool) -> Self {
        Self {
            hierarchy,
            editable,
            confirmed: tree.clone(),
            tree,
            pending: Vec::new(),
            next_id: 1,
        }
    }

    pub fn hierarchy(&self) -> Hierarchy {
        self.hierarchy
    }

    /// The tree to display.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn is_editable(&self) -> bool {
        self.editable
    }

    pub fn set_editable(&mut self, editable: bool) {
        self.editable = editable;
    }

    /// Install a tree fetched outside the move protocol (after a create,
    /// rename or delete). Pending moves are replayed on top of it.
    pub fn replace_tree(&mut self, tree: Tree) {
        self.confirmed = tree;
        self.rebuild();
    }

    pub fn toggle_expanded(&mut self, id: &str) {
        self.tree = self.tree.toggle_expanded(id);
    }

    /// Forget every in-flight move and stop accepting drops. Settlements that
    /// arrive afterwards are ignored.
    pub fn close(&mut self) {
        self.editable = false;
        self.pending.clear();
    }

    /// True while any move is waiting for the server.
    pub fn is_committing(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Phase of an in-flight move; settled or unknown moves are `Idle`.
    pub fn phase(&self, id: MoveId) -> MovePhase {
        self.pending
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.phase)
            .unwrap_or(MovePhase::Idle)
    }

    /// Apply a drop optimistically.
    ///
    /// Returns `None`, leaving the tree untouched, when the session is
    /// read-only or the drop is illegal or changes nothing. No request must
    /// be sent in that case.
    pub fn begin_move(
        &mut self,
        drag_id: &str,
        drop_id: &str,
        position: DropPosition,
    ) -> Option<MoveTicket> {
        if !self.editable {
            return None;
        }
        let next = match try_apply_move(&self.tree, drag_id, drop_id, position) {
            Ok(next) => next,
            Err(err) => {
                debug!(drag_id, drop_id, ?position, %err, "drop ignored");
                return None;
            }
        };
        if next == self.tree {
            return None;
        }
        let request = MoveRequest::resolve(&self.tree, drag_id, drop_id, position).ok()?;
        if request.hierarchy() != self.hierarchy {
            debug!(
                drag_id,
                hierarchy = self.hierarchy.as_str(),
                "drop belongs to another hierarchy"
            );
            return None;
        }

        let id = self.next_id;
        self.next_id += 1;
        self.tree = next;
        self.pending.push(PendingMove {
            id,
            phase: MovePhase::Optimistic,
            request: request.clone(),
        });
        Some(MoveTicket { id, request })
    }

    /// Record that the request for `id` has been sent.
    pub fn mark_committing(&mut self, id: MoveId) -> bool {
        match self.pending.iter_mut().find(|p| p.id == id) {
            Some(pending) if pending.phase == MovePhase::Optimistic => {
                pending.phase = MovePhase::Committing;
                true
            }
            _ => false,
        }
    }

    /// Reconcile a finished move. Unknown ids (already settled, or from a
    /// session that has been replaced) are ignored.
    pub fn settle(&mut self, id: MoveId, outcome: MoveOutcome) -> Option<Settlement> {
        let index = self.pending.iter().position(|p| p.id == id)?;
        let pending = self.pending.remove(index);

        let settlement = match outcome {
            MoveOutcome::Committed { tree, message } => {
                match tree {
                    Some(tree) => self.confirmed = tree,
                    None => {
                        let destination = pending.request.destination();
                        if let Ok(moved) =
                            place(&self.confirmed, pending.request.node_id(), &destination)
                        {
                            self.confirmed = moved;
                        }
                    }
                }
                Settlement {
                    phase: MovePhase::Committed,
                    notice: Notice::success(message),
                }
            }
            MoveOutcome::Failed { error } => Settlement {
                phase: MovePhase::RolledBack,
                notice: Notice::error(error),
            },
        };
        self.rebuild();
        Some(settlement)
    }

    fn rebuild(&mut self) {
        let mut next = self.confirmed.clone();
        for pending in &self.pending {
            let destination = pending.request.destination();
            match place(&next, pending.request.node_id(), &destination) {
                Ok(moved) => next = moved,
                Err(err) => {
                    debug!(move_id = pending.id, %err, "pending move no longer applies");
                }
            }
        }
        self.tree = next.with_expansion_from(&self.tree);
    }
}
