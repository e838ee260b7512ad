pub mod auth;
pub mod commit;
pub mod drop_zone;
pub mod moves;
pub mod tree;

pub use auth::Role;
pub use moves::{DropPosition, MoveRequest};
pub use tree::{Hierarchy, NodeKind, Tree, TreeNode};

use serde::{Deserialize, Serialize};

/// Body of every mutating endpoint: `{ success: true, message }` or
/// `{ success: false, error }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Server-assigned id of a newly created node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl ActionResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
            id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
            id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Who is signed in, as reported by `/api/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub username: String,
    pub role: Role,
    pub can_edit: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNodeRequest {
    pub kind: NodeKind,
    pub title: String,
    #[serde(default)]
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameNodeRequest {
    pub title: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_response_wire_shape() {
        let ok = serde_json::to_value(ActionResponse::ok("Lesson moved")).unwrap();
        assert_eq!(ok, serde_json::json!({"success": true, "message": "Lesson moved"}));

        let failed: ActionResponse =
            serde_json::from_str(r#"{"success": false, "error": "nope"}"#).unwrap();
        assert_eq!(failed, ActionResponse::failure("nope"));
    }
}
