use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::moves::MoveError;
use common::{ActionResponse, NodeKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    InvalidMove(#[from] MoveError),

    #[error("{0} not found")]
    NotFound(String),

    #[error("expected a {expected} but {id} is a {actual}")]
    WrongKind {
        id: String,
        expected: &'static str,
        actual: NodeKind,
    },

    #[error("{0}")]
    Validation(String),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("You must be signed in")]
    Unauthorized,

    #[error("You do not have permission to edit this content")]
    Forbidden,

    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error("Failed to persist content: {0}")]
    Persist(#[from] std::io::Error),

    #[error("Corrupt content snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidMove(MoveError::NotFound(_)) | AppError::NotFound(_) => {
                StatusCode::NOT_FOUND
            }
            AppError::InvalidMove(MoveError::StaleAnchor { .. }) => StatusCode::CONFLICT,
            AppError::InvalidMove(_) | AppError::WrongKind { .. } | AppError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::InvalidCredentials | AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Session(_) | AppError::Persist(_) | AppError::Snapshot(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(ActionResponse::failure(self.to_string()))).into_response()
    }
}
