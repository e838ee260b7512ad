pub mod handlers;
pub mod middleware;

use axum::{extract::FromRequestParts, http::request::Parts, RequestPartsExt};
use common::Role;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::error::AppError;

pub const USER_SESSION_KEY: &str = "user";

/// What is kept in the session after a successful login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    pub username: String,
    pub role: Role,
}

impl SessionUser {
    pub fn can_edit(&self) -> bool {
        self.role.can_edit_hierarchy()
    }
}

/// Extractor for the signed-in user; rejects with 401 otherwise.
pub struct AuthUser(pub SessionUser);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extract::<Session>()
            .await
            .map_err(|_| AppError::Unauthorized)?;

        session
            .get::<SessionUser>(USER_SESSION_KEY)
            .await?
            .map(AuthUser)
            .ok_or(AppError::Unauthorized)
    }
}
