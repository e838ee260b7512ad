use axum::{extract::Request, middleware::Next, response::Response};

use crate::auth::AuthUser;
use crate::error::AppError;

pub async fn require_auth(
    AuthUser(_user): AuthUser,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    Ok(next.run(req).await)
}

/// Client-side gating only hides drag handles; every mutation is re-checked
/// here against the session role.
pub async fn require_editor(
    AuthUser(user): AuthUser,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !user.can_edit() {
        tracing::warn!(username = %user.username, role = %user.role, path = %req.uri().path(), "edit refused");
        return Err(AppError::Forbidden);
    }
    Ok(next.run(req).await)
}
