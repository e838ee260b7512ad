use crate::auth::{AuthUser, SessionUser, USER_SESSION_KEY};
use crate::error::AppError;
use crate::AppState;
use axum::{extract::State, Json};
use common::{ActionResponse, LoginRequest, SessionInfo};
use std::sync::Arc;
use tower_sessions::Session;
use tracing::{info, warn};

pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    let user = state
        .users
        .iter()
        .find(|u| u.username == payload.username)
        .filter(|u| u.verify(&payload.password));

    let Some(user) = user else {
        warn!(username = %payload.username, "failed login");
        return Err(AppError::InvalidCredentials);
    };

    session.cycle_id().await?;
    session
        .insert(
            USER_SESSION_KEY,
            SessionUser {
                username: user.username.clone(),
                role: user.role,
            },
        )
        .await?;

    info!(username = %user.username, role = %user.role, "logged in");
    Ok(Json(ActionResponse::ok("Logged in")))
}

pub async fn logout(session: Session) -> Result<Json<ActionResponse>, AppError> {
    session.flush().await?;
    Ok(Json(ActionResponse::ok("Logged out")))
}

pub async fn me(AuthUser(user): AuthUser) -> Json<SessionInfo> {
    Json(SessionInfo {
        can_edit: user.can_edit(),
        username: user.username,
        role: user.role,
    })
}
