use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use common::moves::{MoveCourseRequest, MoveDocumentRequest, MoveLessonRequest, MoveProjectRequest};
use common::{ActionResponse, CreateNodeRequest, Hierarchy, MoveRequest, RenameNodeRequest, Tree};
use tracing::info;

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::AppState;

pub async fn get_tree(
    State(state): State<Arc<AppState>>,
    Path(hierarchy): Path<Hierarchy>,
) -> Json<Tree> {
    Json(state.store.tree(hierarchy).await)
}

pub async fn move_lesson(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(payload): Json<MoveLessonRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    apply_move(&state, &user.username, MoveRequest::Lesson(payload)).await
}

pub async fn move_project(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(payload): Json<MoveProjectRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    apply_move(&state, &user.username, MoveRequest::Project(payload)).await
}

pub async fn move_course(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(payload): Json<MoveCourseRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    apply_move(&state, &user.username, MoveRequest::Course(payload)).await
}

pub async fn move_document(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(payload): Json<MoveDocumentRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    apply_move(&state, &user.username, MoveRequest::Document(payload)).await
}

async fn apply_move(
    state: &AppState,
    username: &str,
    request: MoveRequest,
) -> Result<Json<ActionResponse>, AppError> {
    let message = state.store.move_node(&request).await?;
    info!(username, node_id = request.node_id(), endpoint = request.endpoint(), "move applied");
    Ok(Json(ActionResponse::ok(message)))
}

pub async fn create_node(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateNodeRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    let id = state.store.create_node(&payload).await?;
    let message = format!("Created {} \"{}\"", payload.kind, payload.title.trim());
    Ok(Json(ActionResponse::ok(message).with_id(id)))
}

pub async fn rename_node(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<RenameNodeRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    let kind = state.store.rename_node(&id, &payload.title).await?;
    Ok(Json(ActionResponse::ok(format!("Renamed {kind}"))))
}

pub async fn delete_node(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ActionResponse>, AppError> {
    let (kind, removed) = state.store.delete_node(&id).await?;
    let message = match removed {
        1 => format!("Deleted {kind}"),
        n => format!("Deleted {kind} and {} nested items", n - 1),
    };
    Ok(Json(ActionResponse::ok(message)))
}
