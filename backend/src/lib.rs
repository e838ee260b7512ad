pub mod auth;
pub mod config;
pub mod content;
pub mod error;
pub mod store;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, Uri},
    middleware,
    response::{Html, IntoResponse},
    routing::{get, patch, post},
    Router,
};
use common::auth::User;
use std::{fs, path::PathBuf, sync::Arc};
use store::ContentStore;
use tower::ServiceExt;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tower_sessions::{MemoryStore, SessionManagerLayer};

use auth::handlers as auth_handlers;
use auth::middleware::{require_auth, require_editor};

pub struct AppState {
    pub store: ContentStore,
    pub users: Vec<User>,
    pub static_dir: PathBuf,
}

pub fn app(state: Arc<AppState>) -> Router {
    let editor_routes = Router::new()
        .route("/api/lessons/move", post(content::move_lesson))
        .route("/api/projects/move", post(content::move_project))
        .route("/api/courses/move", post(content::move_course))
        .route("/api/documents/move", post(content::move_document))
        .route("/api/nodes", post(content::create_node))
        .route(
            "/api/nodes/{id}",
            patch(content::rename_node).delete(content::delete_node),
        )
        .route_layer(middleware::from_fn(require_editor));

    let member_routes = Router::new()
        .route("/api/tree/{hierarchy}", get(content::get_tree))
        .route("/api/me", get(auth_handlers::me))
        .route_layer(middleware::from_fn(require_auth));

    let session_layer = SessionManagerLayer::new(MemoryStore::default()).with_secure(false);

    Router::new()
        .route("/api/login", post(auth_handlers::login))
        .route("/api/logout", post(auth_handlers::logout))
        .merge(member_routes)
        .merge(editor_routes)
        .fallback(index_handler)
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index_handler(State(state): State<Arc<AppState>>, uri: Uri) -> impl IntoResponse {
    let path = uri.path().trim_start_matches('/');
    if path.starts_with("api/") {
        return (StatusCode::NOT_FOUND, "Unknown API route").into_response();
    }

    // Try to serve a built frontend asset first
    let static_path = state.static_dir.join(path);
    if !path.is_empty() && !path.contains("..") && static_path.is_file() {
        let request = match Request::builder().uri(uri).body(Body::empty()) {
            Ok(request) => request,
            Err(err) => return (StatusCode::BAD_REQUEST, err.to_string()).into_response(),
        };
        return match ServeDir::new(&state.static_dir).oneshot(request).await {
            Ok(res) => res.into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Static file error: {}", err),
            )
                .into_response(),
        };
    }

    // Client-side routes all get the SPA shell
    match fs::read_to_string(state.static_dir.join("index.html")) {
        Ok(content) => (StatusCode::OK, Html(content)).into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "index.html not found").into_response(),
    }
}
