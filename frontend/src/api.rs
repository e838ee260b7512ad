use common::commit::{MoveTransport, TransportError};
use common::{
    ActionResponse, CreateNodeRequest, Hierarchy, LoginRequest, MoveRequest, RenameNodeRequest,
    SessionInfo, Tree,
};
use gloo_net::http::{Request, Response};

fn network(err: gloo_net::Error) -> TransportError {
    TransportError::Network(err.to_string())
}

// Error statuses still carry an `ActionResponse` body; only fall back to the
// bare status when there is nothing to decode.
async fn action_response(resp: Response) -> Result<ActionResponse, TransportError> {
    match resp.json::<ActionResponse>().await {
        Ok(body) => Ok(body),
        Err(_) if !resp.ok() => Err(TransportError::Status {
            status: resp.status(),
        }),
        Err(err) => Err(TransportError::Decode(err.to_string())),
    }
}

pub async fn login(username: String, password: String) -> Result<ActionResponse, TransportError> {
    let payload = LoginRequest { username, password };
    let resp = Request::post("/api/login")
        .json(&payload)
        .map_err(network)?
        .send()
        .await
        .map_err(network)?;
    action_response(resp).await
}

pub async fn logout() -> Result<ActionResponse, TransportError> {
    let resp = Request::post("/api/logout").send().await.map_err(network)?;
    action_response(resp).await
}

/// `Ok(None)` when nobody is signed in.
pub async fn me() -> Result<Option<SessionInfo>, TransportError> {
    let resp = Request::get("/api/me").send().await.map_err(network)?;
    if resp.status() == 401 {
        return Ok(None);
    }
    if !resp.ok() {
        return Err(TransportError::Status {
            status: resp.status(),
        });
    }
    resp.json()
        .await
        .map(Some)
        .map_err(|e| TransportError::Decode(e.to_string()))
}

pub async fn fetch_tree(hierarchy: Hierarchy) -> Result<Tree, TransportError> {
    let resp = Request::get(&format!("/api/tree/{}", hierarchy.as_str()))
        .send()
        .await
        .map_err(network)?;
    if !resp.ok() {
        return Err(TransportError::Status {
            status: resp.status(),
        });
    }
    resp.json()
        .await
        .map_err(|e| TransportError::Decode(e.to_string()))
}

pub async fn create_node(request: &CreateNodeRequest) -> Result<ActionResponse, TransportError> {
    let resp = Request::post("/api/nodes")
        .json(request)
        .map_err(network)?
        .send()
        .await
        .map_err(network)?;
    action_response(resp).await
}

pub async fn rename_node(id: &str, title: String) -> Result<ActionResponse, TransportError> {
    let resp = Request::patch(&format!("/api/nodes/{id}"))
        .json(&RenameNodeRequest { title })
        .map_err(network)?
        .send()
        .await
        .map_err(network)?;
    action_response(resp).await
}

pub async fn delete_node(id: &str) -> Result<ActionResponse, TransportError> {
    let resp = Request::delete(&format!("/api/nodes/{id}"))
        .send()
        .await
        .map_err(network)?;
    action_response(resp).await
}

/// The move protocol over the backend's JSON endpoints.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpMoveTransport;

impl MoveTransport for HttpMoveTransport {
    async fn send_move(&self, request: &MoveRequest) -> Result<ActionResponse, TransportError> {
        let body = request
            .to_json()
            .map_err(|e| TransportError::Decode(e.to_string()))?;
        let resp = Request::post(request.endpoint())
            .header("Content-Type", "application/json")
            .body(body)
            .map_err(network)?
            .send()
            .await
            .map_err(network)?;
        action_response(resp).await
    }

    async fn fetch_tree(&self, hierarchy: Hierarchy) -> Result<Tree, TransportError> {
        fetch_tree(hierarchy).await
    }
}
