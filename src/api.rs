//! Authoring API boundary.
//!
//! Request/response DTOs and one function per endpoint, shaped for a
//! JSON request/response layer: camelCase fields, lowercase enums, and
//! every success wrapped in `{ "data": .., "message": .. }`. Failures come
//! back as an [`ApiError`] carrying the HTTP status a transport should use.
//!
//! No identity or ownership checks happen here; the host does those
//! before calling in.

use serde::{Deserialize, Serialize};

use crate::model::*;
use crate::remote::RemoteActor;
use crate::storage::LocalCache;
use crate::{Canvas, Error};

type JsonObject = serde_json::Map<String, serde_json::Value>;

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNodeRequest {
    pub session_id: SessionId,
    pub kind: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<JsonObject>,
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEdgeRequest {
    pub session_id: SessionId,
    pub from_node_id: NodeId,
    pub to_node_id: NodeId,
    pub relation: Relation,
    #[serde(default)]
    pub meta: Option<EdgeMeta>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandRequest {
    pub session_id: SessionId,
    pub base_node_id: NodeId,
    pub direction: Direction,
    pub intent: Relation,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    /// Becomes the new node's content.
    #[serde(default)]
    pub payload: Option<JsonObject>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNodeRequest {
    pub session_id: SessionId,
    pub node_id: NodeId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<JsonObject>,
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub data: T,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T, message: impl Into<String>) -> Self {
        Self { data, message: message.into() }
    }
}

/// Every node and edge of a session, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCanvas {
    pub session_id: SessionId,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandResponse {
    pub node: Node,
    pub edge: Edge,
}

/// Error body plus the status a transport should answer with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    #[serde(skip)]
    pub status: u16,
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { status, code: code.into(), message: message.into() }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(400, "INVALID_INPUT", message)
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let (status, code) = match &err {
            Error::UnknownNode { .. } => (404, "NODE_NOT_FOUND"),
            Error::UnknownSession(_) => (404, "SESSION_NOT_FOUND"),
            Error::OccupiedCoordinate { .. } => (409, "COORDINATE_OCCUPIED"),
            Error::NoFreeNeighbor { .. } => (409, "NO_FREE_NEIGHBOR"),
            Error::IdsExhausted(_) => (409, "IDS_EXHAUSTED"),
            Error::SyncInProgress(_) => (409, "SYNC_IN_PROGRESS"),
            Error::InvalidDirectionIntent { .. } => (400, "INVALID_DIRECTION_INTENT"),
            Error::InvalidContent(_) => (400, "INVALID_CONTENT"),
            Error::MalformedImport(_) => (400, "MALFORMED_IMPORT"),
            Error::Config(_) => (400, "INVALID_CONFIG"),
            Error::SyncUnavailable(_) => (503, "SYNC_UNAVAILABLE"),
            Error::Storage(_) | Error::Io(_) => (500, "STORAGE_ERROR"),
        };
        Self::new(status, code, err.to_string())
    }
}

pub type ApiResult<T> = std::result::Result<ApiResponse<T>, ApiError>;

// ============================================================================
// Endpoints
// ============================================================================

pub fn create_node<C: LocalCache, R: RemoteActor>(canvas: &Canvas<C, R>, req: CreateNodeRequest) -> ApiResult<Node> {
    if req.kind.trim().is_empty() {
        return Err(ApiError::invalid_input("kind must not be empty"));
    }
    let mut new = NewNode::new((req.x, req.y), req.kind)
        .with_content(req.content.map(content_from_json).unwrap_or_default());
    new.title = req.title;

    let node = canvas.create_node(&req.session_id, new)?;
    Ok(ApiResponse::new(node, "Node created successfully"))
}

pub fn create_edge<C: LocalCache, R: RemoteActor>(canvas: &Canvas<C, R>, req: CreateEdgeRequest) -> ApiResult<Edge> {
    let edge = canvas.create_edge(&req.session_id, req.from_node_id, req.to_node_id, req.relation, req.meta)?;
    Ok(ApiResponse::new(edge, "Edge created successfully"))
}

pub fn expand<C: LocalCache, R: RemoteActor>(canvas: &Canvas<C, R>, req: ExpandRequest) -> ApiResult<ExpandResponse> {
    let mut core = crate::ExpandRequest::new(req.base_node_id, req.direction, req.intent)
        .with_content(req.payload.map(content_from_json).unwrap_or_default());
    core.kind = req.kind.filter(|k| !k.trim().is_empty());
    core.title = req.title;

    let out = canvas.expand(&req.session_id, &core)?;
    Ok(ApiResponse::new(ExpandResponse { node: out.node, edge: out.edge }, "Canvas expanded successfully"))
}

pub fn update_node<C: LocalCache, R: RemoteActor>(canvas: &Canvas<C, R>, req: UpdateNodeRequest) -> ApiResult<Node> {
    let patch = NodePatch { title: req.title, content: req.content.map(content_from_json).unwrap_or_default() };
    if patch.is_empty() {
        return Err(ApiError::invalid_input("update carries neither title nor content"));
    }
    let node = canvas.update_node_content(&req.session_id, req.node_id, patch)?;
    Ok(ApiResponse::new(node, "Node updated successfully"))
}

pub fn session_canvas<C: LocalCache, R: RemoteActor>(canvas: &Canvas<C, R>, session: &SessionId) -> ApiResult<SessionCanvas> {
    let doc = canvas.snapshot(session)?;
    let mut nodes = doc.nodes;
    let mut edges = doc.edges;
    nodes.sort_by_key(|n| (n.created_at, n.id));
    edges.sort_by_key(|e| (e.created_at, e.id));
    Ok(ApiResponse::new(
        SessionCanvas { session_id: doc.session_id, nodes, edges },
        "Canvas retrieved successfully",
    ))
}
