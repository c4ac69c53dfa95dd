//! CRUD and ordering handlers shared by every node kind.
//!
//! The `{kind}` path segment selects the entity type; an unknown segment is a
//! 404 like any other missing resource.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::{
    BulkCreateRequest, BulkCreateResponse, CreateNodeRequest, CreateWithChildrenRequest,
    MoveRequest, RenameRequest, ReorderRequest, ReparentRequest, ScopeQuery, StatusRequest,
};
use crate::models::{Node, NodeKind, Scope, TreeNode};
use crate::AppState;

pub(crate) fn parse_kind(segment: &str) -> Result<NodeKind, AppError> {
    NodeKind::from_path_segment(segment)
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Unknown resource '{}'", segment)))
}

/// GET /api/{kind}?parent_id=
pub async fn list_nodes(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(query): Query<ScopeQuery>,
) -> Result<Json<Vec<Node>>, AppError> {
    let kind = parse_kind(&kind)?;
    let nodes = state
        .hierarchy
        .list(Scope::new(kind, query.parent_id))
        .await?;
    Ok(Json(nodes))
}

/// POST /api/{kind}
pub async fn create_node(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Json(req): Json<CreateNodeRequest>,
) -> Result<(StatusCode, Json<Node>), AppError> {
    let kind = parse_kind(&kind)?;
    req.validate()?;

    let node = state
        .hierarchy
        .append(Scope::new(kind, req.parent_id), &req.name)
        .await?;
    Ok((StatusCode::CREATED, Json(node)))
}

/// POST /api/{kind}/bulk
pub async fn bulk_create_nodes(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Json(req): Json<BulkCreateRequest>,
) -> Result<(StatusCode, Json<BulkCreateResponse>), AppError> {
    let kind = parse_kind(&kind)?;
    req.validate()?;

    let created = state
        .hierarchy
        .bulk_append(Scope::new(kind, req.parent_id), &req.names)
        .await?;
    let skipped = req.names.len() - created.len();
    Ok((
        StatusCode::CREATED,
        Json(BulkCreateResponse { created, skipped }),
    ))
}

/// POST /api/{kind}/with-children
pub async fn create_with_children(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Json(req): Json<CreateWithChildrenRequest>,
) -> Result<(StatusCode, Json<TreeNode>), AppError> {
    let kind = parse_kind(&kind)?;
    req.validate()?;

    let tree = state
        .hierarchy
        .append_with_children(Scope::new(kind, req.parent_id), &req.name, &req.children)
        .await?;
    Ok((StatusCode::CREATED, Json(tree)))
}

/// PUT /api/{kind}/order
pub async fn reorder_nodes(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Json(req): Json<ReorderRequest>,
) -> Result<Json<Vec<Node>>, AppError> {
    let kind = parse_kind(&kind)?;
    let nodes = state
        .hierarchy
        .reorder(Scope::new(kind, req.parent_id), &req.ordered_ids)
        .await?;
    Ok(Json(nodes))
}

/// GET /api/{kind}/:id
pub async fn get_node(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, Uuid)>,
) -> Result<Json<Node>, AppError> {
    let kind = parse_kind(&kind)?;
    Ok(Json(state.hierarchy.get(kind, id).await?))
}

/// PATCH /api/{kind}/:id
pub async fn rename_node(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, Uuid)>,
    Json(req): Json<RenameRequest>,
) -> Result<Json<Node>, AppError> {
    let kind = parse_kind(&kind)?;
    req.validate()?;
    Ok(Json(state.hierarchy.rename(kind, id, &req.name).await?))
}

/// PATCH /api/{kind}/:id/parent
pub async fn reparent_node(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, Uuid)>,
    Json(req): Json<ReparentRequest>,
) -> Result<Json<Node>, AppError> {
    let kind = parse_kind(&kind)?;
    Ok(Json(state.hierarchy.reparent(kind, id, req.parent_id).await?))
}

/// PATCH /api/{kind}/:id/status
pub async fn set_node_status(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, Uuid)>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<Node>, AppError> {
    let kind = parse_kind(&kind)?;
    Ok(Json(state.hierarchy.set_status(kind, id, req.status).await?))
}

/// POST /api/{kind}/:id/move
///
/// Returns the whole scope in its new order.
pub async fn move_node(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, Uuid)>,
    Json(req): Json<MoveRequest>,
) -> Result<Json<Vec<Node>>, AppError> {
    let kind = parse_kind(&kind)?;
    Ok(Json(
        state
            .hierarchy
            .move_adjacent(kind, id, req.direction)
            .await?,
    ))
}

/// DELETE /api/{kind}/:id
pub async fn delete_node(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, Uuid)>,
) -> Result<StatusCode, AppError> {
    let kind = parse_kind(&kind)?;
    state.hierarchy.delete(kind, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
