use axum::{
    extract::{Path, Query, State},
    Json,
};
use service_core::error::AppError;

use super::nodes::parse_kind;
use crate::dtos::OrgTreeQuery;
use crate::models::TreeNode;
use crate::AppState;

/// GET /api/{kind}/tree
pub async fn kind_tree(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> Result<Json<Vec<TreeNode>>, AppError> {
    let kind = parse_kind(&kind)?;
    Ok(Json(state.hierarchy.kind_tree(kind).await?))
}

/// GET /api/org-tree?company_id=
pub async fn org_tree(
    State(state): State<AppState>,
    Query(query): Query<OrgTreeQuery>,
) -> Result<Json<Vec<TreeNode>>, AppError> {
    let forest = state.hierarchy.org_tree(query.company_id).await?;
    tracing::debug!(
        roots = forest.len(),
        nodes = forest.iter().map(TreeNode::size).sum::<usize>(),
        "Organisation tree built"
    );
    Ok(Json(forest))
}
