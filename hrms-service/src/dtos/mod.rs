use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::hierarchy::Direction;
use crate::models::{Node, NodeStatus};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateNodeRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,

    #[serde(default)]
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BulkCreateRequest {
    #[validate(length(min = 1, max = 500, message = "Provide between 1 and 500 names"))]
    pub names: Vec<String>,

    #[serde(default)]
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct BulkCreateResponse {
    pub created: Vec<Node>,
    pub skipped: usize,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateWithChildrenRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,

    #[serde(default)]
    pub parent_id: Option<Uuid>,

    #[validate(length(max = 500, message = "At most 500 children per request"))]
    #[serde(default)]
    pub children: Vec<String>,
}

/// Full ordering of one scope. An empty list is valid for an empty scope.
#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    pub ordered_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RenameRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,
}

/// `parent_id: null` moves the node to the root scope.
#[derive(Debug, Deserialize)]
pub struct ReparentRequest {
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: NodeStatus,
}

#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub direction: Direction,
}

#[derive(Debug, Default, Deserialize)]
pub struct ScopeQuery {
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OrgTreeQuery {
    pub company_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_requires_name() {
        let req: CreateNodeRequest = serde_json::from_str(r#"{"name": ""}"#).unwrap();
        assert!(req.validate().is_err());

        let req: CreateNodeRequest = serde_json::from_str(r#"{"name": "North"}"#).unwrap();
        assert!(req.validate().is_ok());
        assert!(req.parent_id.is_none());
    }

    #[test]
    fn test_bulk_request_requires_names() {
        let req: BulkCreateRequest = serde_json::from_str(r#"{"names": []}"#).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_move_request_direction() {
        let req: MoveRequest = serde_json::from_str(r#"{"direction": "up"}"#).unwrap();
        assert_eq!(req.direction, Direction::Up);
        assert!(serde_json::from_str::<MoveRequest>(r#"{"direction": "left"}"#).is_err());
    }
}
