use service_core::error::AppError;
use thiserror::Error;
use uuid::Uuid;

use crate::models::NodeKind;
use crate::services::RepositoryError;

/// Failures of hierarchy operations. All of them go straight back to the
/// caller; none are retried.
#[derive(Debug, Error)]
pub enum HierarchyError {
    #[error("{0}")]
    Validation(String),

    #[error("{} {node_id} cannot become a child of its own descendant {parent_id}", .kind.label())]
    CircularReference {
        kind: NodeKind,
        node_id: Uuid,
        parent_id: Uuid,
    },

    #[error(
        "Cannot delete {} {node_id}: {count} dependent {} record(s) exist; reassign children first",
        .kind.label(),
        .dependent.label()
    )]
    DependencyExists {
        kind: NodeKind,
        node_id: Uuid,
        count: u64,
        dependent: NodeKind,
    },

    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    #[error("{} {id} not found", .kind.label())]
    NotFound { kind: NodeKind, id: Uuid },

    #[error("A {} named '{name}' already exists in this scope", .kind.label())]
    DuplicateName { kind: NodeKind, name: String },

    #[error("Internal consistency error: {0}")]
    InternalConsistency(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl HierarchyError {
    /// Short error class used as a metrics label.
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::CircularReference { .. } => "circular_reference",
            Self::DependencyExists { .. } => "dependency_exists",
            Self::InvalidOrder(_) => "invalid_order",
            Self::NotFound { .. } => "not_found",
            Self::DuplicateName { .. } => "duplicate_name",
            Self::InternalConsistency(_) => "internal_consistency",
            Self::Repository(_) => "repository",
        }
    }
}

impl From<HierarchyError> for AppError {
    fn from(err: HierarchyError) -> Self {
        let message = err.to_string();
        match err {
            HierarchyError::Validation(_) | HierarchyError::InvalidOrder(_) => {
                AppError::BadRequest(anyhow::anyhow!(message))
            }
            HierarchyError::NotFound { .. } => AppError::NotFound(anyhow::anyhow!(message)),
            HierarchyError::CircularReference { .. }
            | HierarchyError::DependencyExists { .. }
            | HierarchyError::DuplicateName { .. } => AppError::Conflict(anyhow::anyhow!(message)),
            HierarchyError::InternalConsistency(_) => {
                AppError::InternalError(anyhow::anyhow!(message))
            }
            HierarchyError::Repository(RepositoryError::Missing { .. }) => {
                AppError::NotFound(anyhow::anyhow!(message))
            }
            HierarchyError::Repository(RepositoryError::Constraint(_)) => {
                AppError::Conflict(anyhow::anyhow!(message))
            }
            HierarchyError::Repository(e) => AppError::DatabaseError(anyhow::Error::new(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_dependency_message_reports_count_and_hint() {
        let err = HierarchyError::DependencyExists {
            kind: NodeKind::Department,
            node_id: Uuid::nil(),
            count: 2,
            dependent: NodeKind::SubDepartment,
        };
        let message = err.to_string();
        assert!(message.contains("2 dependent sub-department record(s)"));
        assert!(message.contains("reassign children first"));
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                HierarchyError::Validation("empty".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                HierarchyError::InvalidOrder("missing".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                HierarchyError::NotFound {
                    kind: NodeKind::Zone,
                    id: Uuid::nil(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                HierarchyError::CircularReference {
                    kind: NodeKind::EmployeeLevel,
                    node_id: Uuid::nil(),
                    parent_id: Uuid::nil(),
                },
                StatusCode::CONFLICT,
            ),
            (
                HierarchyError::InternalConsistency("cycle".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                HierarchyError::Repository(RepositoryError::Constraint("fk".into())),
                StatusCode::CONFLICT,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(AppError::from(err).status_code(), expected);
        }
    }
}
