//! Persistence seam for hierarchy nodes.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Node, NodeKind};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{kind} {id} does not exist")]
    Missing { kind: NodeKind, id: Uuid },

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Storage operations the hierarchy core relies on.
///
/// Every method that writes more than one row is a single transaction:
/// either all rows change or none do.
#[async_trait]
pub trait NodeRepository: Send + Sync {
    async fn find_by_id(&self, kind: NodeKind, id: Uuid) -> Result<Option<Node>, RepositoryError>;

    /// Nodes of `kind` whose parent is `parent_id`, sorted by order index.
    async fn find_all_in_scope(
        &self,
        kind: NodeKind,
        parent_id: Option<Uuid>,
    ) -> Result<Vec<Node>, RepositoryError>;

    async fn find_all(&self, kind: NodeKind) -> Result<Vec<Node>, RepositoryError>;

    /// Insert `nodes` in order and return the rows actually written.
    ///
    /// A node whose name already exists under the same parent is skipped, not
    /// an error. Any other failure (e.g. a missing parent row) aborts the
    /// whole batch.
    async fn insert(&self, nodes: &[Node]) -> Result<Vec<Node>, RepositoryError>;

    /// Overwrite every node in `nodes`. Fails with `Missing` and writes
    /// nothing if any of them no longer exists.
    async fn update_many(&self, nodes: &[Node]) -> Result<(), RepositoryError>;

    /// Remove a node and write `resequenced` siblings in the same
    /// transaction. Returns false if the node did not exist.
    async fn delete(
        &self,
        kind: NodeKind,
        id: Uuid,
        resequenced: &[Node],
    ) -> Result<bool, RepositoryError>;

    /// Number of direct dependents of a node across all of its child kinds.
    async fn count_referencing(&self, kind: NodeKind, id: Uuid) -> Result<u64, RepositoryError>;

    async fn health_check(&self) -> Result<(), RepositoryError>;
}
