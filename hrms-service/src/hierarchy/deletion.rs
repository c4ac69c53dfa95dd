//! Deletion guarded by dependent records.

use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{observe, resequence, HierarchyError, HierarchyService};
use crate::models::{Node, NodeKind};

impl HierarchyService {
    /// Delete a node that nothing references and close the gap it leaves in
    /// its scope. Only direct dependents are counted.
    #[instrument(skip(self), fields(kind = %kind, node_id = %id))]
    pub async fn delete(&self, kind: NodeKind, id: Uuid) -> Result<Node, HierarchyError> {
        let result: Result<Node, HierarchyError> = async {
            let node = self.get(kind, id).await?;

            let count = self.repo.count_referencing(kind, id).await?;
            if count > 0 {
                let dependent = kind.child_kinds().first().copied().unwrap_or(kind);
                warn!(count, dependent = %dependent, "Delete refused, dependents exist");
                return Err(HierarchyError::DependencyExists {
                    kind,
                    node_id: id,
                    count,
                    dependent,
                });
            }

            let remaining: Vec<Node> = self
                .list(node.scope())
                .await?
                .into_iter()
                .filter(|n| n.id != id)
                .collect();
            let resequenced = resequence(remaining);

            if !self.repo.delete(kind, id, &resequenced).await? {
                return Err(HierarchyError::NotFound { kind, id });
            }

            info!(resequenced = resequenced.len(), "Node deleted");
            Ok(node)
        }
        .await;

        observe("delete", kind, &result);
        result
    }
}
