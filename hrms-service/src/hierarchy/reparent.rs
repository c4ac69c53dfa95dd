//! Rename, status changes and cycle-safe re-parenting.

use std::collections::HashMap;
use tracing::{info, instrument};
use uuid::Uuid;

use super::ordering::next_order_index;
use super::{normalize_name, observe, resequence, HierarchyError, HierarchyService};
use crate::models::{Node, NodeKind, NodeStatus, Scope};

/// Follow parent links upward from `start` and report whether `target` is
/// on the path (including `start` itself).
///
/// The walk takes at most one hop per known node; needing more means the
/// stored links already loop. Both that and a parent id missing from
/// `parents` are reported as `InternalConsistency`.
pub(super) fn chain_contains(
    parents: &HashMap<Uuid, Option<Uuid>>,
    start: Uuid,
    target: Uuid,
) -> Result<bool, HierarchyError> {
    let mut current = start;
    let mut hops = 0usize;

    loop {
        if current == target {
            return Ok(true);
        }
        match parents.get(&current).copied() {
            None => {
                return Err(HierarchyError::InternalConsistency(format!(
                    "parent chain starting at {} references missing node {}",
                    start, current
                )));
            }
            Some(None) => return Ok(false),
            Some(Some(next)) => {
                hops += 1;
                if hops > parents.len() {
                    return Err(HierarchyError::InternalConsistency(format!(
                        "parent chain starting at {} does not terminate",
                        start
                    )));
                }
                current = next;
            }
        }
    }
}

impl HierarchyService {
    /// Change a node's name, keeping names unique within its scope.
    #[instrument(skip(self), fields(kind = %kind, node_id = %id))]
    pub async fn rename(
        &self,
        kind: NodeKind,
        id: Uuid,
        new_name: &str,
    ) -> Result<Node, HierarchyError> {
        let result: Result<Node, HierarchyError> = async {
            let name = normalize_name(kind, new_name)?;
            let mut node = self.get(kind, id).await?;
            if node.name == name {
                return Ok(node);
            }

            let siblings = self.list(node.scope()).await?;
            if siblings.iter().any(|n| n.id != id && n.name == name) {
                return Err(HierarchyError::DuplicateName { kind, name });
            }

            node.name = name;
            node.touch();
            self.repo.update_many(std::slice::from_ref(&node)).await?;
            info!("Node renamed");
            Ok(node)
        }
        .await;

        observe("rename", kind, &result);
        result
    }

    /// Activate or deactivate a node. Order and parent are untouched.
    #[instrument(skip(self), fields(kind = %kind, node_id = %id))]
    pub async fn set_status(
        &self,
        kind: NodeKind,
        id: Uuid,
        status: NodeStatus,
    ) -> Result<Node, HierarchyError> {
        let result: Result<Node, HierarchyError> = async {
            let mut node = self.get(kind, id).await?;
            if node.status == status {
                return Ok(node);
            }

            node.status = status;
            node.touch();
            self.repo.update_many(std::slice::from_ref(&node)).await?;
            info!(status = status.as_str(), "Node status changed");
            Ok(node)
        }
        .await;

        observe("set_status", kind, &result);
        result
    }

    /// Move a node under a different parent (or to the root scope with
    /// `None`). The node is appended at the end of the destination scope and
    /// the scope it left is renumbered, all in one write.
    #[instrument(skip(self), fields(kind = %kind, node_id = %id))]
    pub async fn reparent(
        &self,
        kind: NodeKind,
        id: Uuid,
        new_parent_id: Option<Uuid>,
    ) -> Result<Node, HierarchyError> {
        let result: Result<Node, HierarchyError> = async {
            let Some(parent_kind) = kind.parent_kind() else {
                return Err(HierarchyError::Validation(format!(
                    "{} records cannot be re-parented",
                    kind.label()
                )));
            };
            let node = self.get(kind, id).await?;

            if let Some(parent_id) = new_parent_id {
                if parent_id == id {
                    return Err(HierarchyError::CircularReference {
                        kind,
                        node_id: id,
                        parent_id,
                    });
                }
                self.get(parent_kind, parent_id).await?;

                // Only self-referencing kinds can form a loop.
                if kind.is_self_referencing() {
                    let parents: HashMap<Uuid, Option<Uuid>> = self
                        .repo
                        .find_all(kind)
                        .await?
                        .into_iter()
                        .map(|n| (n.id, n.parent_id))
                        .collect();
                    if chain_contains(&parents, parent_id, id)? {
                        return Err(HierarchyError::CircularReference {
                            kind,
                            node_id: id,
                            parent_id,
                        });
                    }
                }
            }

            if node.parent_id == new_parent_id {
                return Ok(node);
            }

            let destination = self.list(Scope::new(kind, new_parent_id)).await?;
            if destination.iter().any(|n| n.name == node.name) {
                return Err(HierarchyError::DuplicateName {
                    kind,
                    name: node.name,
                });
            }

            let left_behind: Vec<Node> = self
                .list(node.scope())
                .await?
                .into_iter()
                .filter(|n| n.id != id)
                .collect();

            let mut moved = node;
            moved.parent_id = new_parent_id;
            moved.order_index = next_order_index(&destination);
            moved.touch();

            let mut writes = vec![moved.clone()];
            writes.extend(resequence(left_behind));
            self.repo.update_many(&writes).await?;

            info!(
                new_parent_id = ?new_parent_id,
                order_index = moved.order_index,
                "Node re-parented"
            );
            Ok(moved)
        }
        .await;

        observe("reparent", kind, &result);
        result
    }
}
