//! Ordered sibling sets: append, bulk append, reorder and single-step moves.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{normalize_name, observe, HierarchyError, HierarchyService};
use crate::models::{Node, NodeKind, Scope};

/// Direction for a single-step move within a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

/// Index for the next node appended to a scope: one past the current
/// maximum, or 0 when the scope is empty.
pub(super) fn next_order_index(siblings: &[Node]) -> i32 {
    siblings
        .iter()
        .map(|n| n.order_index)
        .max()
        .map_or(0, |max| max + 1)
}

/// Names from a bulk request that survive the duplicate-skip policy, in
/// request order. Names already in the scope and repeats within the request
/// are dropped. Any blank or over-long name fails the whole request.
pub(super) fn accept_names(
    kind: NodeKind,
    existing: &[Node],
    names: &[String],
) -> Result<Vec<String>, HierarchyError> {
    let mut seen: HashSet<String> = existing.iter().map(|n| n.name.clone()).collect();
    let mut accepted = Vec::with_capacity(names.len());
    for raw in names {
        let name = normalize_name(kind, raw)?;
        if seen.insert(name.clone()) {
            accepted.push(name);
        }
    }
    Ok(accepted)
}

/// Check that `ordered_ids` names every member of the scope exactly once.
pub(super) fn validate_permutation(
    members: &[Node],
    ordered_ids: &[Uuid],
) -> Result<(), HierarchyError> {
    let member_ids: HashSet<Uuid> = members.iter().map(|n| n.id).collect();
    let mut seen = HashSet::with_capacity(ordered_ids.len());

    for id in ordered_ids {
        if !member_ids.contains(id) {
            return Err(HierarchyError::InvalidOrder(format!(
                "{} is not a member of this scope",
                id
            )));
        }
        if !seen.insert(*id) {
            return Err(HierarchyError::InvalidOrder(format!(
                "{} appears more than once",
                id
            )));
        }
    }

    let missing = member_ids.len() - seen.len();
    if missing > 0 {
        return Err(HierarchyError::InvalidOrder(format!(
            "{} member(s) of this scope are missing from the order",
            missing
        )));
    }
    Ok(())
}

impl HierarchyService {
    /// Add one node at the end of its scope.
    #[instrument(skip(self), fields(kind = %scope.kind))]
    pub async fn append(&self, scope: Scope, name: &str) -> Result<Node, HierarchyError> {
        let result: Result<Node, HierarchyError> = async {
            let name = normalize_name(scope.kind, name)?;
            self.ensure_scope(scope).await?;

            let siblings = self.list(scope).await?;
            if siblings.iter().any(|n| n.name == name) {
                return Err(HierarchyError::DuplicateName {
                    kind: scope.kind,
                    name,
                });
            }

            let node = Node::new(scope.kind, name, scope.parent_id, next_order_index(&siblings));
            let inserted = self.repo.insert(std::slice::from_ref(&node)).await?;
            // An empty result means a concurrent writer took the name first.
            let created = inserted
                .into_iter()
                .next()
                .ok_or(HierarchyError::DuplicateName {
                    kind: scope.kind,
                    name: node.name,
                })?;

            info!(node_id = %created.id, order_index = created.order_index, "Node appended");
            Ok(created)
        }
        .await;

        observe("append", scope.kind, &result);
        result
    }

    /// Append many names to one scope, skipping duplicates, in one write.
    #[instrument(skip(self, names), fields(kind = %scope.kind, requested = names.len()))]
    pub async fn bulk_append(
        &self,
        scope: Scope,
        names: &[String],
    ) -> Result<Vec<Node>, HierarchyError> {
        let result: Result<Vec<Node>, HierarchyError> = async {
            self.ensure_scope(scope).await?;

            let siblings = self.list(scope).await?;
            let accepted = accept_names(scope.kind, &siblings, names)?;
            if accepted.is_empty() {
                info!("Nothing to append after duplicate filtering");
                return Ok(Vec::new());
            }

            let start = next_order_index(&siblings);
            let nodes: Vec<Node> = accepted
                .into_iter()
                .zip(start..)
                .map(|(name, order_index)| Node::new(scope.kind, name, scope.parent_id, order_index))
                .collect();

            let created = self.repo.insert(&nodes).await?;
            info!(
                created = created.len(),
                skipped = names.len() - created.len(),
                "Bulk append completed"
            );
            Ok(created)
        }
        .await;

        observe("bulk_append", scope.kind, &result);
        result
    }

    /// Rewrite the order of a whole scope. `ordered_ids` must be an exact
    /// permutation of the scope's members; position `i` gets index `i`.
    #[instrument(skip(self, ordered_ids), fields(kind = %scope.kind, count = ordered_ids.len()))]
    pub async fn reorder(
        &self,
        scope: Scope,
        ordered_ids: &[Uuid],
    ) -> Result<Vec<Node>, HierarchyError> {
        let result: Result<Vec<Node>, HierarchyError> = async {
            self.ensure_scope(scope).await?;

            let members = self.list(scope).await?;
            validate_permutation(&members, ordered_ids)?;

            let mut by_id: HashMap<Uuid, Node> = members.into_iter().map(|n| (n.id, n)).collect();
            let mut reordered = Vec::with_capacity(ordered_ids.len());
            for (position, id) in ordered_ids.iter().enumerate() {
                let mut node = by_id.remove(id).ok_or_else(|| {
                    HierarchyError::InternalConsistency(format!(
                        "validated member {} vanished during reorder",
                        id
                    ))
                })?;
                node.order_index = position as i32;
                node.touch();
                reordered.push(node);
            }

            self.repo.update_many(&reordered).await?;
            info!("Scope reordered");
            Ok(reordered)
        }
        .await;

        observe("reorder", scope.kind, &result);
        result
    }

    /// Swap a node with its immediate neighbour. Moving the first node up or
    /// the last node down leaves the scope unchanged. Returns the scope in
    /// its new order.
    #[instrument(skip(self), fields(kind = %kind, node_id = %id))]
    pub async fn move_adjacent(
        &self,
        kind: NodeKind,
        id: Uuid,
        direction: Direction,
    ) -> Result<Vec<Node>, HierarchyError> {
        let result: Result<Vec<Node>, HierarchyError> = async {
            let node = self.get(kind, id).await?;
            let mut siblings = self.list(node.scope()).await?;

            let position = siblings.iter().position(|n| n.id == id).ok_or_else(|| {
                HierarchyError::InternalConsistency(format!(
                    "{} {} is missing from its own scope",
                    kind.label(),
                    id
                ))
            })?;
            let neighbour = match direction {
                Direction::Up => position.checked_sub(1),
                Direction::Down => (position + 1 < siblings.len()).then_some(position + 1),
            };
            let Some(neighbour) = neighbour else {
                return Ok(siblings);
            };

            let current_index = siblings[position].order_index;
            siblings[position].order_index = siblings[neighbour].order_index;
            siblings[neighbour].order_index = current_index;
            siblings[position].touch();
            siblings[neighbour].touch();

            self.repo
                .update_many(&[siblings[position].clone(), siblings[neighbour].clone()])
                .await?;

            siblings.swap(position, neighbour);
            Ok(siblings)
        }
        .await;

        observe("move", kind, &result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone(name: &str, order_index: i32) -> Node {
        Node::new(NodeKind::Zone, name.to_string(), None, order_index)
    }

    #[test]
    fn test_next_order_index() {
        assert_eq!(next_order_index(&[]), 0);
        assert_eq!(next_order_index(&[zone("A", 0), zone("B", 4)]), 5);
    }

    #[test]
    fn test_accept_names_skips_existing_and_repeated() {
        let existing = vec![zone("North", 0)];
        let names = vec![
            "South".to_string(),
            "North".to_string(),
            " South ".to_string(),
            "East".to_string(),
        ];
        assert_eq!(
            accept_names(NodeKind::Zone, &existing, &names).unwrap(),
            vec!["South", "East"]
        );
    }

    #[test]
    fn test_accept_names_rejects_blank_or_long_entry() {
        let blank = vec!["South".to_string(), "   ".to_string()];
        assert!(matches!(
            accept_names(NodeKind::Zone, &[], &blank),
            Err(HierarchyError::Validation(_))
        ));

        let long = vec!["x".repeat(crate::hierarchy::MAX_NAME_LENGTH + 1)];
        assert!(matches!(
            accept_names(NodeKind::Zone, &[], &long),
            Err(HierarchyError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_permutation_accepts_exact_permutation() {
        let members = vec![zone("A", 0), zone("B", 1)];
        let ids = vec![members[1].id, members[0].id];
        assert!(validate_permutation(&members, &ids).is_ok());
    }

    #[test]
    fn test_validate_permutation_rejects_missing_member() {
        let members = vec![zone("A", 0), zone("B", 1)];
        let result = validate_permutation(&members, &[members[0].id]);
        assert!(matches!(result, Err(HierarchyError::InvalidOrder(_))));
    }

    #[test]
    fn test_validate_permutation_rejects_duplicates_and_strangers() {
        let members = vec![zone("A", 0), zone("B", 1)];
        let duplicated = vec![members[0].id, members[0].id];
        assert!(matches!(
            validate_permutation(&members, &duplicated),
            Err(HierarchyError::InvalidOrder(_))
        ));

        let stranger = vec![members[0].id, Uuid::new_v4()];
        assert!(matches!(
            validate_permutation(&members, &stranger),
            Err(HierarchyError::InvalidOrder(_))
        ));
    }

    #[test]
    fn test_empty_order_for_empty_scope_is_valid() {
        assert!(validate_permutation(&[], &[]).is_ok());
    }
}
