//! Hierarchy core: sibling ordering, rename and re-parenting, guarded
//! deletion and tree assembly over any [`NodeRepository`].
//!
//! Every mutating operation validates against freshly loaded state and then
//! issues exactly one repository write, so a failure never leaves partial
//! changes behind.

mod cascade;
mod deletion;
mod error;
mod ordering;
mod reparent;
mod tree;

pub use error::HierarchyError;
pub use ordering::Direction;
pub use tree::build_tree;

use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use crate::models::{Node, NodeKind, Scope};
use crate::services::metrics::{record_consistency_violation, record_mutation};
use crate::services::NodeRepository;

/// Entry point for all hierarchy operations.
#[derive(Clone)]
pub struct HierarchyService {
    repo: Arc<dyn NodeRepository>,
}

impl HierarchyService {
    pub fn new(repo: Arc<dyn NodeRepository>) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &Arc<dyn NodeRepository> {
        &self.repo
    }

    /// Load a node or fail with `NotFound`.
    pub async fn get(&self, kind: NodeKind, id: Uuid) -> Result<Node, HierarchyError> {
        self.repo
            .find_by_id(kind, id)
            .await?
            .ok_or(HierarchyError::NotFound { kind, id })
    }

    /// Siblings of one scope in display order.
    pub async fn list(&self, scope: Scope) -> Result<Vec<Node>, HierarchyError> {
        Ok(self
            .repo
            .find_all_in_scope(scope.kind, scope.parent_id)
            .await?)
    }

    /// Check that a scope can hold nodes: root-only kinds take no parent and
    /// a named parent must exist.
    async fn ensure_scope(&self, scope: Scope) -> Result<(), HierarchyError> {
        match (scope.parent_id, scope.kind.parent_kind()) {
            (Some(_), None) => Err(HierarchyError::Validation(format!(
                "{} records have no parent",
                scope.kind.label()
            ))),
            (Some(parent_id), Some(parent_kind)) => {
                self.get(parent_kind, parent_id).await.map(|_| ())
            }
            (None, _) => Ok(()),
        }
    }
}

/// Longest name a node can carry, in characters. Matches the column width.
pub const MAX_NAME_LENGTH: usize = 200;

/// Trim a user supplied name and reject it if nothing is left or it is
/// longer than [`MAX_NAME_LENGTH`].
fn normalize_name(kind: NodeKind, name: &str) -> Result<String, HierarchyError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(HierarchyError::Validation(format!(
            "{} name must not be empty",
            kind.label()
        )));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(HierarchyError::Validation(format!(
            "{} name must be at most {} characters",
            kind.label(),
            MAX_NAME_LENGTH
        )));
    }
    Ok(name.to_string())
}

/// Renumber `siblings` to 0..n in their current order and return only the
/// nodes whose index changed.
fn resequence(mut siblings: Vec<Node>) -> Vec<Node> {
    siblings.sort_by(|a, b| {
        a.order_index
            .cmp(&b.order_index)
            .then_with(|| a.name.cmp(&b.name))
    });
    siblings
        .into_iter()
        .enumerate()
        .filter_map(|(position, mut node)| {
            let position = position as i32;
            (node.order_index != position).then(|| {
                node.order_index = position;
                node.touch();
                node
            })
        })
        .collect()
}

/// Record the outcome of a mutation.
fn observe<T>(operation: &'static str, kind: NodeKind, result: &Result<T, HierarchyError>) {
    match result {
        Ok(_) => record_mutation(operation, kind.as_str(), "ok"),
        Err(err) => {
            report_inconsistency(operation, kind, err);
            record_mutation(operation, kind.as_str(), err.outcome());
        }
    }
}

/// Log and count `InternalConsistency` failures; other errors pass silently.
fn report_inconsistency(operation: &'static str, kind: NodeKind, err: &HierarchyError) {
    if let HierarchyError::InternalConsistency(detail) = err {
        error!(operation, kind = %kind, detail = %detail, "Stored hierarchy is inconsistent");
        record_consistency_violation(operation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone(name: &str, order_index: i32) -> Node {
        Node::new(NodeKind::Zone, name.to_string(), None, order_index)
    }

    #[test]
    fn test_normalize_name_trims_and_rejects_blank() {
        assert_eq!(normalize_name(NodeKind::Zone, "  North ").unwrap(), "North");
        assert!(matches!(
            normalize_name(NodeKind::Zone, "   "),
            Err(HierarchyError::Validation(_))
        ));
    }

    #[test]
    fn test_normalize_name_caps_length_in_characters() {
        let longest = "é".repeat(MAX_NAME_LENGTH);
        assert_eq!(normalize_name(NodeKind::Zone, &longest).unwrap(), longest);

        let too_long = "x".repeat(MAX_NAME_LENGTH + 1);
        assert!(matches!(
            normalize_name(NodeKind::Zone, &too_long),
            Err(HierarchyError::Validation(_))
        ));
    }

    #[test]
    fn test_resequence_closes_gaps() {
        let changed = resequence(vec![zone("A", 0), zone("C", 2), zone("D", 3)]);
        let indices: Vec<(String, i32)> = changed
            .into_iter()
            .map(|n| (n.name, n.order_index))
            .collect();
        assert_eq!(indices, vec![("C".into(), 1), ("D".into(), 2)]);
    }

    #[test]
    fn test_resequence_of_dense_scope_changes_nothing() {
        assert!(resequence(vec![zone("A", 0), zone("B", 1)]).is_empty());
    }
}
