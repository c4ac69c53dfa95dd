//! Creating a node together with its first children.

use tracing::{info, instrument};

use super::ordering::{accept_names, next_order_index};
use super::{normalize_name, observe, HierarchyError, HierarchyService};
use crate::models::{Node, Scope, TreeNode};

impl HierarchyService {
    /// Append `name` to `scope` and create `child_names` beneath it in the
    /// same write. Child names follow the bulk-append rules: repeats are
    /// skipped, a blank or over-long name fails the request.
    #[instrument(skip(self, child_names), fields(kind = %scope.kind, children = child_names.len()))]
    pub async fn append_with_children(
        &self,
        scope: Scope,
        name: &str,
        child_names: &[String],
    ) -> Result<TreeNode, HierarchyError> {
        let result: Result<TreeNode, HierarchyError> = async {
            let Some(child_kind) = scope.kind.child_kinds().first().copied() else {
                return Err(HierarchyError::Validation(format!(
                    "{} records cannot have children",
                    scope.kind.label()
                )));
            };
            let name = normalize_name(scope.kind, name)?;
            self.ensure_scope(scope).await?;

            let siblings = self.list(scope).await?;
            if siblings.iter().any(|n| n.name == name) {
                return Err(HierarchyError::DuplicateName {
                    kind: scope.kind,
                    name,
                });
            }

            let parent = Node::new(scope.kind, name, scope.parent_id, next_order_index(&siblings));
            let mut batch = vec![parent.clone()];
            batch.extend(
                accept_names(child_kind, &[], child_names)?
                    .into_iter()
                    .zip(0..)
                    .map(|(child, order_index)| {
                        Node::new(child_kind, child, Some(parent.id), order_index)
                    }),
            );

            let mut inserted = self.repo.insert(&batch).await?;
            if inserted.first().map(|n| n.id) != Some(parent.id) {
                return Err(HierarchyError::DuplicateName {
                    kind: scope.kind,
                    name: parent.name,
                });
            }
            let created = inserted.remove(0);

            info!(node_id = %created.id, children = inserted.len(), "Node created with children");
            Ok(TreeNode {
                node: created,
                children: inserted
                    .into_iter()
                    .map(|node| TreeNode {
                        node,
                        children: Vec::new(),
                    })
                    .collect(),
            })
        }
        .await;

        observe("append_with_children", scope.kind, &result);
        result
    }
}
