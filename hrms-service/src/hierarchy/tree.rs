//! Assembly of flat node lists into nested trees.

use std::collections::{HashMap, HashSet};
use tracing::instrument;
use uuid::Uuid;

use super::{report_inconsistency, HierarchyError, HierarchyService};
use crate::models::{Node, NodeKind, TreeNode};

type ChildrenByParent = HashMap<Option<Uuid>, Vec<Node>>;

/// Build the forest hanging under `root_parent_id` (`None` for the top
/// level). Each sibling group is sorted by kind, then order index, then name.
///
/// Every node is placed at most once, and a depth beyond the input size means
/// the links loop. For a top-level build every input node must end up in the
/// forest: a node on a parent loop or under a parent missing from the input
/// fails with `InternalConsistency` instead of being dropped.
pub fn build_tree(
    nodes: Vec<Node>,
    root_parent_id: Option<Uuid>,
) -> Result<Vec<TreeNode>, HierarchyError> {
    let limit = nodes.len();
    let ids: HashSet<Uuid> = nodes.iter().map(|n| n.id).collect();

    let mut children: ChildrenByParent = HashMap::new();
    for node in nodes {
        children.entry(node.parent_id).or_default().push(node);
    }
    for group in children.values_mut() {
        group.sort_by(|a, b| {
            a.kind
                .cmp(&b.kind)
                .then_with(|| a.order_index.cmp(&b.order_index))
                .then_with(|| a.name.cmp(&b.name))
        });
    }

    let roots = children.remove(&root_parent_id).unwrap_or_default();
    let forest = roots
        .into_iter()
        .map(|node| build_subtree(node, &mut children, root_parent_id, 1, limit))
        .collect::<Result<Vec<_>, _>>()?;

    if root_parent_id.is_none() {
        let (looped, dangling) = children.iter().fold((0, 0), |(looped, dangling), (parent, group)| {
            match parent {
                Some(p) if ids.contains(p) => (looped + group.len(), dangling),
                _ => (looped, dangling + group.len()),
            }
        });
        if looped + dangling > 0 {
            return Err(HierarchyError::InternalConsistency(format!(
                "{} node(s) sit on a parent loop and {} reference a missing parent",
                looped, dangling
            )));
        }
    }

    Ok(forest)
}

fn build_subtree(
    node: Node,
    children: &mut ChildrenByParent,
    root_parent_id: Option<Uuid>,
    depth: usize,
    limit: usize,
) -> Result<TreeNode, HierarchyError> {
    if depth > limit || root_parent_id == Some(node.id) {
        return Err(HierarchyError::InternalConsistency(format!(
            "{} {} is its own ancestor",
            node.kind.label(),
            node.id
        )));
    }

    let own = children.remove(&Some(node.id)).unwrap_or_default();
    let nested = own
        .into_iter()
        .map(|child| build_subtree(child, children, root_parent_id, depth + 1, limit))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TreeNode {
        node,
        children: nested,
    })
}

impl HierarchyService {
    /// Tree of a single kind. Only meaningful for kinds whose parents are of
    /// the same kind, or that have no parent at all.
    #[instrument(skip(self), fields(kind = %kind))]
    pub async fn kind_tree(&self, kind: NodeKind) -> Result<Vec<TreeNode>, HierarchyError> {
        if !kind.is_self_referencing() && kind.parent_kind().is_some() {
            return Err(HierarchyError::Validation(format!(
                "{} records nest under another kind; use the organisation tree",
                kind.label()
            )));
        }

        let result: Result<Vec<TreeNode>, HierarchyError> =
            async { build_tree(self.repo.find_all(kind).await?, None) }.await;
        if let Err(err) = &result {
            report_inconsistency("kind_tree", kind, err);
        }
        result
    }

    /// Company, branch, department, sub-department and designation records
    /// as one nested tree. With `company_id` the result holds only that
    /// company; otherwise every top-level record is a root.
    #[instrument(skip(self))]
    pub async fn org_tree(&self, company_id: Option<Uuid>) -> Result<Vec<TreeNode>, HierarchyError> {
        let result: Result<Vec<TreeNode>, HierarchyError> = async {
            let company = match company_id {
                Some(id) => Some(self.get(NodeKind::Company, id).await?),
                None => None,
            };

            let mut nodes = Vec::new();
            for kind in NodeKind::ORG_CHAIN {
                nodes.extend(self.repo.find_all(kind).await?);
            }

            match company {
                Some(company) => {
                    let children = build_tree(nodes, Some(company.id))?;
                    Ok(vec![TreeNode {
                        node: company,
                        children,
                    }])
                }
                None => build_tree(nodes, None),
            }
        }
        .await;

        if let Err(err) = &result {
            report_inconsistency("org_tree", NodeKind::Company, err);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(name: &str, parent_id: Option<Uuid>, order_index: i32) -> Node {
        Node::new(NodeKind::EmployeeLevel, name.to_string(), parent_id, order_index)
    }

    fn names(forest: &[TreeNode]) -> Vec<&str> {
        forest.iter().map(|t| t.node.name.as_str()).collect()
    }

    #[test]
    fn test_nests_and_sorts_children() {
        let root = level("Director", None, 0);
        let second = level("Manager", Some(root.id), 1);
        let first = level("Lead", Some(root.id), 0);
        let leaf = level("Engineer", Some(first.id), 0);

        let forest = build_tree(vec![leaf, second, root, first], None).unwrap();
        assert_eq!(names(&forest), vec!["Director"]);
        assert_eq!(names(&forest[0].children), vec!["Lead", "Manager"]);
        assert_eq!(names(&forest[0].children[0].children), vec!["Engineer"]);
        assert_eq!(forest[0].size(), 4);
    }

    #[test]
    fn test_equal_indices_fall_back_to_name() {
        let forest = build_tree(vec![level("B", None, 0), level("A", None, 0)], None).unwrap();
        assert_eq!(names(&forest), vec!["A", "B"]);
    }

    #[test]
    fn test_subtree_under_given_parent() {
        let root = level("Director", None, 0);
        let child = level("Lead", Some(root.id), 0);
        let forest = build_tree(vec![root.clone(), child], Some(root.id)).unwrap();
        assert_eq!(names(&forest), vec!["Lead"]);
    }

    #[test]
    fn test_node_with_absent_parent_fails_instead_of_vanishing() {
        let orphan = level("Orphan", Some(Uuid::new_v4()), 0);
        let root = level("Director", None, 0);
        let result = build_tree(vec![orphan, root], None);
        assert!(matches!(result, Err(HierarchyError::InternalConsistency(_))));
    }

    #[test]
    fn test_top_level_build_keeps_every_node() {
        let root = level("Director", None, 0);
        let lead = level("Lead", Some(root.id), 0);
        let input = vec![
            root.clone(),
            lead.clone(),
            level("Engineer", Some(lead.id), 0),
            level("Manager", Some(root.id), 1),
            level("Advisor", None, 1),
        ];
        let count = input.len();

        let forest = build_tree(input, None).unwrap();
        assert_eq!(forest.iter().map(TreeNode::size).sum::<usize>(), count);
    }

    #[test]
    fn test_stored_loop_fails_instead_of_recursing() {
        let mut a = level("A", None, 0);
        let mut b = level("B", None, 0);
        a.parent_id = Some(b.id);
        b.parent_id = Some(a.id);
        let root = level("Root", None, 0);

        let result = build_tree(vec![a.clone(), b, root], None);
        assert!(matches!(result, Err(HierarchyError::InternalConsistency(_))));

        let mut c = level("C", None, 0);
        c.parent_id = Some(a.id);
        let mut a2 = a.clone();
        a2.parent_id = Some(c.id);
        let result = build_tree(vec![a2.clone(), c], Some(a2.id));
        assert!(matches!(result, Err(HierarchyError::InternalConsistency(_))));
    }

    #[test]
    fn test_empty_input() {
        assert!(build_tree(Vec::new(), None).unwrap().is_empty());
    }
}
