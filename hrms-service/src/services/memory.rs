//! In-process node store for tests and local development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::repository::{NodeRepository, RepositoryError};
use crate::models::{Node, NodeKind, Scope};

/// Mutex-guarded map of nodes. Each call holds the lock for its whole
/// duration, which gives batch writes the same all-or-nothing behaviour as a
/// database transaction.
pub struct InMemoryNodeRepository {
    nodes: Mutex<HashMap<Uuid, Node>>,
}

impl Default for InMemoryNodeRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryNodeRepository {
    pub fn new() -> Self {
        Self {
            nodes: Mutex::new(HashMap::new()),
        }
    }

    /// Store seeded with existing rows, written as-is without any checks.
    pub fn with_nodes(nodes: impl IntoIterator<Item = Node>) -> Self {
        Self {
            nodes: Mutex::new(nodes.into_iter().map(|n| (n.id, n)).collect()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<Uuid, Node>>, RepositoryError> {
        self.nodes
            .lock()
            .map_err(|e| RepositoryError::Unavailable(format!("node store mutex poisoned: {}", e)))
    }
}

fn sorted(mut nodes: Vec<Node>) -> Vec<Node> {
    nodes.sort_by(|a, b| {
        a.order_index
            .cmp(&b.order_index)
            .then_with(|| a.name.cmp(&b.name))
    });
    nodes
}

fn exists(store: &HashMap<Uuid, Node>, kind: NodeKind, id: Uuid) -> bool {
    store.get(&id).is_some_and(|n| n.kind == kind)
}

#[async_trait]
impl NodeRepository for InMemoryNodeRepository {
    async fn find_by_id(&self, kind: NodeKind, id: Uuid) -> Result<Option<Node>, RepositoryError> {
        let store = self.lock()?;
        Ok(store.get(&id).filter(|n| n.kind == kind).cloned())
    }

    async fn find_all_in_scope(
        &self,
        kind: NodeKind,
        parent_id: Option<Uuid>,
    ) -> Result<Vec<Node>, RepositoryError> {
        let store = self.lock()?;
        let nodes = store
            .values()
            .filter(|n| n.kind == kind && n.parent_id == parent_id)
            .cloned()
            .collect();
        Ok(sorted(nodes))
    }

    async fn find_all(&self, kind: NodeKind) -> Result<Vec<Node>, RepositoryError> {
        let store = self.lock()?;
        let nodes = store.values().filter(|n| n.kind == kind).cloned().collect();
        Ok(sorted(nodes))
    }

    async fn insert(&self, nodes: &[Node]) -> Result<Vec<Node>, RepositoryError> {
        let mut store = self.lock()?;
        let mut staged: HashMap<Uuid, Node> = HashMap::new();
        let mut inserted = Vec::with_capacity(nodes.len());
        let mut skipped: HashMap<Scope, i32> = HashMap::new();

        for node in nodes {
            let duplicate = store
                .values()
                .chain(staged.values())
                .any(|n| n.kind == node.kind && n.parent_id == node.parent_id && n.name == node.name);
            if duplicate || store.contains_key(&node.id) || staged.contains_key(&node.id) {
                *skipped.entry(node.scope()).or_default() += 1;
                continue;
            }

            if let (Some(parent_id), Some(parent_kind)) = (node.parent_id, node.kind.parent_kind()) {
                if !exists(&store, parent_kind, parent_id) && !exists(&staged, parent_kind, parent_id)
                {
                    return Err(RepositoryError::Missing {
                        kind: parent_kind,
                        id: parent_id,
                    });
                }
            }

            let mut node = node.clone();
            node.order_index -= skipped.get(&node.scope()).copied().unwrap_or(0);
            staged.insert(node.id, node.clone());
            inserted.push(node);
        }

        store.extend(staged);
        Ok(inserted)
    }

    async fn update_many(&self, nodes: &[Node]) -> Result<(), RepositoryError> {
        let mut store = self.lock()?;

        if let Some(missing) = nodes.iter().find(|n| !exists(&store, n.kind, n.id)) {
            return Err(RepositoryError::Missing {
                kind: missing.kind,
                id: missing.id,
            });
        }
        for node in nodes {
            if let (Some(parent_id), Some(parent_kind)) = (node.parent_id, node.kind.parent_kind()) {
                if !exists(&store, parent_kind, parent_id) {
                    return Err(RepositoryError::Missing {
                        kind: parent_kind,
                        id: parent_id,
                    });
                }
            }
        }

        for node in nodes {
            store.insert(node.id, node.clone());
        }
        Ok(())
    }

    async fn delete(
        &self,
        kind: NodeKind,
        id: Uuid,
        resequenced: &[Node],
    ) -> Result<bool, RepositoryError> {
        let mut store = self.lock()?;

        if !exists(&store, kind, id) {
            return Ok(false);
        }
        if let Some(missing) = resequenced
            .iter()
            .find(|n| n.id == id || !exists(&store, n.kind, n.id))
        {
            return Err(RepositoryError::Missing {
                kind: missing.kind,
                id: missing.id,
            });
        }
        let referenced = kind
            .child_kinds()
            .iter()
            .any(|child| store.values().any(|n| n.kind == *child && n.parent_id == Some(id)));
        if referenced {
            return Err(RepositoryError::Constraint(format!(
                "{} {} is still referenced",
                kind.label(),
                id
            )));
        }

        store.remove(&id);
        for node in resequenced {
            store.insert(node.id, node.clone());
        }
        Ok(true)
    }

    async fn count_referencing(&self, kind: NodeKind, id: Uuid) -> Result<u64, RepositoryError> {
        let store = self.lock()?;
        let count = kind
            .child_kinds()
            .iter()
            .map(|child| {
                store
                    .values()
                    .filter(|n| n.kind == *child && n.parent_id == Some(id))
                    .count() as u64
            })
            .sum();
        Ok(count)
    }

    async fn health_check(&self) -> Result<(), RepositoryError> {
        self.lock().map(|_| ())
    }
}
