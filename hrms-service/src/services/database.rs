//! PostgreSQL node store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{info, instrument};
use uuid::Uuid;

use super::metrics::record_db_query;
use super::repository::{NodeRepository, RepositoryError};
use crate::models::{Node, NodeKind, NodeStatus, Scope};

const COLUMNS: &str = "id, name, parent_id, order_index, status, created_utc, updated_utc";

#[derive(Debug, FromRow)]
struct NodeRow {
    id: Uuid,
    name: String,
    parent_id: Option<Uuid>,
    order_index: i32,
    status: NodeStatus,
    created_utc: DateTime<Utc>,
    updated_utc: DateTime<Utc>,
}

impl NodeRow {
    fn into_node(self, kind: NodeKind) -> Node {
        Node {
            id: self.id,
            kind,
            name: self.name,
            parent_id: self.parent_id,
            order_index: self.order_index,
            status: self.status,
            created_utc: self.created_utc,
            updated_utc: self.updated_utc,
        }
    }
}

fn map_db_error(e: sqlx::Error) -> RepositoryError {
    match e {
        sqlx::Error::Database(ref db_err)
            if db_err.is_unique_violation() || db_err.is_foreign_key_violation() =>
        {
            RepositoryError::Constraint(db_err.message().to_string())
        }
        other => RepositoryError::Database(other),
    }
}

/// Errors from writing `node`. A foreign key violation on insert or update
/// can only come from its parent row being absent.
fn map_write_error(node: &Node) -> impl FnOnce(sqlx::Error) -> RepositoryError + '_ {
    move |e| {
        if let (sqlx::Error::Database(db_err), Some(parent_id), Some(parent_kind)) =
            (&e, node.parent_id, node.kind.parent_kind())
        {
            if db_err.is_foreign_key_violation() {
                return RepositoryError::Missing {
                    kind: parent_kind,
                    id: parent_id,
                };
            }
        }
        map_db_error(e)
    }
}

/// One table per node kind, all with the same column set. Table names come
/// from [`NodeKind::table`] and are never user input.
#[derive(Clone)]
pub struct PgNodeRepository {
    pool: PgPool,
}

impl PgNodeRepository {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "hrms-service"))]
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    async fn write_node(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        node: &Node,
    ) -> Result<u64, RepositoryError> {
        let sql = format!(
            "UPDATE {} SET name = $2, parent_id = $3, order_index = $4, status = $5, updated_utc = $6 WHERE id = $1",
            node.kind.table()
        );
        let result = sqlx::query(&sql)
            .bind(node.id)
            .bind(&node.name)
            .bind(node.parent_id)
            .bind(node.order_index)
            .bind(node.status)
            .bind(node.updated_utc)
            .execute(&mut **tx)
            .await
            .map_err(map_write_error(node))?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl NodeRepository for PgNodeRepository {
    #[instrument(skip(self), fields(kind = %kind, node_id = %id))]
    async fn find_by_id(&self, kind: NodeKind, id: Uuid) -> Result<Option<Node>, RepositoryError> {
        let start = Instant::now();
        let sql = format!("SELECT {} FROM {} WHERE id = $1", COLUMNS, kind.table());
        let row = sqlx::query_as::<_, NodeRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        record_db_query("find_by_id", start.elapsed());

        Ok(row.map(|r| r.into_node(kind)))
    }

    #[instrument(skip(self), fields(kind = %kind))]
    async fn find_all_in_scope(
        &self,
        kind: NodeKind,
        parent_id: Option<Uuid>,
    ) -> Result<Vec<Node>, RepositoryError> {
        let start = Instant::now();
        let sql = format!(
            "SELECT {} FROM {} WHERE parent_id IS NOT DISTINCT FROM $1 ORDER BY order_index, name",
            COLUMNS,
            kind.table()
        );
        let rows = sqlx::query_as::<_, NodeRow>(&sql)
            .bind(parent_id)
            .fetch_all(&self.pool)
            .await?;
        record_db_query("find_all_in_scope", start.elapsed());

        Ok(rows.into_iter().map(|r| r.into_node(kind)).collect())
    }

    #[instrument(skip(self), fields(kind = %kind))]
    async fn find_all(&self, kind: NodeKind) -> Result<Vec<Node>, RepositoryError> {
        let start = Instant::now();
        let sql = format!(
            "SELECT {} FROM {} ORDER BY order_index, name",
            COLUMNS,
            kind.table()
        );
        let rows = sqlx::query_as::<_, NodeRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        record_db_query("find_all", start.elapsed());

        Ok(rows.into_iter().map(|r| r.into_node(kind)).collect())
    }

    #[instrument(skip(self, nodes), fields(count = nodes.len()))]
    async fn insert(&self, nodes: &[Node]) -> Result<Vec<Node>, RepositoryError> {
        let start = Instant::now();
        let mut tx = self.pool.begin().await?;
        let mut inserted = Vec::with_capacity(nodes.len());
        // Rows skipped so far per scope; later rows in that scope shift down.
        let mut skipped: HashMap<Scope, i32> = HashMap::new();

        for node in nodes {
            let order_index = node.order_index - skipped.get(&node.scope()).copied().unwrap_or(0);
            let sql = format!(
                r#"
                INSERT INTO {} (id, name, parent_id, order_index, status, created_utc, updated_utc)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (parent_id, name) DO NOTHING
                RETURNING {}
                "#,
                node.kind.table(),
                COLUMNS
            );
            let row = sqlx::query_as::<_, NodeRow>(&sql)
                .bind(node.id)
                .bind(&node.name)
                .bind(node.parent_id)
                .bind(order_index)
                .bind(node.status)
                .bind(node.created_utc)
                .bind(node.updated_utc)
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_write_error(node))?;

            match row {
                Some(row) => inserted.push(row.into_node(node.kind)),
                None => {
                    info!(
                        kind = %node.kind,
                        name = %node.name,
                        "Skipped duplicate node on insert"
                    );
                    *skipped.entry(node.scope()).or_default() += 1;
                }
            }
        }

        tx.commit().await.map_err(map_db_error)?;
        record_db_query("insert", start.elapsed());

        Ok(inserted)
    }

    #[instrument(skip(self, nodes), fields(count = nodes.len()))]
    async fn update_many(&self, nodes: &[Node]) -> Result<(), RepositoryError> {
        let start = Instant::now();
        let mut tx = self.pool.begin().await?;

        for node in nodes {
            if Self::write_node(&mut tx, node).await? == 0 {
                // Dropping the transaction rolls back the rows already written.
                return Err(RepositoryError::Missing {
                    kind: node.kind,
                    id: node.id,
                });
            }
        }

        tx.commit().await.map_err(map_db_error)?;
        record_db_query("update_many", start.elapsed());

        Ok(())
    }

    #[instrument(skip(self, resequenced), fields(kind = %kind, node_id = %id))]
    async fn delete(
        &self,
        kind: NodeKind,
        id: Uuid,
        resequenced: &[Node],
    ) -> Result<bool, RepositoryError> {
        let start = Instant::now();
        let mut tx = self.pool.begin().await?;

        let sql = format!("DELETE FROM {} WHERE id = $1", kind.table());
        let deleted = sqlx::query(&sql)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?
            .rows_affected();
        if deleted == 0 {
            return Ok(false);
        }

        for node in resequenced {
            if Self::write_node(&mut tx, node).await? == 0 {
                return Err(RepositoryError::Missing {
                    kind: node.kind,
                    id: node.id,
                });
            }
        }

        tx.commit().await.map_err(map_db_error)?;
        record_db_query("delete", start.elapsed());

        Ok(true)
    }

    #[instrument(skip(self), fields(kind = %kind, node_id = %id))]
    async fn count_referencing(&self, kind: NodeKind, id: Uuid) -> Result<u64, RepositoryError> {
        let start = Instant::now();
        let mut total: i64 = 0;

        for child in kind.child_kinds() {
            let sql = format!("SELECT COUNT(*) FROM {} WHERE parent_id = $1", child.table());
            let count: i64 = sqlx::query_scalar(&sql)
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
            total += count;
        }
        record_db_query("count_referencing", start.elapsed());

        Ok(total.max(0) as u64)
    }

    async fn health_check(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_repository() -> PgNodeRepository {
        let url = std::env::var("TEST_DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/hrms_test".to_string());
        let repo = PgNodeRepository::connect(&url, 2, 1)
            .await
            .expect("Failed to connect to test database");
        repo.run_migrations().await.expect("Failed to migrate");
        repo
    }

    #[tokio::test]
    #[ignore] // Requires running PostgreSQL
    async fn test_insert_and_scope_query() {
        let repo = test_repository().await;
        let company = Node::new(NodeKind::Company, format!("Acme {}", Uuid::new_v4()), None, 0);
        let branch = Node::new(NodeKind::Branch, "Pune".into(), Some(company.id), 0);

        let inserted = repo.insert(&[company.clone(), branch.clone()]).await.unwrap();
        assert_eq!(inserted.len(), 2);

        let scope = repo
            .find_all_in_scope(NodeKind::Branch, Some(company.id))
            .await
            .unwrap();
        assert_eq!(scope.len(), 1);
        assert_eq!(scope[0].id, branch.id);
        assert_eq!(
            repo.count_referencing(NodeKind::Company, company.id)
                .await
                .unwrap(),
            1
        );

        assert!(repo.delete(NodeKind::Branch, branch.id, &[]).await.unwrap());
        assert!(repo.delete(NodeKind::Company, company.id, &[]).await.unwrap());
    }

    #[tokio::test]
    #[ignore] // Requires running PostgreSQL
    async fn test_insert_closes_gap_left_by_skipped_row_and_reports_missing_parent() {
        let repo = test_repository().await;
        let company = Node::new(NodeKind::Company, format!("Acme {}", Uuid::new_v4()), None, 0);
        let pune = Node::new(NodeKind::Branch, "Pune".into(), Some(company.id), 0);
        repo.insert(&[company.clone(), pune.clone()]).await.unwrap();

        let racing = Node::new(NodeKind::Branch, "Pune".into(), Some(company.id), 1);
        let delhi = Node::new(NodeKind::Branch, "Delhi".into(), Some(company.id), 2);
        let inserted = repo.insert(&[racing, delhi.clone()]).await.unwrap();
        assert_eq!(inserted.len(), 1);
        assert_eq!(inserted[0].order_index, 1);

        let orphan = Node::new(NodeKind::Branch, "Mumbai".into(), Some(Uuid::new_v4()), 0);
        let result = repo.insert(&[orphan]).await;
        assert!(matches!(result, Err(RepositoryError::Missing { kind: NodeKind::Company, .. })));

        repo.delete(NodeKind::Branch, delhi.id, &[]).await.unwrap();
        repo.delete(NodeKind::Branch, pune.id, &[]).await.unwrap();
        repo.delete(NodeKind::Company, company.id, &[]).await.unwrap();
    }

    #[tokio::test]
    #[ignore] // Requires running PostgreSQL
    async fn test_update_many_rolls_back_on_missing_row() {
        let repo = test_repository().await;
        let zone = Node::new(NodeKind::Zone, format!("Zone {}", Uuid::new_v4()), None, 0);
        repo.insert(&[zone.clone()]).await.unwrap();

        let mut renamed = zone.clone();
        renamed.name = format!("{} renamed", zone.name);
        let ghost = Node::new(NodeKind::Zone, "ghost".into(), None, 1);

        let result = repo.update_many(&[renamed, ghost]).await;
        assert!(matches!(result, Err(RepositoryError::Missing { .. })));

        let stored = repo.find_by_id(NodeKind::Zone, zone.id).await.unwrap().unwrap();
        assert_eq!(stored.name, zone.name);

        repo.delete(NodeKind::Zone, zone.id, &[]).await.unwrap();
    }
}
