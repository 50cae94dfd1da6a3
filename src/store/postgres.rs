use anyhow::{Context, Result};
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, PgPool, Row};

use crate::model::{EdgeKey, Id, Item, ItemRelationship, JsonMap, SchemaDef};
use crate::store::batch::{WriteBatch, WriteOp};
use crate::store::traits::{BatchStore, ItemStore, RelationshipStore, SchemaCatalogStore};

const ITEM_COLUMNS: &str = "id, workspace_id, schema_slug, data, created_by, created_at, \
                            updated_by, updated_at, deleted_at, deleted_by";

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store with the given database URL
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .connect(database_url)
            .await
            .context("Failed to create PostgreSQL connection pool")?;

        Ok(Self { pool })
    }

    /// Create the item/edge/catalog tables when missing. The unique
    /// constraint on (source_id, target_id, relationship_type) is the
    /// backstop for concurrent edge creation races.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS items (
                id TEXT PRIMARY KEY,
                workspace_id TEXT NOT NULL,
                schema_slug TEXT NOT NULL,
                data JSONB NOT NULL DEFAULT '{}'::jsonb,
                created_by TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                updated_by TEXT NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL,
                deleted_at TIMESTAMPTZ,
                deleted_by TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create items table")?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_items_workspace_schema \
             ON items (workspace_id, schema_slug)",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create items index")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS item_relationships (
                id TEXT PRIMARY KEY,
                source_id TEXT NOT NULL,
                target_id TEXT NOT NULL,
                relationship_type TEXT NOT NULL,
                metadata JSONB NOT NULL DEFAULT '{}'::jsonb,
                UNIQUE (source_id, target_id, relationship_type)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create item_relationships table")?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_item_relationships_target \
             ON item_relationships (target_id)",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create item_relationships index")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS schema_catalog (
                slug TEXT PRIMARY KEY,
                definition JSONB NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create schema_catalog table")?;

        Ok(())
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn json_object(value: Value) -> JsonMap {
    value.as_object().cloned().unwrap_or_default()
}

fn item_from_row(row: &sqlx::postgres::PgRow) -> Item {
    Item {
        id: row.get("id"),
        workspace_id: row.get("workspace_id"),
        schema_slug: row.get("schema_slug"),
        data: json_object(row.get("data")),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
        updated_by: row.get("updated_by"),
        updated_at: row.get("updated_at"),
        deleted_at: row.get("deleted_at"),
        deleted_by: row.get("deleted_by"),
    }
}

fn edge_from_row(row: &sqlx::postgres::PgRow) -> ItemRelationship {
    ItemRelationship {
        id: row.get("id"),
        source_id: row.get("source_id"),
        target_id: row.get("target_id"),
        relationship_type: row.get("relationship_type"),
        metadata: json_object(row.get("metadata")),
    }
}

#[async_trait::async_trait]
impl ItemStore for PostgresStore {
    async fn get_item(&self, id: &Id) -> Result<Option<Item>> {
        let row = sqlx::query(&format!("SELECT {} FROM items WHERE id = $1", ITEM_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch item")?;

        Ok(row.as_ref().map(item_from_row))
    }

    async fn list_items_for_workspace(&self, workspace_id: &Id) -> Result<Vec<Item>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM items WHERE workspace_id = $1 ORDER BY created_at",
            ITEM_COLUMNS
        ))
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list items for workspace")?;

        Ok(rows.iter().map(item_from_row).collect())
    }

    async fn find_by_schema(&self, workspace_id: &Id, schema_slug: &str) -> Result<Vec<Item>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM items WHERE workspace_id = $1 AND schema_slug = $2 ORDER BY created_at",
            ITEM_COLUMNS
        ))
        .bind(workspace_id)
        .bind(schema_slug)
        .fetch_all(&self.pool)
        .await
        .context("Failed to find items by schema")?;

        Ok(rows.iter().map(item_from_row).collect())
    }
}

#[async_trait::async_trait]
impl RelationshipStore for PostgresStore {
    async fn get_edge(&self, key: &EdgeKey) -> Result<Option<ItemRelationship>> {
        let row = sqlx::query(
            "SELECT id, source_id, target_id, relationship_type, metadata \
             FROM item_relationships \
             WHERE source_id = $1 AND target_id = $2 AND relationship_type = $3",
        )
        .bind(&key.source_id)
        .bind(&key.target_id)
        .bind(&key.relationship_type)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch edge")?;

        Ok(row.as_ref().map(edge_from_row))
    }

    async fn list_edges_for_item(&self, item_id: &Id) -> Result<Vec<ItemRelationship>> {
        let rows = sqlx::query(
            "SELECT id, source_id, target_id, relationship_type, metadata \
             FROM item_relationships \
             WHERE source_id = $1 OR target_id = $1",
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list edges for item")?;

        Ok(rows.iter().map(edge_from_row).collect())
    }

    async fn count_edges(&self) -> Result<usize> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM item_relationships")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count edges")?;

        let count: i64 = row.get("count");
        Ok(count as usize)
    }
}

#[async_trait::async_trait]
impl SchemaCatalogStore for PostgresStore {
    async fn save_schema(&self, schema: &SchemaDef) -> Result<()> {
        let definition = serde_json::to_value(schema).context("Failed to serialize schema")?;
        sqlx::query(
            "INSERT INTO schema_catalog (slug, definition) VALUES ($1, $2) \
             ON CONFLICT (slug) DO UPDATE SET definition = EXCLUDED.definition",
        )
        .bind(&schema.slug)
        .bind(definition)
        .execute(&self.pool)
        .await
        .context("Failed to save schema")?;

        Ok(())
    }

    async fn list_schemas(&self) -> Result<Vec<SchemaDef>> {
        let rows = sqlx::query("SELECT definition FROM schema_catalog ORDER BY slug")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list schemas")?;

        let mut schemas = Vec::with_capacity(rows.len());
        for row in rows {
            let definition: Value = row.get("definition");
            schemas.push(
                serde_json::from_value(definition).context("Failed to deserialize schema")?,
            );
        }
        Ok(schemas)
    }
}

#[async_trait::async_trait]
impl BatchStore for PostgresStore {
    async fn apply(&self, batch: WriteBatch) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        for op in batch.ops {
            match op {
                WriteOp::PutItem(item) => {
                    sqlx::query(
                        r#"
                        INSERT INTO items (id, workspace_id, schema_slug, data, created_by,
                                           created_at, updated_by, updated_at, deleted_at, deleted_by)
                        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                        ON CONFLICT (id) DO UPDATE SET
                            data = EXCLUDED.data,
                            updated_by = EXCLUDED.updated_by,
                            updated_at = EXCLUDED.updated_at,
                            deleted_at = EXCLUDED.deleted_at,
                            deleted_by = EXCLUDED.deleted_by
                        "#,
                    )
                    .bind(&item.id)
                    .bind(&item.workspace_id)
                    .bind(&item.schema_slug)
                    .bind(Value::Object(item.data.clone()))
                    .bind(&item.created_by)
                    .bind(item.created_at)
                    .bind(&item.updated_by)
                    .bind(item.updated_at)
                    .bind(item.deleted_at)
                    .bind(&item.deleted_by)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to upsert item")?;
                }
                WriteOp::SoftDeleteItem { id, actor, at } => {
                    sqlx::query(
                        "UPDATE items SET deleted_at = $2, deleted_by = $3, \
                         updated_at = $2, updated_by = $3 \
                         WHERE id = $1 AND deleted_at IS NULL",
                    )
                    .bind(&id)
                    .bind(at)
                    .bind(&actor)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to soft-delete item")?;

                    sqlx::query(
                        "DELETE FROM item_relationships WHERE source_id = $1 OR target_id = $1",
                    )
                    .bind(&id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to cascade edges")?;
                }
                WriteOp::PutEdge(edge) => {
                    // duplicate-insert races settle on the unique constraint
                    sqlx::query(
                        "INSERT INTO item_relationships \
                         (id, source_id, target_id, relationship_type, metadata) \
                         VALUES ($1, $2, $3, $4, $5) \
                         ON CONFLICT (source_id, target_id, relationship_type) DO NOTHING",
                    )
                    .bind(&edge.id)
                    .bind(&edge.source_id)
                    .bind(&edge.target_id)
                    .bind(&edge.relationship_type)
                    .bind(Value::Object(edge.metadata.clone()))
                    .execute(&mut *tx)
                    .await
                    .context("Failed to insert edge")?;
                }
                WriteOp::DeleteEdge(key) => {
                    sqlx::query(
                        "DELETE FROM item_relationships \
                         WHERE source_id = $1 AND target_id = $2 AND relationship_type = $3",
                    )
                    .bind(&key.source_id)
                    .bind(&key.target_id)
                    .bind(&key.relationship_type)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to delete edge")?;
                }
            }
        }

        tx.commit().await.context("Failed to commit batch")?;
        Ok(())
    }
}
