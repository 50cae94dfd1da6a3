use crate::model::{EdgeKey, Id, Item, ItemRelationship, SchemaDef};
use crate::store::batch::WriteBatch;
use anyhow::Result;

#[async_trait::async_trait]
pub trait ItemStore: Send + Sync {
    /// Fetch an item row as stored, soft-deleted rows included; callers that
    /// want live items filter on `is_deleted`
    async fn get_item(&self, id: &Id) -> Result<Option<Item>>;
    async fn list_items_for_workspace(&self, workspace_id: &Id) -> Result<Vec<Item>>;
    async fn find_by_schema(&self, workspace_id: &Id, schema_slug: &str) -> Result<Vec<Item>>;
}

#[async_trait::async_trait]
pub trait RelationshipStore: Send + Sync {
    async fn get_edge(&self, key: &EdgeKey) -> Result<Option<ItemRelationship>>;
    async fn list_edges_for_item(&self, item_id: &Id) -> Result<Vec<ItemRelationship>>;
    async fn count_edges(&self) -> Result<usize>;
}

/// Mirror of the in-memory schema registry for introspection
#[async_trait::async_trait]
pub trait SchemaCatalogStore: Send + Sync {
    async fn save_schema(&self, schema: &SchemaDef) -> Result<()>;
    async fn list_schemas(&self) -> Result<Vec<SchemaDef>>;
}

#[async_trait::async_trait]
pub trait BatchStore: Send + Sync {
    /// Apply every op in order, atomically: either the whole batch commits
    /// or none of it does. `PutEdge` is find-or-create; `SoftDeleteItem`
    /// cascade-deletes edges touching the item.
    async fn apply(&self, batch: WriteBatch) -> Result<()>;
}

pub trait Store:
    ItemStore + RelationshipStore + SchemaCatalogStore + BatchStore + Send + Sync
{
}

impl<T: ItemStore + RelationshipStore + SchemaCatalogStore + BatchStore + Send + Sync> Store for T {}
