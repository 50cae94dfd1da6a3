use crate::model::{EdgeKey, Id, Item, ItemRelationship, SchemaDef};
use crate::store::batch::{WriteBatch, WriteOp};
use crate::store::traits::{BatchStore, ItemStore, RelationshipStore, SchemaCatalogStore};
use anyhow::Result;
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct MemoryInner {
    items: HashMap<Id, Item>,
    edges: HashMap<EdgeKey, ItemRelationship>,
    schemas: HashMap<String, SchemaDef>,
}

/// In-memory store over hash maps behind a single lock. Batch application
/// holds the write lock for the whole batch, which is what makes it atomic
/// with respect to readers.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of item rows, soft-deleted included (test introspection)
    pub fn item_count(&self) -> usize {
        self.inner.read().items.len()
    }
}

#[async_trait::async_trait]
impl ItemStore for MemoryStore {
    async fn get_item(&self, id: &Id) -> Result<Option<Item>> {
        Ok(self.inner.read().items.get(id).cloned())
    }

    async fn list_items_for_workspace(&self, workspace_id: &Id) -> Result<Vec<Item>> {
        Ok(self
            .inner
            .read()
            .items
            .values()
            .filter(|item| &item.workspace_id == workspace_id)
            .cloned()
            .collect())
    }

    async fn find_by_schema(&self, workspace_id: &Id, schema_slug: &str) -> Result<Vec<Item>> {
        Ok(self
            .inner
            .read()
            .items
            .values()
            .filter(|item| &item.workspace_id == workspace_id && item.schema_slug == schema_slug)
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl RelationshipStore for MemoryStore {
    async fn get_edge(&self, key: &EdgeKey) -> Result<Option<ItemRelationship>> {
        Ok(self.inner.read().edges.get(key).cloned())
    }

    async fn list_edges_for_item(&self, item_id: &Id) -> Result<Vec<ItemRelationship>> {
        Ok(self
            .inner
            .read()
            .edges
            .values()
            .filter(|edge| edge.key().touches(item_id))
            .cloned()
            .collect())
    }

    async fn count_edges(&self) -> Result<usize> {
        Ok(self.inner.read().edges.len())
    }
}

#[async_trait::async_trait]
impl SchemaCatalogStore for MemoryStore {
    async fn save_schema(&self, schema: &SchemaDef) -> Result<()> {
        self.inner
            .write()
            .schemas
            .insert(schema.slug.clone(), schema.clone());
        Ok(())
    }

    async fn list_schemas(&self) -> Result<Vec<SchemaDef>> {
        Ok(self.inner.read().schemas.values().cloned().collect())
    }
}

#[async_trait::async_trait]
impl BatchStore for MemoryStore {
    async fn apply(&self, batch: WriteBatch) -> Result<()> {
        let mut inner = self.inner.write();
        for op in batch.ops {
            match op {
                WriteOp::PutItem(item) => {
                    inner.items.insert(item.id.clone(), item);
                }
                WriteOp::SoftDeleteItem { id, actor, at } => {
                    if let Some(item) = inner.items.get_mut(&id) {
                        item.soft_delete(&actor, at);
                    }
                    inner.edges.retain(|key, _| !key.touches(&id));
                }
                WriteOp::PutEdge(edge) => {
                    inner.edges.entry(edge.key()).or_insert(edge);
                }
                WriteOp::DeleteEdge(key) => {
                    inner.edges.remove(&key);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::JsonMap;
    use chrono::Utc;

    fn item(id: &str, schema: &str) -> Item {
        let mut item = Item::new(schema, &JsonMap::new(), &"ws".to_string(), &"u".to_string());
        item.id = id.to_string();
        item
    }

    fn edge(source: &str, target: &str, name: &str) -> ItemRelationship {
        ItemRelationship::new(&source.to_string(), &target.to_string(), name, JsonMap::new())
    }

    #[tokio::test]
    async fn put_edge_is_find_or_create() {
        let store = MemoryStore::new();
        let first = edge("a", "b", "requests");
        let first_id = first.id.clone();

        let mut batch = WriteBatch::new();
        batch.put_edge(first);
        batch.put_edge(edge("a", "b", "requests"));
        store.apply(batch).await.unwrap();

        assert_eq!(store.count_edges().await.unwrap(), 1);
        let key = EdgeKey::new(&"a".to_string(), &"b".to_string(), "requests");
        // the original edge survives, the duplicate insert is a no-op
        assert_eq!(store.get_edge(&key).await.unwrap().unwrap().id, first_id);
    }

    #[tokio::test]
    async fn soft_delete_cascades_incident_edges() {
        let store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        batch.put_item(item("a", "contact"));
        batch.put_item(item("b", "request"));
        batch.put_item(item("c", "request"));
        batch.put_edge(edge("a", "b", "requests"));
        batch.put_edge(edge("b", "a", "contacts"));
        batch.put_edge(edge("a", "c", "requests"));
        store.apply(batch).await.unwrap();
        assert_eq!(store.count_edges().await.unwrap(), 3);

        let mut batch = WriteBatch::new();
        batch.soft_delete_item(&"b".to_string(), &"u2".to_string(), Utc::now());
        store.apply(batch).await.unwrap();

        let b = store.get_item(&"b".to_string()).await.unwrap().unwrap();
        assert!(b.is_deleted());
        assert_eq!(b.deleted_by, Some("u2".to_string()));
        // only the a<->c edge remains
        assert_eq!(store.count_edges().await.unwrap(), 1);
        assert_eq!(
            store
                .list_edges_for_item(&"a".to_string())
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn workspace_and_schema_lookups() {
        let store = MemoryStore::new();
        let mut other = item("x", "contact");
        other.workspace_id = "ws-2".to_string();

        let mut batch = WriteBatch::new();
        batch.put_item(item("a", "contact"));
        batch.put_item(item("b", "request"));
        batch.put_item(other);
        store.apply(batch).await.unwrap();

        assert_eq!(
            store
                .list_items_for_workspace(&"ws".to_string())
                .await
                .unwrap()
                .len(),
            2
        );
        assert_eq!(
            store
                .find_by_schema(&"ws".to_string(), "contact")
                .await
                .unwrap()
                .len(),
            1
        );
    }
}
