use crate::model::{EdgeKey, Id, Item, ItemRelationship};
use chrono::{DateTime, Utc};

/// One mutation inside an atomic write batch
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Insert or replace an item row
    PutItem(Item),
    /// Set the soft-delete stamp and cascade-delete incident edges
    SoftDeleteItem {
        id: Id,
        actor: Id,
        at: DateTime<Utc>,
    },
    /// Find-or-create an edge; a no-op when the triple already exists
    PutEdge(ItemRelationship),
    DeleteEdge(EdgeKey),
}

/// Overlay view of an item staged in a batch
#[derive(Debug, Clone, PartialEq)]
pub enum Staged {
    Item(Item),
    Deleted,
}

/// Ordered set of writes applied atomically by `Store::apply`. The nested
/// attributes processor plans an entire write tree into one batch, then
/// applies it in a single shot: a validation failure anywhere means the
/// batch is simply dropped and nothing persists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    pub ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn put_item(&mut self, item: Item) {
        self.ops.push(WriteOp::PutItem(item));
    }

    pub fn soft_delete_item(&mut self, id: &Id, actor: &Id, at: DateTime<Utc>) {
        self.ops.push(WriteOp::SoftDeleteItem {
            id: id.clone(),
            actor: actor.clone(),
            at,
        });
    }

    pub fn put_edge(&mut self, edge: ItemRelationship) {
        self.ops.push(WriteOp::PutEdge(edge));
    }

    pub fn delete_edge(&mut self, key: EdgeKey) {
        self.ops.push(WriteOp::DeleteEdge(key));
    }

    /// Latest staged state of `id` in this batch, if any op touches it.
    /// Recursion over a nested write reads its own pending writes this way.
    pub fn staged_item(&self, id: &Id) -> Option<Staged> {
        for op in self.ops.iter().rev() {
            match op {
                WriteOp::PutItem(item) if &item.id == id => {
                    return Some(Staged::Item(item.clone()))
                }
                WriteOp::SoftDeleteItem { id: deleted, .. } if deleted == id => {
                    return Some(Staged::Deleted)
                }
                _ => {}
            }
        }
        None
    }

    /// Whether this batch already determines the existence of an edge:
    /// `Some(true)` staged-created, `Some(false)` staged-deleted (directly or
    /// via an endpoint soft delete), `None` undetermined.
    pub fn staged_edge(&self, key: &EdgeKey) -> Option<bool> {
        for op in self.ops.iter().rev() {
            match op {
                WriteOp::PutEdge(edge) if &edge.key() == key => return Some(true),
                WriteOp::DeleteEdge(deleted) if deleted == key => return Some(false),
                WriteOp::SoftDeleteItem { id, .. } if key.touches(id) => return Some(false),
                _ => {}
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::JsonMap;

    fn item(id: &str) -> Item {
        let mut item = Item::new("contact", &JsonMap::new(), &"ws".to_string(), &"u".to_string());
        item.id = id.to_string();
        item
    }

    #[test]
    fn staged_item_reflects_latest_op() {
        let mut batch = WriteBatch::new();
        batch.put_item(item("a"));
        assert!(matches!(
            batch.staged_item(&"a".to_string()),
            Some(Staged::Item(_))
        ));

        batch.soft_delete_item(&"a".to_string(), &"u".to_string(), Utc::now());
        assert_eq!(batch.staged_item(&"a".to_string()), Some(Staged::Deleted));
        assert_eq!(batch.staged_item(&"b".to_string()), None);
    }

    #[test]
    fn staged_edge_sees_creates_deletes_and_cascades() {
        let mut batch = WriteBatch::new();
        let key = EdgeKey::new(&"a".to_string(), &"b".to_string(), "requests");

        assert_eq!(batch.staged_edge(&key), None);

        batch.put_edge(ItemRelationship::new(
            &"a".to_string(),
            &"b".to_string(),
            "requests",
            JsonMap::new(),
        ));
        assert_eq!(batch.staged_edge(&key), Some(true));

        batch.delete_edge(key.clone());
        assert_eq!(batch.staged_edge(&key), Some(false));

        batch.put_edge(ItemRelationship::new(
            &"a".to_string(),
            &"b".to_string(),
            "requests",
            JsonMap::new(),
        ));
        batch.soft_delete_item(&"b".to_string(), &"u".to_string(), Utc::now());
        assert_eq!(batch.staged_edge(&key), Some(false));
    }
}
