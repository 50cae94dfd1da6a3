use crate::model::{generate_id, Id, JsonMap};
use serde::{Deserialize, Serialize};

/// One persisted directed edge between two items, typed by relationship
/// name. At most one edge exists per (source, target, type) triple; the
/// stores enforce this with find-or-create / unique-constraint semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRelationship {
    pub id: Id,
    pub source_id: Id,
    pub target_id: Id,
    pub relationship_type: String,
    #[serde(default, skip_serializing_if = "JsonMap::is_empty")]
    pub metadata: JsonMap,
}

impl ItemRelationship {
    pub fn new(source_id: &Id, target_id: &Id, relationship_type: &str, metadata: JsonMap) -> Self {
        Self {
            id: generate_id(),
            source_id: source_id.clone(),
            target_id: target_id.clone(),
            relationship_type: relationship_type.to_string(),
            metadata,
        }
    }

    /// The identity triple this edge is unique over
    pub fn key(&self) -> EdgeKey {
        EdgeKey {
            source_id: self.source_id.clone(),
            target_id: self.target_id.clone(),
            relationship_type: self.relationship_type.clone(),
        }
    }
}

/// Lookup/identity key for an edge
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeKey {
    pub source_id: Id,
    pub target_id: Id,
    pub relationship_type: String,
}

impl EdgeKey {
    pub fn new(source_id: &Id, target_id: &Id, relationship_type: &str) -> Self {
        Self {
            source_id: source_id.clone(),
            target_id: target_id.clone(),
            relationship_type: relationship_type.to_string(),
        }
    }

    pub fn touches(&self, item_id: &Id) -> bool {
        &self.source_id == item_id || &self.target_id == item_id
    }
}
