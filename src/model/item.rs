use crate::model::{generate_id, strip_nested_keys, Id, JsonMap};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted, schema-typed record with an opaque JSON payload.
///
/// The payload stored in `data` is always the flat view: nested-marker keys
/// are stripped before persistence. Items are soft-deleted only, never
/// removed by this layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: Id,
    pub workspace_id: Id,
    pub schema_slug: String,
    pub data: JsonMap,

    pub created_by: Id,
    pub created_at: DateTime<Utc>,
    pub updated_by: Id,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_by: Option<Id>,
}

impl Item {
    /// Build a fresh item from an (already unstripped) write payload.
    /// Nested-marker keys are dropped from the stored data here.
    pub fn new(schema_slug: &str, payload: &JsonMap, workspace_id: &Id, actor: &Id) -> Self {
        let now = Utc::now();
        Self {
            id: generate_id(),
            workspace_id: workspace_id.clone(),
            schema_slug: schema_slug.to_string(),
            data: strip_nested_keys(payload),
            created_by: actor.clone(),
            created_at: now,
            updated_by: actor.clone(),
            updated_at: now,
            deleted_at: None,
            deleted_by: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Shallow-merge a payload onto the existing data (update semantics:
    /// merge, not replace). Nested-marker keys are dropped first.
    pub fn merge_payload(&mut self, payload: &JsonMap, actor: &Id) {
        for (key, value) in strip_nested_keys(payload) {
            self.data.insert(key, value);
        }
        self.updated_by = actor.clone();
        self.updated_at = Utc::now();
    }

    pub fn soft_delete(&mut self, actor: &Id, at: DateTime<Utc>) {
        self.deleted_at = Some(at);
        self.deleted_by = Some(actor.clone());
        self.updated_by = actor.clone();
        self.updated_at = at;
    }
}
