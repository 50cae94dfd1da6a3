use crate::error::{EngineError, EngineResult};
use crate::logic::errors::ValidationErrors;
use crate::logic::nested::NestedAttributesProcessor;
use crate::logic::relationships::RelationshipService;
use crate::logic::validate::validate_payload;
use crate::model::{Id, Item, ItemRelationship, JsonMap};
use crate::registry::SchemaRegistry;
use crate::store::{Store, WriteBatch};
use chrono::Utc;
use std::sync::Arc;

/// The write surface request-handling callers go through: entity
/// create/update/delete plus link/unlink, with nested-attributes processing
/// wired into every entity write.
pub struct ItemService<S> {
    store: Arc<S>,
    registry: Arc<SchemaRegistry>,
}

impl<S: Store> ItemService<S> {
    pub fn new(store: Arc<S>, registry: Arc<SchemaRegistry>) -> Self {
        Self { store, registry }
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create an item from a full (unstripped) write payload. The flat view
    /// is validated and persisted; the original payload drives nested
    /// processing. Root write and the whole nested tree land in one batch:
    /// a validation failure at any depth persists nothing.
    pub async fn create_item(
        &self,
        schema_slug: &str,
        payload: &JsonMap,
        workspace_id: &Id,
        actor: &Id,
    ) -> EngineResult<Item> {
        let errors = validate_payload(&self.registry, schema_slug, payload);
        if !errors.is_empty() {
            return Err(EngineError::Validation(errors));
        }

        let item = Item::new(schema_slug, payload, workspace_id, actor);
        let mut batch = WriteBatch::new();
        batch.put_item(item.clone());

        let mut errors = ValidationErrors::new();
        NestedAttributesProcessor::process(
            self.store.as_ref(),
            &self.registry,
            &item,
            payload,
            actor,
            &mut batch,
            &mut errors,
        )
        .await?;
        if !errors.is_empty() {
            return Err(EngineError::Validation(errors));
        }

        self.store.apply(batch).await?;
        log::debug!("created item {} ({})", item.id, schema_slug);
        Ok(item)
    }

    /// Update an item with merge semantics: the payload's flat fields are
    /// shallow-merged onto the existing data, never replacing it wholesale
    pub async fn update_item(
        &self,
        item_id: &Id,
        payload: &JsonMap,
        actor: &Id,
    ) -> EngineResult<Item> {
        let mut item = self
            .store
            .get_item(item_id)
            .await?
            .filter(|item| !item.is_deleted())
            .ok_or_else(|| EngineError::ItemNotFound(item_id.clone()))?;

        item.merge_payload(payload, actor);
        let errors = validate_payload(&self.registry, &item.schema_slug, &item.data);
        if !errors.is_empty() {
            return Err(EngineError::Validation(errors));
        }

        let mut batch = WriteBatch::new();
        batch.put_item(item.clone());

        let mut errors = ValidationErrors::new();
        NestedAttributesProcessor::process(
            self.store.as_ref(),
            &self.registry,
            &item,
            payload,
            actor,
            &mut batch,
            &mut errors,
        )
        .await?;
        if !errors.is_empty() {
            return Err(EngineError::Validation(errors));
        }

        self.store.apply(batch).await?;
        Ok(item)
    }

    /// Live item lookup; soft-deleted items read as absent
    pub async fn get_item(&self, item_id: &Id) -> EngineResult<Option<Item>> {
        Ok(self
            .store
            .get_item(item_id)
            .await?
            .filter(|item| !item.is_deleted()))
    }

    /// Soft-delete an item; its edges cascade away. Returns whether a live
    /// item was deleted.
    pub async fn delete_item(&self, item_id: &Id, actor: &Id) -> EngineResult<bool> {
        if self.get_item(item_id).await?.is_none() {
            return Ok(false);
        }
        let mut batch = WriteBatch::new();
        batch.soft_delete_item(item_id, actor, Utc::now());
        self.store.apply(batch).await?;
        Ok(true)
    }

    pub async fn link(
        &self,
        source_id: &Id,
        target_id: &Id,
        relationship_type: &str,
        metadata: JsonMap,
    ) -> EngineResult<ItemRelationship> {
        let source = self.require_item(source_id).await?;
        let target = self.require_item(target_id).await?;
        RelationshipService::create(
            self.store.as_ref(),
            &self.registry,
            &source,
            &target,
            relationship_type,
            metadata,
            true,
        )
        .await
    }

    pub async fn unlink(
        &self,
        source_id: &Id,
        target_id: &Id,
        relationship_type: &str,
    ) -> EngineResult<()> {
        let source = self.require_item(source_id).await?;
        RelationshipService::destroy(
            self.store.as_ref(),
            &self.registry,
            &source,
            target_id,
            relationship_type,
            true,
        )
        .await
    }

    async fn require_item(&self, item_id: &Id) -> EngineResult<Item> {
        self.get_item(item_id)
            .await?
            .ok_or_else(|| EngineError::ItemNotFound(item_id.clone()))
    }
}
