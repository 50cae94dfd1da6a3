use crate::error::{EngineError, EngineResult};
use crate::model::{EdgeKey, Id, Item, ItemRelationship, JsonMap};
use crate::registry::SchemaRegistry;
use crate::store::{Store, WriteBatch};
use anyhow::anyhow;

/// Creates and destroys edges together with their declared inverses. The
/// registry's `is_valid` check is the only gatekeeper for edge creation;
/// a failed check is a configuration error, not bad user input.
pub struct RelationshipService;

impl RelationshipService {
    /// Find-or-create the forward edge and, when declared and requested, the
    /// swapped inverse edge, in one atomic batch. Returns the persisted
    /// forward edge (the existing one when the triple was already linked).
    pub async fn create<S: Store>(
        store: &S,
        registry: &SchemaRegistry,
        source: &Item,
        target: &Item,
        relationship_type: &str,
        metadata: JsonMap,
        create_inverse: bool,
    ) -> EngineResult<ItemRelationship> {
        let mut batch = WriteBatch::new();
        let forward = Self::plan_create(
            registry,
            &mut batch,
            source,
            target,
            relationship_type,
            metadata,
            create_inverse,
        )?;
        store.apply(batch).await?;

        let edge = store
            .get_edge(&forward.key())
            .await?
            .ok_or_else(|| anyhow!("edge missing after batch apply"))?;
        Ok(edge)
    }

    /// Delete the forward edge and, when declared and requested, its
    /// inverse, atomically. Partial deletion is never observable.
    pub async fn destroy<S: Store>(
        store: &S,
        registry: &SchemaRegistry,
        source: &Item,
        target_id: &Id,
        relationship_type: &str,
        destroy_inverse: bool,
    ) -> EngineResult<()> {
        let mut batch = WriteBatch::new();
        Self::plan_destroy(
            registry,
            &mut batch,
            &source.schema_slug,
            &source.id,
            target_id,
            relationship_type,
            destroy_inverse,
        );
        store.apply(batch).await?;
        Ok(())
    }

    /// Stage the forward (and inverse) edge creation into an existing batch
    pub fn plan_create(
        registry: &SchemaRegistry,
        batch: &mut WriteBatch,
        source: &Item,
        target: &Item,
        relationship_type: &str,
        metadata: JsonMap,
        create_inverse: bool,
    ) -> EngineResult<ItemRelationship> {
        if !registry.is_valid(&source.schema_slug, &target.schema_slug, relationship_type) {
            return Err(EngineError::InvalidRelationship {
                source_schema: source.schema_slug.clone(),
                target_schema: target.schema_slug.clone(),
                relationship: relationship_type.to_string(),
            });
        }

        let forward = ItemRelationship::new(&source.id, &target.id, relationship_type, metadata);
        batch.put_edge(forward.clone());

        if create_inverse {
            if let Some(inverse) = registry
                .relationship(&source.schema_slug, relationship_type)
                .and_then(|rel| rel.inverse)
            {
                batch.put_edge(ItemRelationship::new(
                    &target.id,
                    &source.id,
                    &inverse,
                    JsonMap::new(),
                ));
            }
        }
        Ok(forward)
    }

    /// Stage the forward (and inverse) edge deletion into an existing batch
    pub fn plan_destroy(
        registry: &SchemaRegistry,
        batch: &mut WriteBatch,
        source_schema: &str,
        source_id: &Id,
        target_id: &Id,
        relationship_type: &str,
        destroy_inverse: bool,
    ) {
        batch.delete_edge(EdgeKey::new(source_id, target_id, relationship_type));

        if destroy_inverse {
            if let Some(inverse) = registry
                .relationship(source_schema, relationship_type)
                .and_then(|rel| rel.inverse)
            {
                batch.delete_edge(EdgeKey::new(target_id, source_id, &inverse));
            }
        }
    }
}
