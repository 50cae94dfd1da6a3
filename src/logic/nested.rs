use crate::error::EngineResult;
use crate::logic::errors::ValidationErrors;
use crate::logic::relationships::RelationshipService;
use crate::logic::validate::validate_payload;
use crate::model::{
    element_id, is_destroy_flag, nested_relationship_name, strip_nested_keys, Cardinality, EdgeKey,
    Id, Item, JsonMap, RelationshipDef, NESTED_ATTRIBUTES_SUFFIX,
};
use crate::registry::SchemaRegistry;
use crate::store::{Staged, Store, WriteBatch};
use chrono::Utc;
use std::future::Future;
use std::pin::Pin;

/// Walks a write payload for `*_attributes` keys and stages the implied
/// creates/updates/links/unlinks of related entities into the same batch as
/// the root write.
///
/// Per element: an id plus a truthy `_destroy` unlinks (and, for
/// one-directional relationships, soft-deletes) the target; a bare id links
/// idempotently and shallow-merges the element's flat fields; no id creates
/// a fresh entity of the declared target schema. The walk recurses through
/// each element's own nested keys. Child validation failures are collected
/// into `errors`, nested under the association key; the caller refuses to
/// apply the batch when any were found, so a failure at any depth leaves
/// nothing persisted.
pub struct NestedAttributesProcessor;

impl NestedAttributesProcessor {
    /// Process the nested keys of `payload` for `current`, which must
    /// already be staged in `batch`
    pub async fn process<S: Store>(
        store: &S,
        registry: &SchemaRegistry,
        current: &Item,
        payload: &JsonMap,
        actor: &Id,
        batch: &mut WriteBatch,
        errors: &mut ValidationErrors,
    ) -> EngineResult<()> {
        process_entity(
            store,
            registry,
            current.clone(),
            payload.clone(),
            actor.clone(),
            batch,
            errors,
        )
        .await
    }
}

fn process_entity<'a, S: Store>(
    store: &'a S,
    registry: &'a SchemaRegistry,
    current: Item,
    payload: JsonMap,
    actor: Id,
    batch: &'a mut WriteBatch,
    errors: &'a mut ValidationErrors,
) -> Pin<Box<dyn Future<Output = EngineResult<()>> + Send + 'a>> {
    Box::pin(async move {
        for (key, value) in &payload {
            let rel_name = match nested_relationship_name(key) {
                Some(name) => name,
                None => continue,
            };
            let elements = match value.as_array() {
                Some(elements) => elements,
                None => continue,
            };
            // unknown nested keys are tolerated, not an error
            let rel = match registry.relationship(&current.schema_slug, rel_name) {
                Some(rel) => rel,
                None => {
                    log::debug!(
                        "ignoring undeclared nested key '{}' on schema '{}'",
                        key,
                        current.schema_slug
                    );
                    continue;
                }
            };

            for (index, element) in elements.iter().enumerate() {
                let element = match element.as_object() {
                    Some(element) => element,
                    None => continue,
                };
                let target_id = element.get("id").and_then(element_id);
                let destroy = element.get("_destroy").map(is_destroy_flag).unwrap_or(false);

                match (target_id, destroy) {
                    (Some(target_id), true) => {
                        // dangling ids are skipped, not errors
                        if load_item(store, batch, &target_id).await?.is_none() {
                            continue;
                        }
                        RelationshipService::plan_destroy(
                            registry,
                            batch,
                            &current.schema_slug,
                            &current.id,
                            &target_id,
                            &rel.name,
                            true,
                        );
                        if rel.inverse.is_none() {
                            // a one-directional target has no identity
                            // outside this parent: detaching deletes it
                            batch.soft_delete_item(&target_id, &actor, Utc::now());
                        }
                    }
                    (Some(target_id), false) => {
                        let target = match load_item(store, batch, &target_id).await? {
                            Some(target) => target,
                            None => continue,
                        };
                        let forward = EdgeKey::new(&current.id, &target.id, &rel.name);
                        if !edge_exists(store, batch, &forward).await? {
                            RelationshipService::plan_create(
                                registry,
                                batch,
                                &current,
                                &target,
                                &rel.name,
                                JsonMap::new(),
                                true,
                            )?;
                        }

                        let updates = element_fields(element);
                        let mut updated = target;
                        if !updates.is_empty() {
                            updated.merge_payload(&updates, &actor);
                        }
                        let mut child_errors =
                            validate_payload(registry, &updated.schema_slug, &updated.data);
                        if child_errors.is_empty() {
                            if !updates.is_empty() {
                                batch.put_item(updated.clone());
                            }
                            process_entity(
                                store,
                                registry,
                                updated,
                                element.clone(),
                                actor.clone(),
                                batch,
                                &mut child_errors,
                            )
                            .await?;
                        }
                        attach(errors, &rel, index, child_errors);
                    }
                    (None, true) => {
                        // destroy flag on a not-yet-created element: nothing to do
                    }
                    (None, false) => {
                        let fields = element_fields(element);
                        let mut child_errors = validate_payload(registry, &rel.target, &fields);
                        if child_errors.is_empty() {
                            let child =
                                Item::new(&rel.target, &fields, &current.workspace_id, &actor);
                            batch.put_item(child.clone());
                            RelationshipService::plan_create(
                                registry,
                                batch,
                                &current,
                                &child,
                                &rel.name,
                                JsonMap::new(),
                                true,
                            )?;
                            process_entity(
                                store,
                                registry,
                                child,
                                element.clone(),
                                actor.clone(),
                                batch,
                                &mut child_errors,
                            )
                            .await?;
                        }
                        attach(errors, &rel, index, child_errors);
                    }
                }
            }
        }
        Ok(())
    })
}

/// Flat fields of a nested element: nested-marker keys plus the control
/// keys (`id`, `_destroy`) removed
fn element_fields(element: &JsonMap) -> JsonMap {
    let mut fields = strip_nested_keys(element);
    fields.remove("id");
    fields.remove("_destroy");
    fields
}

fn attach(errors: &mut ValidationErrors, rel: &RelationshipDef, index: usize, child: ValidationErrors) {
    if child.is_empty() {
        return;
    }
    let key = format!("{}{}", rel.name, NESTED_ATTRIBUTES_SUFFIX);
    match rel.cardinality {
        Cardinality::Many => errors.attach_child(&key, index, child),
        Cardinality::One => errors.attach_one(&key, child),
    }
}

/// Read an item through the batch overlay so recursion sees its own pending
/// writes; live items only
async fn load_item<S: Store>(store: &S, batch: &WriteBatch, id: &Id) -> EngineResult<Option<Item>> {
    match batch.staged_item(id) {
        Some(Staged::Item(item)) => Ok(Some(item)),
        Some(Staged::Deleted) => Ok(None),
        None => Ok(store.get_item(id).await?.filter(|item| !item.is_deleted())),
    }
}

async fn edge_exists<S: Store>(store: &S, batch: &WriteBatch, key: &EdgeKey) -> EngineResult<bool> {
    if let Some(staged) = batch.staged_edge(key) {
        return Ok(staged);
    }
    Ok(store.get_edge(key).await?.is_some())
}
