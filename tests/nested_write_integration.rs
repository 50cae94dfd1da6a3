use itemdb::model::{EdgeKey, JsonMap};
use itemdb::store::{ItemStore, MemoryStore, RelationshipStore};
use itemdb::{register_demo_schemas, EngineError, ItemService, SchemaRegistry};
use serde_json::json;
use std::sync::Arc;

fn payload(value: serde_json::Value) -> JsonMap {
    value.as_object().cloned().unwrap_or_default()
}

fn service() -> ItemService<MemoryStore> {
    let registry = Arc::new(SchemaRegistry::new());
    register_demo_schemas(&registry).unwrap();
    ItemService::new(Arc::new(MemoryStore::new()), registry)
}

fn ws() -> String {
    "ws-1".to_string()
}

fn actor() -> String {
    "user-1".to_string()
}

#[tokio::test]
async fn create_with_nested_children_persists_items_and_edges() {
    let service = service();

    let contact = service
        .create_item(
            "contact",
            &payload(json!({
                "first_name": "John",
                "last_name": "Doe",
                "addresses_attributes": [
                    {"street": "Main St 1", "city": "Malmo"},
                    {"street": "Side St 2"}
                ]
            })),
            &ws(),
            &actor(),
        )
        .await
        .unwrap();

    // nested keys never land in the flat record
    assert!(!contact.data.contains_key("addresses_attributes"));
    assert_eq!(contact.data.get("last_name"), Some(&json!("Doe")));

    assert_eq!(service.store().item_count(), 3);
    assert_eq!(service.store().count_edges().await.unwrap(), 2);

    let edges = service
        .store()
        .list_edges_for_item(&contact.id)
        .await
        .unwrap();
    assert_eq!(edges.len(), 2);
    assert!(edges
        .iter()
        .all(|edge| edge.relationship_type == "addresses" && edge.source_id == contact.id));
}

#[tokio::test]
async fn bidirectional_create_writes_forward_and_inverse_edges() {
    let service = service();

    let contact = service
        .create_item(
            "contact",
            &payload(json!({
                "last_name": "Doe",
                "requests_attributes": [{"subject": "Help"}]
            })),
            &ws(),
            &actor(),
        )
        .await
        .unwrap();

    let requests = service
        .store()
        .find_by_schema(&ws(), "request")
        .await
        .unwrap();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];

    let forward = EdgeKey::new(&contact.id, &request.id, "requests");
    let inverse = EdgeKey::new(&request.id, &contact.id, "contacts");
    assert!(service.store().get_edge(&forward).await.unwrap().is_some());
    assert!(service.store().get_edge(&inverse).await.unwrap().is_some());
    assert_eq!(service.store().count_edges().await.unwrap(), 2);
}

#[tokio::test]
async fn relinking_an_existing_child_is_idempotent() {
    let service = service();

    let contact = service
        .create_item(
            "contact",
            &payload(json!({"last_name": "Doe"})),
            &ws(),
            &actor(),
        )
        .await
        .unwrap();
    let request = service
        .create_item(
            "request",
            &payload(json!({"subject": "Help"})),
            &ws(),
            &actor(),
        )
        .await
        .unwrap();

    for _ in 0..2 {
        service
            .update_item(
                &contact.id,
                &payload(json!({
                    "requests_attributes": [{"id": request.id}]
                })),
                &actor(),
            )
            .await
            .unwrap();
    }

    // forward + inverse once, not four edges
    assert_eq!(service.store().count_edges().await.unwrap(), 2);
}

#[tokio::test]
async fn destroy_flag_unlinks_and_deletes_only_one_directional_targets() {
    let service = service();

    let contact = service
        .create_item(
            "contact",
            &payload(json!({
                "last_name": "Doe",
                "addresses_attributes": [{"street": "Main St 1"}],
                "requests_attributes": [{"subject": "Help"}]
            })),
            &ws(),
            &actor(),
        )
        .await
        .unwrap();

    let address = service
        .store()
        .find_by_schema(&ws(), "address")
        .await
        .unwrap()
        .remove(0);
    let request = service
        .store()
        .find_by_schema(&ws(), "request")
        .await
        .unwrap()
        .remove(0);

    service
        .update_item(
            &contact.id,
            &payload(json!({
                "addresses_attributes": [{"id": address.id, "_destroy": true}],
                "requests_attributes": [{"id": request.id, "_destroy": "1"}]
            })),
            &actor(),
        )
        .await
        .unwrap();

    assert_eq!(service.store().count_edges().await.unwrap(), 0);
    // address declares no inverse: detaching deletes it
    assert!(service.get_item(&address.id).await.unwrap().is_none());
    // request is bidirectional: it keeps living on its own
    let request = service.get_item(&request.id).await.unwrap().unwrap();
    assert!(!request.is_deleted());
}

#[tokio::test]
async fn dangling_ids_and_undeclared_keys_are_tolerated() {
    let service = service();

    let contact = service
        .create_item(
            "contact",
            &payload(json!({
                "last_name": "Doe",
                "requests_attributes": [{"id": "no-such-item", "subject": "x"}],
                "pets_attributes": [{"name": "Rex"}]
            })),
            &ws(),
            &actor(),
        )
        .await
        .unwrap();

    assert_eq!(service.store().item_count(), 1);
    assert_eq!(service.store().count_edges().await.unwrap(), 0);
    assert!(!contact.data.contains_key("pets_attributes"));
}

#[tokio::test]
async fn root_validation_failure_persists_nothing() {
    let service = service();

    let err = service
        .create_item(
            "contact",
            &payload(json!({"first_name": "John"})),
            &ws(),
            &actor(),
        )
        .await
        .unwrap_err();

    let errors = err.validation_errors().unwrap();
    assert_eq!(errors.to_value(), json!({"last_name": ["can't be blank"]}));
    assert_eq!(service.store().item_count(), 0);
}

#[tokio::test]
async fn child_validation_failure_rolls_back_the_whole_tree() {
    let service = service();

    let err = service
        .create_item(
            "contact",
            &payload(json!({
                "last_name": "Doe",
                "addresses_attributes": [
                    {"street": "Main St 1"},
                    {"city": "Malmo"}
                ]
            })),
            &ws(),
            &actor(),
        )
        .await
        .unwrap_err();

    let errors = err.validation_errors().unwrap();
    assert_eq!(
        errors.to_value(),
        json!({
            "addresses_attributes": [{}, {"street": ["can't be blank"]}]
        })
    );
    // the valid root and first child never landed either
    assert_eq!(service.store().item_count(), 0);
    assert_eq!(service.store().count_edges().await.unwrap(), 0);
}

#[tokio::test]
async fn grandchildren_recurse_through_nested_keys() {
    let service = service();

    let contact = service
        .create_item(
            "contact",
            &payload(json!({
                "last_name": "Doe",
                "requests_attributes": [{
                    "subject": "Onboarding",
                    "documents_attributes": [{"title": "Contract", "mime_type": "application/pdf"}]
                }]
            })),
            &ws(),
            &actor(),
        )
        .await
        .unwrap();

    assert_eq!(service.store().item_count(), 3);

    let request = service
        .store()
        .find_by_schema(&ws(), "request")
        .await
        .unwrap()
        .remove(0);
    let document = service
        .store()
        .find_by_schema(&ws(), "document")
        .await
        .unwrap()
        .remove(0);

    let doc_edge = EdgeKey::new(&request.id, &document.id, "documents");
    assert!(service.store().get_edge(&doc_edge).await.unwrap().is_some());
    // contact <-> request both ways, request -> document one way
    assert_eq!(service.store().count_edges().await.unwrap(), 3);
    assert!(service.get_item(&contact.id).await.unwrap().is_some());
}

#[tokio::test]
async fn grandchild_validation_error_nests_two_levels_deep() {
    let service = service();

    let err = service
        .create_item(
            "contact",
            &payload(json!({
                "last_name": "Doe",
                "requests_attributes": [{
                    "subject": "Onboarding",
                    "documents_attributes": [{"mime_type": "application/pdf"}]
                }]
            })),
            &ws(),
            &actor(),
        )
        .await
        .unwrap_err();

    let errors = err.validation_errors().unwrap();
    assert_eq!(
        errors.to_value(),
        json!({
            "requests_attributes": [{
                "documents_attributes": [{"title": ["can't be blank"]}]
            }]
        })
    );
    assert_eq!(service.store().item_count(), 0);
}

#[tokio::test]
async fn update_merges_flat_fields_and_applies_nested_updates() {
    let service = service();

    let contact = service
        .create_item(
            "contact",
            &payload(json!({
                "first_name": "John",
                "last_name": "Doe",
                "addresses_attributes": [{"street": "Main St 1", "city": "Malmo"}]
            })),
            &ws(),
            &actor(),
        )
        .await
        .unwrap();
    let address = service
        .store()
        .find_by_schema(&ws(), "address")
        .await
        .unwrap()
        .remove(0);

    let updated = service
        .update_item(
            &contact.id,
            &payload(json!({
                "status": "customer",
                "addresses_attributes": [{"id": address.id, "street": "New St 9"}]
            })),
            &"user-2".to_string(),
        )
        .await
        .unwrap();

    // merge, not replace
    assert_eq!(updated.data.get("first_name"), Some(&json!("John")));
    assert_eq!(updated.data.get("status"), Some(&json!("customer")));
    assert_eq!(updated.updated_by, "user-2");

    let address = service.get_item(&address.id).await.unwrap().unwrap();
    assert_eq!(address.data.get("street"), Some(&json!("New St 9")));
    assert_eq!(address.data.get("city"), Some(&json!("Malmo")));
    // still exactly one contact->address edge
    assert_eq!(service.store().count_edges().await.unwrap(), 1);
}

#[tokio::test]
async fn strict_schema_rejects_unknown_fields_in_nested_children() {
    let service = service();

    let err = service
        .create_item(
            "contact",
            &payload(json!({
                "last_name": "Doe",
                "requests_attributes": [{
                    "subject": "Onboarding",
                    "documents_attributes": [{"title": "Contract", "rating": 5}]
                }]
            })),
            &ws(),
            &actor(),
        )
        .await
        .unwrap_err();

    let errors = err.validation_errors().unwrap().to_value();
    let doc_errors = &errors["requests_attributes"][0]["documents_attributes"][0];
    assert_eq!(doc_errors["base"], json!(["contains unknown fields"]));
}

#[tokio::test]
async fn explicit_link_and_unlink_round_trip() {
    let service = service();

    let contact = service
        .create_item(
            "contact",
            &payload(json!({"last_name": "Doe"})),
            &ws(),
            &actor(),
        )
        .await
        .unwrap();
    let request = service
        .create_item(
            "request",
            &payload(json!({"subject": "Help"})),
            &ws(),
            &actor(),
        )
        .await
        .unwrap();

    let edge = service
        .link(&contact.id, &request.id, "requests", JsonMap::new())
        .await
        .unwrap();
    assert_eq!(edge.source_id, contact.id);
    assert_eq!(service.store().count_edges().await.unwrap(), 2);

    // undeclared pairings never get an edge
    let err = service
        .link(&contact.id, &contact.id, "requests", JsonMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidRelationship { .. }));

    service
        .unlink(&contact.id, &request.id, "requests")
        .await
        .unwrap();
    assert_eq!(service.store().count_edges().await.unwrap(), 0);
}

#[tokio::test]
async fn soft_delete_hides_item_and_cascades_edges() {
    let service = service();

    let contact = service
        .create_item(
            "contact",
            &payload(json!({
                "last_name": "Doe",
                "requests_attributes": [{"subject": "Help"}]
            })),
            &ws(),
            &actor(),
        )
        .await
        .unwrap();

    assert!(service.delete_item(&contact.id, &actor()).await.unwrap());
    assert!(service.get_item(&contact.id).await.unwrap().is_none());
    assert_eq!(service.store().count_edges().await.unwrap(), 0);
    // repeat deletes report nothing to do
    assert!(!service.delete_item(&contact.id, &actor()).await.unwrap());

    // updating a deleted item is a not-found, not a resurrection
    let err = service
        .update_item(&contact.id, &payload(json!({"status": "lead"})), &actor())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ItemNotFound(_)));
}
