use crate::model::{Cardinality, FieldDef, FieldType, RelationshipDef, SchemaDef};
use crate::registry::SchemaRegistry;
use serde_json::json;

/// Demo schema set: a small CRM-ish object graph exercising required
/// fields, enums, bounds, strict mode, and both one-directional and
/// bidirectional relationships.
pub fn demo_schemas() -> Vec<SchemaDef> {
    let mut contact = SchemaDef::new("Contact");
    contact.description = Some("A person the workspace talks to".to_string());
    contact.fields = vec![
        FieldDef::new("first_name", FieldType::String),
        FieldDef {
            required: true,
            ..FieldDef::new("last_name", FieldType::String)
        },
        FieldDef {
            format: Some("email".to_string()),
            ..FieldDef::new("email", FieldType::String)
        },
        FieldDef {
            enum_values: Some(vec![json!("lead"), json!("customer"), json!("archived")]),
            ..FieldDef::new("status", FieldType::String)
        },
    ];
    contact.relationships = vec![
        // addresses have no life of their own: no inverse
        RelationshipDef {
            name: "addresses".to_string(),
            cardinality: Cardinality::Many,
            target: "address".to_string(),
            inverse: None,
        },
        RelationshipDef {
            name: "requests".to_string(),
            cardinality: Cardinality::Many,
            target: "request".to_string(),
            inverse: Some("contacts".to_string()),
        },
    ];

    let mut address = SchemaDef::new("Address");
    address.fields = vec![
        FieldDef {
            required: true,
            ..FieldDef::new("street", FieldType::String)
        },
        FieldDef::new("city", FieldType::String),
        FieldDef {
            pattern: Some(r"^\d{4,5}$".to_string()),
            ..FieldDef::new("postal_code", FieldType::String)
        },
    ];

    let mut request = SchemaDef::new("Request");
    request.fields = vec![
        FieldDef {
            required: true,
            ..FieldDef::new("subject", FieldType::String)
        },
        FieldDef {
            minimum: Some(1.0),
            maximum: Some(5.0),
            ..FieldDef::new("priority", FieldType::Integer)
        },
        FieldDef {
            enum_values: Some(vec![json!("open"), json!("closed")]),
            ..FieldDef::new("status", FieldType::String)
        },
    ];
    request.relationships = vec![
        RelationshipDef {
            name: "contacts".to_string(),
            cardinality: Cardinality::Many,
            target: "contact".to_string(),
            inverse: Some("requests".to_string()),
        },
        RelationshipDef {
            name: "documents".to_string(),
            cardinality: Cardinality::Many,
            target: "document".to_string(),
            inverse: None,
        },
    ];

    let mut document = SchemaDef::new("Document");
    document.strict = true;
    document.fields = vec![
        FieldDef {
            required: true,
            ..FieldDef::new("title", FieldType::String)
        },
        FieldDef::new("mime_type", FieldType::String),
    ];

    vec![contact, address, request, document]
}

/// Register the demo schemas and rebuild the relationship index
pub fn register_demo_schemas(registry: &SchemaRegistry) -> crate::error::EngineResult<()> {
    for schema in demo_schemas() {
        registry.register(schema)?;
    }
    registry.rebuild();
    Ok(())
}
