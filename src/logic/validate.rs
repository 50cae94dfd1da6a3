use crate::logic::errors::{ValidationErrors, Violation};
use crate::model::{strip_nested_keys, JsonMap};
use crate::registry::SchemaRegistry;
use serde_json::Value;

/// Validate a write payload against the registered schema for `schema_slug`.
///
/// Two checks, in order: the slug must resolve in the registry (otherwise a
/// field-level error lands on `schema_slug`), then the payload with nested
/// sub-object keys stripped is run through the compiled JSON Schema
/// validator. Raw validator failures are transformed into the nested error
/// document; nothing here raises.
pub fn validate_payload(
    registry: &SchemaRegistry,
    schema_slug: &str,
    payload: &JsonMap,
) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    let validator = match registry.validator(schema_slug) {
        Some(validator) => validator,
        None => {
            errors.add("schema_slug", "is not registered");
            return errors;
        }
    };

    let flat = Value::Object(strip_nested_keys(payload));
    if let Err(violations) = validator.validate(&flat) {
        let collected: Vec<Violation> = violations
            .map(|error| Violation::new(error.instance_path.to_string(), error.to_string()))
            .collect();
        errors.merge(ValidationErrors::from_violations(&collected));
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldDef, FieldType, SchemaDef};
    use serde_json::json;

    fn registry_with_contact() -> SchemaRegistry {
        let mut schema = SchemaDef::new("Contact");
        schema.fields = vec![
            FieldDef::new("first_name", FieldType::String),
            FieldDef {
                required: true,
                ..FieldDef::new("last_name", FieldType::String)
            },
            FieldDef {
                enum_values: Some(vec![json!("lead"), json!("customer")]),
                ..FieldDef::new("status", FieldType::String)
            },
            FieldDef::new("age", FieldType::Integer),
        ];
        let registry = SchemaRegistry::new();
        registry.register(schema).unwrap();
        registry
    }

    fn payload(value: serde_json::Value) -> JsonMap {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn valid_payload_produces_no_errors() {
        let registry = registry_with_contact();
        let errors = validate_payload(
            &registry,
            "contact",
            &payload(json!({"first_name": "John", "last_name": "Doe", "status": "lead"})),
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn missing_required_field_is_keyed_at_that_field() {
        let registry = registry_with_contact();
        let errors = validate_payload(&registry, "contact", &payload(json!({"first_name": "John"})));
        assert_eq!(errors.to_value(), json!({"last_name": ["can't be blank"]}));
    }

    #[test]
    fn enum_violation_maps_to_inclusion_message() {
        let registry = registry_with_contact();
        let errors = validate_payload(
            &registry,
            "contact",
            &payload(json!({"last_name": "Doe", "status": "archduke"})),
        );
        assert_eq!(
            errors.to_value(),
            json!({"status": ["is not included in the list"]})
        );
    }

    #[test]
    fn wrong_type_maps_to_type_message() {
        let registry = registry_with_contact();
        let errors = validate_payload(
            &registry,
            "contact",
            &payload(json!({"last_name": "Doe", "age": "old"})),
        );
        assert_eq!(errors.to_value(), json!({"age": ["must be an integer"]}));
    }

    #[test]
    fn unknown_keys_are_tolerated_in_non_strict_mode() {
        let registry = registry_with_contact();
        let errors = validate_payload(
            &registry,
            "contact",
            &payload(json!({"last_name": "Doe", "nickname": "J"})),
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn nested_marker_keys_never_reach_the_validator() {
        let registry = registry_with_contact();
        // addresses_attributes would fail a strict validator; it must be
        // stripped before validation
        let errors = validate_payload(
            &registry,
            "contact",
            &payload(json!({
                "last_name": "Doe",
                "addresses_attributes": [{"street": "Main St"}]
            })),
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn unregistered_schema_is_a_field_error_not_a_panic() {
        let registry = registry_with_contact();
        let errors = validate_payload(&registry, "ghost", &payload(json!({"x": 1})));
        assert_eq!(
            errors.to_value(),
            json!({"schema_slug": ["is not registered"]})
        );
    }
}
