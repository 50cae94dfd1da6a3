use serde_json::Value;
use uuid::Uuid;

pub type Id = String;

/// JSON object payload carried by items and edges
pub type JsonMap = serde_json::Map<String, Value>;

/// Marker suffix for payload keys that embed nested sub-object writes
pub const NESTED_ATTRIBUTES_SUFFIX: &str = "_attributes";

pub fn generate_id() -> Id {
    Uuid::new_v4().to_string()
}

/// If `key` carries the nested-attributes marker, return the relationship
/// name it denotes (the key with the suffix stripped). A bare `_attributes`
/// key has no relationship name and is not considered nested.
pub fn nested_relationship_name(key: &str) -> Option<&str> {
    let name = key.strip_suffix(NESTED_ATTRIBUTES_SUFFIX)?;
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Truthiness of the `_destroy` marker on a nested element: boolean true,
/// integer 1, or the literal strings "1"/"true". Everything else is false.
pub fn is_destroy_flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64() == Some(1),
        Value::String(s) => s == "1" || s == "true",
        _ => false,
    }
}

/// Copy of `payload` with every nested-marker key removed. This is the flat
/// view that schema validation and persistence see; the original payload is
/// kept around for the nested-attributes processor.
pub fn strip_nested_keys(payload: &JsonMap) -> JsonMap {
    payload
        .iter()
        .filter(|(key, _)| nested_relationship_name(key).is_none())
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Extract an element's identifying id, tolerating numeric ids in payloads
pub fn element_id(value: &Value) -> Option<Id> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
