use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Primitive type a schema field accepts, mirroring JSON Schema type names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl FieldType {
    pub fn json_name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Array => "array",
            FieldType::Object => "object",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    One,
    Many,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    /// Closed value set for this field, when constrained
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    /// Format hint (e.g. "email", "date-time"); annotation only, not enforced
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
}

impl FieldDef {
    pub fn new(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            required: false,
            enum_values: None,
            format: None,
            pattern: None,
            min_length: None,
            max_length: None,
            minimum: None,
            maximum: None,
        }
    }

    /// JSON Schema fragment for this single field
    pub fn json_schema(&self) -> Value {
        let mut prop = serde_json::Map::new();
        prop.insert(
            "type".to_string(),
            Value::String(self.field_type.json_name().to_string()),
        );
        if let Some(values) = &self.enum_values {
            prop.insert("enum".to_string(), Value::Array(values.clone()));
        }
        if let Some(format) = &self.format {
            prop.insert("format".to_string(), Value::String(format.clone()));
        }
        if let Some(pattern) = &self.pattern {
            prop.insert("pattern".to_string(), Value::String(pattern.clone()));
        }
        if let Some(limit) = self.min_length {
            prop.insert("minLength".to_string(), limit.into());
        }
        if let Some(limit) = self.max_length {
            prop.insert("maxLength".to_string(), limit.into());
        }
        if let Some(limit) = self.minimum {
            prop.insert("minimum".to_string(), serde_json::json!(limit));
        }
        if let Some(limit) = self.maximum {
            prop.insert("maximum".to_string(), serde_json::json!(limit));
        }
        Value::Object(prop)
    }
}

/// Typed, directional link declared on a schema, with optional inverse.
/// A declaration with no inverse is one-directional: nested unlink semantics
/// treat the target as owned by the parent (see the nested processor).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipDef {
    pub name: String,
    pub cardinality: Cardinality,
    /// Slug of the schema this relationship points at
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inverse: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDef {
    /// String key derived from the title (e.g. "contact")
    pub slug: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub relationships: Vec<RelationshipDef>,
    /// When set, the generated JSON Schema forbids additional properties
    #[serde(default)]
    pub strict: bool,
}

impl SchemaDef {
    pub fn new(title: &str) -> Self {
        Self {
            slug: slugify(title),
            title: title.to_string(),
            description: None,
            fields: Vec::new(),
            relationships: Vec::new(),
            strict: false,
        }
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn get_relationship(&self, name: &str) -> Option<&RelationshipDef> {
        self.relationships.iter().find(|rel| rel.name == name)
    }

    /// Generate the draft-07 JSON Schema document items of this type are
    /// validated against. Non-strict by default: unknown properties are
    /// tolerated unless `strict` is set.
    pub fn json_schema(&self) -> Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();

        for field in &self.fields {
            properties.insert(field.name.clone(), field.json_schema());
            if field.required {
                required.push(Value::String(field.name.clone()));
            }
        }

        let mut doc = serde_json::Map::new();
        doc.insert(
            "$schema".to_string(),
            Value::String("http://json-schema.org/draft-07/schema#".to_string()),
        );
        doc.insert("type".to_string(), Value::String("object".to_string()));
        doc.insert("properties".to_string(), Value::Object(properties));
        if !required.is_empty() {
            doc.insert("required".to_string(), Value::Array(required));
        }
        if self.strict {
            doc.insert("additionalProperties".to_string(), Value::Bool(false));
        }
        Value::Object(doc)
    }
}

/// Derive a schema slug from a human title: lowercased, runs of
/// non-alphanumeric characters collapsed to single underscores
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_was_sep = true;
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_was_sep = false;
        } else if !last_was_sep {
            slug.push('_');
            last_was_sep = true;
        }
    }
    while slug.ends_with('_') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn slugify_titles() {
        assert_eq!(slugify("Contact"), "contact");
        assert_eq!(slugify("Purchase Request"), "purchase_request");
        assert_eq!(slugify("  Weird -- Title!"), "weird_title");
    }

    #[test]
    fn json_schema_document_shape() {
        let mut schema = SchemaDef::new("Contact");
        schema.fields = vec![
            FieldDef {
                required: true,
                ..FieldDef::new("last_name", FieldType::String)
            },
            FieldDef {
                enum_values: Some(vec![json!("lead"), json!("customer")]),
                ..FieldDef::new("status", FieldType::String)
            },
        ];

        let doc = schema.json_schema();
        assert_eq!(doc["type"], json!("object"));
        assert_eq!(doc["properties"]["last_name"]["type"], json!("string"));
        assert_eq!(
            doc["properties"]["status"]["enum"],
            json!(["lead", "customer"])
        );
        assert_eq!(doc["required"], json!(["last_name"]));
        // non-strict schemas leave additionalProperties unset
        assert!(doc.get("additionalProperties").is_none());
    }

    #[test]
    fn strict_schema_forbids_additional_properties() {
        let mut schema = SchemaDef::new("Document");
        schema.strict = true;
        assert_eq!(schema.json_schema()["additionalProperties"], json!(false));
    }
}
