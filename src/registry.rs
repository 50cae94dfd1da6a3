use crate::error::{EngineError, EngineResult};
use crate::model::{RelationshipDef, SchemaDef};
use anyhow::anyhow;
use jsonschema::JSONSchema;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Derived lookup over every registered schema's relationship declarations,
/// keyed by (schema slug, relationship name). Rebuilt only on an explicit
/// `SchemaRegistry::rebuild` call; it is not kept in sync automatically.
#[derive(Debug, Default, Clone)]
pub struct RelationshipIndex {
    entries: HashMap<(String, String), RelationshipDef>,
}

impl RelationshipIndex {
    fn build(schemas: &HashMap<String, SchemaDef>) -> Self {
        let mut entries = HashMap::new();
        for schema in schemas.values() {
            for rel in &schema.relationships {
                entries.insert((schema.slug.clone(), rel.name.clone()), rel.clone());
            }
        }
        // Inverse declarations are checked at use time; disagreement on the
        // target schema is only worth a warning here.
        for ((slug, name), rel) in &entries {
            if let Some(inverse_name) = &rel.inverse {
                match entries.get(&(rel.target.clone(), inverse_name.clone())) {
                    Some(inverse) if &inverse.target == slug => {}
                    Some(inverse) => log::warn!(
                        "inverse of {}#{} points at '{}', expected '{}'",
                        slug,
                        name,
                        inverse.target,
                        slug
                    ),
                    None => log::warn!(
                        "inverse '{}' of {}#{} is not declared on '{}'",
                        inverse_name,
                        slug,
                        name,
                        rel.target
                    ),
                }
            }
        }
        Self { entries }
    }

    pub fn get(&self, schema_slug: &str, name: &str) -> Option<&RelationshipDef> {
        self.entries
            .get(&(schema_slug.to_string(), name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

struct RegistryInner {
    schemas: HashMap<String, SchemaDef>,
    validators: HashMap<String, Arc<JSONSchema>>,
    index: RelationshipIndex,
}

/// Process-wide table of registered schema definitions plus their compiled
/// JSON Schema validators and the derived relationship index.
///
/// Registration and `rebuild` are expected at process initialization or test
/// setup only; callers must serialize registry mutation externally and must
/// call `rebuild` after the schema set changes before relationship lookups
/// will see the new declarations.
pub struct SchemaRegistry {
    inner: RwLock<RegistryInner>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RegistryInner {
                schemas: HashMap::new(),
                validators: HashMap::new(),
                index: RelationshipIndex::default(),
            }),
        }
    }

    /// Register a schema, keyed by slug. Idempotent: re-registering an
    /// already-known slug replaces the entry and is never an error.
    pub fn register(&self, schema: SchemaDef) -> EngineResult<()> {
        let document = schema.json_schema();
        let validator = JSONSchema::compile(&document)
            .map_err(|e| anyhow!("schema '{}' does not compile: {}", schema.slug, e))?;

        let mut inner = self.inner.write();
        inner
            .validators
            .insert(schema.slug.clone(), Arc::new(validator));
        inner.schemas.insert(schema.slug.clone(), schema);
        Ok(())
    }

    pub fn find(&self, slug: &str) -> Option<SchemaDef> {
        self.inner.read().schemas.get(slug).cloned()
    }

    pub fn require(&self, slug: &str) -> EngineResult<SchemaDef> {
        self.find(slug)
            .ok_or_else(|| EngineError::SchemaNotFound(slug.to_string()))
    }

    pub fn validator(&self, slug: &str) -> Option<Arc<JSONSchema>> {
        self.inner.read().validators.get(slug).cloned()
    }

    /// Rebuild the derived relationship index from the current schema set
    pub fn rebuild(&self) {
        let mut inner = self.inner.write();
        inner.index = RelationshipIndex::build(&inner.schemas);
        log::debug!(
            "relationship index rebuilt: {} schemas, {} declarations",
            inner.schemas.len(),
            inner.index.len()
        );
    }

    /// Relationship declaration under `name` on `schema_slug`, read from the
    /// derived index (honors the rebuild contract)
    pub fn relationship(&self, schema_slug: &str, name: &str) -> Option<RelationshipDef> {
        self.inner.read().index.get(schema_slug, name).cloned()
    }

    /// True only if `name` is declared on the source schema and its declared
    /// target equals `target_slug`. Sole gatekeeper for edge operations.
    pub fn is_valid(&self, source_slug: &str, target_slug: &str, name: &str) -> bool {
        self.inner
            .read()
            .index
            .get(source_slug, name)
            .map(|rel| rel.target == target_slug)
            .unwrap_or(false)
    }

    pub fn slugs(&self) -> Vec<String> {
        self.inner.read().schemas.keys().cloned().collect()
    }

    pub fn relationship_count(&self) -> usize {
        self.inner.read().index.len()
    }

    /// Snapshot of every registered schema (catalog mirroring)
    pub fn schemas(&self) -> Vec<SchemaDef> {
        self.inner.read().schemas.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().schemas.is_empty()
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}
