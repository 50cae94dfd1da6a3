pub mod config;
pub mod error;
pub mod logic;
pub mod model;
pub mod registry;
pub mod seed;
pub mod store;

// Export error types
pub use error::{EngineError, EngineResult};

// Export logic types
pub use logic::{
    validate_payload, ErrorTree, ItemService, NestedAttributesProcessor, RelationshipService,
    ValidationErrors, Violation,
};

// Export all model types
pub use model::*;

// Export registry
pub use registry::SchemaRegistry;

// Export seed module
pub use seed::*;

// Export store types
pub use store::{MemoryStore, PostgresStore, Store, WriteBatch};
