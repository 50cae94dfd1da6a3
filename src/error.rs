use crate::logic::errors::ValidationErrors;
use crate::model::Id;
use thiserror::Error;

/// Failures surfaced by the entity/relationship engine.
///
/// `Validation` carries the nested error document and is the only variant a
/// well-behaved caller recovers from; `InvalidRelationship` signals a
/// configuration error, not bad user input.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("schema '{0}' is not registered")]
    SchemaNotFound(String),

    #[error("item '{0}' not found")]
    ItemNotFound(Id),

    #[error("relationship '{relationship}' is not declared from '{source_schema}' to '{target_schema}'")]
    InvalidRelationship {
        source_schema: String,
        target_schema: String,
        relationship: String,
    },

    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl EngineError {
    /// The nested error document, when this is a validation failure
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            EngineError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_relationship_names_the_full_triple() {
        let err = EngineError::InvalidRelationship {
            source_schema: "contact".to_string(),
            target_schema: "document".to_string(),
            relationship: "addresses".to_string(),
        };

        assert_eq!(
            err.to_string(),
            "relationship 'addresses' is not declared from 'contact' to 'document'"
        );
        // a configuration error carries no underlying cause and no
        // validation document
        assert!(std::error::Error::source(&err).is_none());
        assert!(err.validation_errors().is_none());
    }
}
