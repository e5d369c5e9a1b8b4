use std::collections::BTreeMap;

use thiserror::Error;

/// Field name to message map produced by a failed validation run.
pub type FieldErrors = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum FluentError {
    /// Comparison operator outside of the allow-list
    #[error("Invalid operator: {0}")]
    InvalidOperator(String),

    /// Out-of-range date part, malformed batch input, empty required argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Relation name not registered on the entity it was looked up on
    #[error("Relation `{relation}` is not registered on `{entity}`")]
    RelationNotFound { entity: String, relation: String },

    /// Entity name not registered in the schema
    #[error("Entity `{0}` is not registered")]
    EntityNotFound(String),

    /// Record failed validation before any write happened
    #[error("Validation failed: {}", render_field_errors(.0))]
    ValidationFailed(FieldErrors),

    /// Driver-level insert/update/delete/transaction failure
    #[error("Execution error: {0}")]
    ExecutionFailed(String),

    /// No rows returned when at least one was expected
    #[error("No rows found")]
    NotFound,

    /// Error mapping a row into a caller type
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// Unreadable or invalid configuration file
    #[error("Config error: {0}")]
    Config(String),

    /// Rusqlite specific errors
    #[cfg(feature = "rusqlite")]
    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
}

impl FluentError {
    /// HTTP-style status code used by mutation results.
    pub fn code(&self) -> u16 {
        match self {
            FluentError::ValidationFailed(_)
            | FluentError::InvalidArgument(_)
            | FluentError::InvalidOperator(_)
            | FluentError::NotFound => 422,
            _ => 500,
        }
    }

    pub fn relation_not_found(entity: impl Into<String>, relation: impl Into<String>) -> Self {
        FluentError::RelationNotFound {
            entity: entity.into(),
            relation: relation.into(),
        }
    }
}

impl From<serde_json::Error> for FluentError {
    fn from(value: serde_json::Error) -> Self {
        FluentError::Mapping(value.to_string())
    }
}

fn render_field_errors(errors: &FieldErrors) -> String {
    errors
        .iter()
        .map(|(field, message)| format!("{field}: {message}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for data-access operations
pub type Result<T> = std::result::Result<T, FluentError>;
