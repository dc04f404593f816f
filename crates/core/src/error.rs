use crate::types::EntityId;

/// Domain-level error taxonomy for the import pipeline.
///
/// Row-level conditions never surface through this type; they are recovered
/// locally and reported in the import result. `CoreError` covers the fatal
/// class: authorization failures, absent mandatory prerequisites, and the
/// `abort` missing-reference strategy.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: EntityId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Missing reference: {0}")]
    MissingReference(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
