//! Pipeline-level error type.
//!
//! Only the fatal class reaches callers: authorization failures, the
//! `abort` missing-reference strategy, and loss of the backing store.
//! Everything else is recovered inside the pipeline and reported through
//! [`crate::report::ImportResult`].

use ledgerly_core::error::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// A domain-level error from `ledgerly-core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Convenience type alias for orchestrator return values.
pub type PipelineResult<T> = Result<T, ImportError>;
