//! Unified error types for the crate.

use thiserror::Error;

/// Top-level error for knowledge-base store operations.
#[derive(Debug, Error)]
pub enum KbError {
    /// Invalid or unsupported configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Mismatch between the query vector and the indexed column width.
    #[error("vector size mismatch: got {got}, want {want}")]
    VectorSizeMismatch { got: usize, want: usize },

    /// Postgres errors (connection, query, decode).
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}
