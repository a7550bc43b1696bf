//! Error types for the persistence layer.

use citylab_types::RunId;

/// Errors that can occur while persisting a run.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A write referenced a run the store has never seen.
    #[error("Run not found: {0}")]
    RunNotFound(RunId),

    /// The store was closed and accepts no further writes.
    #[error("store is closed")]
    Closed,

    /// The backend refused the write.
    #[error("write rejected: {0}")]
    Rejected(String),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}
