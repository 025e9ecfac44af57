use thiserror::Error;

use crate::version::Version;

/// Errors that can occur when interacting with the state store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A conflicting concurrent writer changed the aggregate between the
    /// read and the conditioned write. Callers should reload and retry the
    /// whole command.
    #[error(
        "Concurrency conflict for {aggregate_type} '{key}': expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        aggregate_type: String,
        key: String,
        expected: Version,
        actual: Version,
    },

    /// The ledger already holds an entry for this message and consumer.
    #[error("Message {message_id} already processed by '{consumer}'")]
    AlreadyProcessed {
        message_id: uuid::Uuid,
        consumer: String,
    },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
