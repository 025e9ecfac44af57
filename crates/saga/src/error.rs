//! Saga error types.

use messaging::MessagingError;
use storage::StorageError;
use thiserror::Error;

/// Errors that can occur during saga processing.
#[derive(Debug, Error)]
pub enum SagaError {
    /// The saga store failed.
    #[error("Saga store error: {0}")]
    Store(#[from] sqlx::Error),

    /// The ledger or state store failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// A command could not be sent or an event payload was malformed.
    #[error("Messaging error: {0}")]
    Messaging(#[from] MessagingError),

    /// An event payload could not be deserialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for saga operations.
pub type Result<T> = std::result::Result<T, SagaError>;
