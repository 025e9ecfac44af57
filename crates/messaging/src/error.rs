use thiserror::Error;

/// Errors that can occur in the messaging layer.
#[derive(Debug, Error)]
pub enum MessagingError {
    /// The named command queue already has an active consumer.
    #[error("Queue '{0}' already has a consumer")]
    QueueAlreadyConsumed(String),

    /// The broker rejected or could not deliver a message.
    #[error("Publish failed: {0}")]
    PublishFailed(String),

    /// A message body could not be serialized or deserialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for messaging operations.
pub type Result<T> = std::result::Result<T, MessagingError>;
