//! Domain error types.

use messaging::MessagingError;
use storage::StorageError;
use thiserror::Error;

use crate::cart::CartError;
use crate::catalog::ProductError;
use crate::inventory::InventoryError;
use crate::order::OrderError;

/// Errors that can occur during command handling.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A storage error occurred. Concurrency conflicts are retried by the
    /// command processor before surfacing here.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// A broker error occurred while publishing a report event.
    #[error("Messaging error: {0}")]
    Messaging(#[from] MessagingError),

    /// A cart invariant was violated.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// A product catalog invariant was violated.
    #[error("Product error: {0}")]
    Product(#[from] ProductError),

    /// An inventory invariant was violated.
    #[error("Inventory error: {0}")]
    Inventory(#[from] InventoryError),

    /// An order invariant was violated.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    /// Returns true if the error is a business-rule rejection rather than an
    /// infrastructure failure. Business rejections must not be retried.
    pub fn is_business_rejection(&self) -> bool {
        matches!(
            self,
            DomainError::Cart(_)
                | DomainError::Product(_)
                | DomainError::Inventory(_)
                | DomainError::Order(_)
        )
    }
}
