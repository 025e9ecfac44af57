//! Inventory bounded context.

mod aggregate;
mod commands;
mod events;
mod handler;

pub use aggregate::{AdjustmentReason, InventoryItem};
pub use commands::InventoryCommand;
pub use events::{
    InventoryEvent, StockBatchValidated, StockDeductedData, StockDeductedForOrder,
    StockDeductionRejected, StockReleasedData, StockSetData,
};
pub use handler::InventoryCommandHandler;

use thiserror::Error;

/// Aggregate type tag for inventory items.
pub const AGGREGATE_TYPE: &str = "inventory";

/// Errors that can occur during inventory operations.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// Not enough stock to satisfy the requested deduction.
    #[error("Insufficient stock for {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: String,
        requested: u32,
        available: u32,
    },

    /// No inventory record exists for the product.
    #[error("Inventory item not found: {product_id}")]
    NotFound { product_id: String },
}
