//! Shopping cart bounded context.

mod aggregate;
mod commands;
mod events;
mod handler;

pub use aggregate::ShoppingCart;
pub use commands::CartCommand;
pub use events::{
    CartClearedData, CartCreatedData, CartEvent, CartItemAddedData, CartItemQuantityUpdatedData,
    CartItemRemovedData, CartSnapshotProvided,
};
pub use handler::CartCommandHandler;

use thiserror::Error;

/// Aggregate type tag for carts.
pub const AGGREGATE_TYPE: &str = "cart";

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Cart is already created.
    #[error("Cart already created")]
    AlreadyCreated,

    /// Item not found in cart.
    #[error("Item not found in cart: {product_id}")]
    ItemNotFound { product_id: String },

    /// Invalid quantity.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },
}
