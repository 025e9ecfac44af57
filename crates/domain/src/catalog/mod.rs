//! Product catalog bounded context.

mod aggregate;
mod commands;
mod events;
mod handler;

pub use aggregate::{Product, ProductStatus};
pub use commands::CatalogCommand;
pub use events::{
    ProductCreatedData, ProductDetailsUpdatedData, ProductEvent, ProductPriceChangedData,
    ProductSnapshot, ProductSnapshotsProvided,
};
pub use handler::CatalogCommandHandler;

use thiserror::Error;

/// Aggregate type tag for catalog products.
pub const AGGREGATE_TYPE: &str = "catalog";

/// Errors that can occur during product operations.
#[derive(Debug, Error)]
pub enum ProductError {
    /// Product with this SKU already exists.
    #[error("Product already exists: {product_id}")]
    AlreadyExists { product_id: String },

    /// Product not found.
    #[error("Product not found: {product_id}")]
    NotFound { product_id: String },

    /// Price must be positive.
    #[error("Invalid price: {price} cents (must be greater than 0)")]
    InvalidPrice { price: i64 },

    /// Product was deleted and accepts no further operations.
    #[error("Product already deleted: {product_id}")]
    AlreadyDeleted { product_id: String },
}
