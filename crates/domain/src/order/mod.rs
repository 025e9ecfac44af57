//! Order bounded context.

mod aggregate;
mod commands;
mod events;
mod handler;
mod value_objects;

pub use aggregate::{Order, OrderStatus};
pub use commands::OrderCommand;
pub use events::{CheckoutCompletedData, OrderCreatedData, OrderEvent};
pub use handler::OrderCommandHandler;
pub use value_objects::{CustomerInfo, OrderLineItem, OrderNumber, OrderTotals, ShippingAddress};

use thiserror::Error;

/// Aggregate type tag for orders.
pub const AGGREGATE_TYPE: &str = "order";

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Order is already created.
    #[error("Order already created: {order_id}")]
    AlreadyCreated { order_id: String },

    /// Order not found.
    #[error("Order not found: {order_id}")]
    NotFound { order_id: String },

    /// Order has no line items.
    #[error("Order has no line items")]
    NoLineItems,
}
