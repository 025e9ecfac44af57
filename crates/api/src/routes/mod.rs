//! HTTP routes.

pub mod carts;
pub mod checkout;
pub mod health;
pub mod inventory;
pub mod metrics;
pub mod orders;
pub mod products;

use std::sync::Arc;

use projections::{OrderDetailsView, StockLevelsView};

/// Shared application state accessible from all handlers.
pub struct AppState<S, B> {
    /// Broker commands are enqueued on.
    pub broker: Arc<B>,

    /// Order details read model.
    pub orders: Arc<OrderDetailsView<S>>,

    /// Stock levels read model.
    pub stock: Arc<StockLevelsView<S>>,
}

/// Body returned for every accepted command.
///
/// The API never waits for the saga's outcome; callers poll the order read
/// model with the returned IDs.
#[derive(Debug, serde::Serialize)]
pub struct AcceptedResponse {
    /// Identity of the enqueued command.
    pub command_id: String,

    /// The order the command belongs to, when one is known up front.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
}
