//! Order commands: the closed set of messages accepted on `order.commands`.

use common::{GuestToken, OrderId};
use messaging::CommandPayload;
use serde::{Deserialize, Serialize};

use super::value_objects::{CustomerInfo, OrderLineItem, OrderTotals, ShippingAddress};

/// Commands accepted by the order context.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderCommand {
    /// Create the order from the data the checkout gathered.
    CreateOrder {
        /// The order identity, derived from the checkout idempotency key.
        order_id: OrderId,
        /// Guest session the order was placed from.
        guest_token: GuestToken,
        /// Customer contact details.
        customer: CustomerInfo,
        /// Shipping destination.
        address: ShippingAddress,
        /// Order lines.
        line_items: Vec<OrderLineItem>,
        /// Money totals.
        totals: OrderTotals,
        /// Checkout idempotency key.
        idempotency_key: String,
    },

    /// Mark the order's checkout transaction finished.
    MarkCheckoutCompleted {
        /// Target order.
        order_id: OrderId,
    },
}

impl CommandPayload for OrderCommand {
    fn command_type(&self) -> &'static str {
        match self {
            OrderCommand::CreateOrder { .. } => "CreateOrder",
            OrderCommand::MarkCheckoutCompleted { .. } => "MarkCheckoutCompleted",
        }
    }
}
