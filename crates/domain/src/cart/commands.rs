//! Cart commands: the closed set of messages accepted on `cart.commands`.

use std::collections::BTreeMap;

use common::{GuestToken, OrderId, ProductId};
use messaging::CommandPayload;
use serde::{Deserialize, Serialize};

/// Commands accepted by the cart context.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CartCommand {
    /// Add quantity of a product to a guest's cart, creating the cart on
    /// first use.
    AddCartItem {
        /// Target guest session.
        guest_token: GuestToken,
        /// Product to add.
        product_id: ProductId,
        /// Quantity to add.
        quantity: u32,
    },

    /// Set the quantity of an existing cart line.
    UpdateCartItemQuantity {
        /// Target guest session.
        guest_token: GuestToken,
        /// Product whose line to change.
        product_id: ProductId,
        /// New quantity; zero removes the line.
        quantity: u32,
    },

    /// Remove a cart line.
    RemoveCartItem {
        /// Target guest session.
        guest_token: GuestToken,
        /// Product to remove.
        product_id: ProductId,
    },

    /// Provide a snapshot of the cart's lines for a checkout transaction.
    GetCartSnapshot {
        /// The checkout transaction requesting the snapshot.
        order_id: OrderId,
        /// Target guest session.
        guest_token: GuestToken,
    },

    /// Empty the cart after its order was created.
    ClearCart {
        /// The checkout transaction that consumed the cart.
        order_id: OrderId,
        /// Target guest session.
        guest_token: GuestToken,
    },
}

impl CommandPayload for CartCommand {
    fn command_type(&self) -> &'static str {
        match self {
            CartCommand::AddCartItem { .. } => "AddCartItem",
            CartCommand::UpdateCartItemQuantity { .. } => "UpdateCartItemQuantity",
            CartCommand::RemoveCartItem { .. } => "RemoveCartItem",
            CartCommand::GetCartSnapshot { .. } => "GetCartSnapshot",
            CartCommand::ClearCart { .. } => "ClearCart",
        }
    }
}

/// Snapshot of cart lines used in command payloads.
pub type CartLines = BTreeMap<ProductId, u32>;
