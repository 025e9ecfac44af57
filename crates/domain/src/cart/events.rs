//! Cart domain events.

use std::collections::BTreeMap;

use common::{CartId, GuestToken, OrderId, ProductId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

/// Events that can occur on a shopping cart aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CartEvent {
    /// Cart was created for a guest session.
    CartCreated(CartCreatedData),

    /// Item was added to the cart.
    CartItemAdded(CartItemAddedData),

    /// Item quantity was changed.
    CartItemQuantityUpdated(CartItemQuantityUpdatedData),

    /// Item was removed from the cart.
    CartItemRemoved(CartItemRemovedData),

    /// Cart was emptied after checkout.
    CartCleared(CartClearedData),
}

impl DomainEvent for CartEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CartEvent::CartCreated(_) => "CartCreated",
            CartEvent::CartItemAdded(_) => "CartItemAdded",
            CartEvent::CartItemQuantityUpdated(_) => "CartItemQuantityUpdated",
            CartEvent::CartItemRemoved(_) => "CartItemRemoved",
            CartEvent::CartCleared(_) => "CartCleared",
        }
    }
}

/// Data for CartCreated event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartCreatedData {
    /// The cart identity.
    pub cart_id: CartId,

    /// The guest session the cart belongs to.
    pub guest_token: GuestToken,
}

/// Data for CartItemAdded event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItemAddedData {
    /// The product added.
    pub product_id: ProductId,

    /// Quantity added by this call.
    pub quantity: u32,

    /// Quantity in the cart after the add.
    pub new_quantity: u32,
}

/// Data for CartItemQuantityUpdated event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItemQuantityUpdatedData {
    /// The product whose quantity changed.
    pub product_id: ProductId,

    /// Previous quantity.
    pub old_quantity: u32,

    /// New quantity.
    pub new_quantity: u32,
}

/// Data for CartItemRemoved event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItemRemovedData {
    /// The product removed.
    pub product_id: ProductId,
}

/// Data for CartCleared event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartClearedData {
    /// The checkout transaction the clear belongs to.
    pub order_id: OrderId,

    /// The guest session whose cart was cleared.
    pub guest_token: GuestToken,
}

/// Report event answering a cart snapshot request.
///
/// Always published, even when no cart exists for the guest token — the
/// emptiness decision belongs to the checkout saga.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartSnapshotProvided {
    /// The checkout transaction the snapshot was requested for.
    pub order_id: OrderId,

    /// The guest session the snapshot describes.
    pub guest_token: GuestToken,

    /// Requested quantity per product.
    pub items: BTreeMap<ProductId, u32>,
}

impl DomainEvent for CartSnapshotProvided {
    fn event_type(&self) -> &'static str {
        "CartSnapshotProvided"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_types() {
        let event = CartEvent::CartItemAdded(CartItemAddedData {
            product_id: ProductId::new("SKU-1"),
            quantity: 1,
            new_quantity: 1,
        });
        assert_eq!(event.event_type(), "CartItemAdded");

        let snapshot = CartSnapshotProvided {
            order_id: OrderId::new(),
            guest_token: GuestToken::new("g-1"),
            items: BTreeMap::new(),
        };
        assert_eq!(snapshot.event_type(), "CartSnapshotProvided");
    }

    #[test]
    fn serialization_roundtrip() {
        let event = CartEvent::CartCleared(CartClearedData {
            order_id: OrderId::new(),
            guest_token: GuestToken::new("g-1"),
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("CartCleared"));

        let deserialized: CartEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.event_type(), "CartCleared");
    }
}
