//! Shopping cart aggregate.

use std::collections::BTreeMap;

use common::{CartId, GuestToken, OrderId, ProductId};
use serde::{Deserialize, Serialize};
use storage::Version;

use crate::aggregate::Aggregate;

use super::CartError;
use super::events::{
    CartClearedData, CartCreatedData, CartEvent, CartItemAddedData, CartItemQuantityUpdatedData,
    CartItemRemovedData,
};

/// Shopping cart aggregate root, keyed by guest token.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ShoppingCart {
    /// Cart identity, None before creation.
    id: Option<CartId>,

    /// Guest session the cart belongs to.
    guest_token: Option<GuestToken>,

    /// Requested quantity per product.
    items: BTreeMap<ProductId, u32>,

    /// Current version for optimistic concurrency.
    #[serde(default)]
    version: Version,

    /// Events produced by the last batch of behavior calls.
    #[serde(skip)]
    uncommitted: Vec<CartEvent>,
}

impl Aggregate for ShoppingCart {
    type Event = CartEvent;
    type Error = CartError;

    fn aggregate_type() -> &'static str {
        super::AGGREGATE_TYPE
    }

    fn key(&self) -> Option<String> {
        self.guest_token.as_ref().map(|t| t.as_str().to_string())
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn record(&mut self, event: Self::Event) {
        self.uncommitted.push(event);
    }

    fn uncommitted(&self) -> &[Self::Event] {
        &self.uncommitted
    }

    fn take_uncommitted(&mut self) -> Vec<Self::Event> {
        std::mem::take(&mut self.uncommitted)
    }
}

// Query methods
impl ShoppingCart {
    /// Returns the cart items as (product, quantity) pairs.
    pub fn items(&self) -> &BTreeMap<ProductId, u32> {
        &self.items
    }

    /// Returns true if the cart has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the guest token, if the cart has been created.
    pub fn guest_token(&self) -> Option<&GuestToken> {
        self.guest_token.as_ref()
    }
}

// Behaviors
impl ShoppingCart {
    /// Creates the cart for a guest session.
    pub fn create(&mut self, guest_token: GuestToken) -> Result<(), CartError> {
        if self.id.is_some() {
            return Err(CartError::AlreadyCreated);
        }

        let cart_id = CartId::new();
        self.id = Some(cart_id);
        self.guest_token = Some(guest_token.clone());
        self.record(CartEvent::CartCreated(CartCreatedData {
            cart_id,
            guest_token,
        }));
        Ok(())
    }

    /// Adds quantity of a product, merging with any existing line.
    pub fn add_item(&mut self, product_id: ProductId, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity { quantity });
        }

        let new_quantity = self.items.get(&product_id).copied().unwrap_or(0) + quantity;
        self.items.insert(product_id.clone(), new_quantity);
        self.record(CartEvent::CartItemAdded(CartItemAddedData {
            product_id,
            quantity,
            new_quantity,
        }));
        Ok(())
    }

    /// Sets the quantity of an existing line; zero removes it.
    pub fn update_item_quantity(
        &mut self,
        product_id: ProductId,
        new_quantity: u32,
    ) -> Result<(), CartError> {
        let Some(&old_quantity) = self.items.get(&product_id) else {
            return Err(CartError::ItemNotFound {
                product_id: product_id.to_string(),
            });
        };

        if new_quantity == 0 {
            return self.remove_item(product_id);
        }

        if new_quantity != old_quantity {
            self.items.insert(product_id.clone(), new_quantity);
            self.record(CartEvent::CartItemQuantityUpdated(
                CartItemQuantityUpdatedData {
                    product_id,
                    old_quantity,
                    new_quantity,
                },
            ));
        }
        Ok(())
    }

    /// Removes a line from the cart.
    pub fn remove_item(&mut self, product_id: ProductId) -> Result<(), CartError> {
        if self.items.remove(&product_id).is_none() {
            return Err(CartError::ItemNotFound {
                product_id: product_id.to_string(),
            });
        }

        self.record(CartEvent::CartItemRemoved(CartItemRemovedData {
            product_id,
        }));
        Ok(())
    }

    /// Empties the cart after a completed checkout.
    pub fn clear(&mut self, order_id: OrderId, guest_token: GuestToken) -> Result<(), CartError> {
        self.items.clear();
        self.record(CartEvent::CartCleared(CartClearedData {
            order_id,
            guest_token,
        }));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::DomainEvent;

    fn created_cart() -> ShoppingCart {
        let mut cart = ShoppingCart::default();
        cart.create(GuestToken::new("guest-1")).unwrap();
        cart.take_uncommitted();
        cart
    }

    #[test]
    fn create_sets_identity() {
        let mut cart = ShoppingCart::default();
        cart.create(GuestToken::new("guest-1")).unwrap();

        assert_eq!(cart.key(), Some("guest-1".to_string()));
        assert_eq!(cart.uncommitted().len(), 1);
        assert_eq!(cart.uncommitted()[0].event_type(), "CartCreated");
    }

    #[test]
    fn create_twice_fails() {
        let mut cart = created_cart();
        let result = cart.create(GuestToken::new("guest-2"));
        assert!(matches!(result, Err(CartError::AlreadyCreated)));
    }

    #[test]
    fn add_item_merges_quantity() {
        let mut cart = created_cart();
        cart.add_item(ProductId::new("SKU-1"), 2).unwrap();
        cart.add_item(ProductId::new("SKU-1"), 3).unwrap();

        assert_eq!(cart.items().get(&ProductId::new("SKU-1")), Some(&5));
        assert_eq!(cart.uncommitted().len(), 2);
    }

    #[test]
    fn add_zero_quantity_fails() {
        let mut cart = created_cart();
        let result = cart.add_item(ProductId::new("SKU-1"), 0);
        assert!(matches!(result, Err(CartError::InvalidQuantity { .. })));
    }

    #[test]
    fn update_quantity() {
        let mut cart = created_cart();
        cart.add_item(ProductId::new("SKU-1"), 2).unwrap();
        cart.take_uncommitted();

        cart.update_item_quantity(ProductId::new("SKU-1"), 5).unwrap();
        assert_eq!(cart.items().get(&ProductId::new("SKU-1")), Some(&5));
        assert_eq!(cart.uncommitted()[0].event_type(), "CartItemQuantityUpdated");
    }

    #[test]
    fn update_to_zero_removes_item() {
        let mut cart = created_cart();
        cart.add_item(ProductId::new("SKU-1"), 2).unwrap();
        cart.take_uncommitted();

        cart.update_item_quantity(ProductId::new("SKU-1"), 0).unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.uncommitted()[0].event_type(), "CartItemRemoved");
    }

    #[test]
    fn update_missing_item_fails() {
        let mut cart = created_cart();
        let result = cart.update_item_quantity(ProductId::new("SKU-9"), 1);
        assert!(matches!(result, Err(CartError::ItemNotFound { .. })));
    }

    #[test]
    fn unchanged_quantity_produces_no_event() {
        let mut cart = created_cart();
        cart.add_item(ProductId::new("SKU-1"), 2).unwrap();
        cart.take_uncommitted();

        cart.update_item_quantity(ProductId::new("SKU-1"), 2).unwrap();
        assert!(cart.uncommitted().is_empty());
    }

    #[test]
    fn clear_empties_and_records_order() {
        let mut cart = created_cart();
        cart.add_item(ProductId::new("SKU-1"), 2).unwrap();
        cart.take_uncommitted();

        let order_id = OrderId::new();
        cart.clear(order_id, GuestToken::new("guest-1")).unwrap();

        assert!(cart.is_empty());
        let events = cart.take_uncommitted();
        assert_eq!(events.len(), 1);
        let CartEvent::CartCleared(data) = &events[0] else {
            panic!("expected CartCleared");
        };
        assert_eq!(data.order_id, order_id);
    }

    #[test]
    fn state_survives_serialization_without_buffer() {
        let mut cart = created_cart();
        cart.add_item(ProductId::new("SKU-1"), 2).unwrap();

        let json = serde_json::to_string(&cart).unwrap();
        let restored: ShoppingCart = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.items().get(&ProductId::new("SKU-1")), Some(&2));
        assert!(restored.uncommitted().is_empty());
    }
}
