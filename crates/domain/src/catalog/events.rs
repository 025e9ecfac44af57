//! Product catalog domain events.

use common::{Money, OrderId, ProductId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

/// Events that can occur on a product aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ProductEvent {
    /// Product was created.
    ProductCreated(ProductCreatedData),

    /// Name or description changed.
    ProductDetailsUpdated(ProductDetailsUpdatedData),

    /// Unit price changed.
    ProductPriceChanged(ProductPriceChangedData),

    /// Product became purchasable.
    ProductActivated,

    /// Product was withdrawn from sale.
    ProductDeactivated,

    /// Product was deleted.
    ProductDeleted,
}

impl DomainEvent for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::ProductCreated(_) => "ProductCreated",
            ProductEvent::ProductDetailsUpdated(_) => "ProductDetailsUpdated",
            ProductEvent::ProductPriceChanged(_) => "ProductPriceChanged",
            ProductEvent::ProductActivated => "ProductActivated",
            ProductEvent::ProductDeactivated => "ProductDeactivated",
            ProductEvent::ProductDeleted => "ProductDeleted",
        }
    }
}

/// Data for ProductCreated event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCreatedData {
    /// The product's SKU.
    pub product_id: ProductId,

    /// Display name.
    pub name: String,

    /// Description text.
    pub description: String,

    /// Initial unit price.
    pub unit_price: Money,
}

/// Data for ProductDetailsUpdated event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDetailsUpdatedData {
    /// New display name.
    pub name: String,

    /// New description text.
    pub description: String,
}

/// Data for ProductPriceChanged event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductPriceChangedData {
    /// Price before the change.
    pub old_price: Money,

    /// Price after the change.
    pub new_price: Money,
}

/// Point-in-time view of one product, resolved for a checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSnapshot {
    /// The product's SKU.
    pub product_id: ProductId,

    /// Display name at snapshot time.
    pub name: String,

    /// Unit price at snapshot time.
    pub unit_price: Money,

    /// Whether the product was purchasable at snapshot time.
    pub active: bool,
}

/// Report event answering a product snapshot request.
///
/// Carries a snapshot for every requested product that exists; unknown SKUs
/// are simply absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSnapshotsProvided {
    /// The checkout transaction the snapshots were requested for.
    pub order_id: OrderId,

    /// Resolved snapshots.
    pub products: Vec<ProductSnapshot>,
}

impl DomainEvent for ProductSnapshotsProvided {
    fn event_type(&self) -> &'static str {
        "ProductSnapshotsProvided"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_types() {
        assert_eq!(ProductEvent::ProductActivated.event_type(), "ProductActivated");

        let event = ProductEvent::ProductPriceChanged(ProductPriceChangedData {
            old_price: Money::from_cents(100),
            new_price: Money::from_cents(200),
        });
        assert_eq!(event.event_type(), "ProductPriceChanged");
    }

    #[test]
    fn snapshot_serialization_roundtrip() {
        let event = ProductSnapshotsProvided {
            order_id: OrderId::new(),
            products: vec![ProductSnapshot {
                product_id: ProductId::new("SKU-1"),
                name: "Widget".to_string(),
                unit_price: Money::from_cents(999),
                active: true,
            }],
        };

        let json = serde_json::to_string(&event).unwrap();
        let deserialized: ProductSnapshotsProvided = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.products.len(), 1);
        assert_eq!(deserialized.products[0].unit_price.cents(), 999);
    }
}
