//! Order domain events.

use chrono::{DateTime, Utc};
use common::{GuestToken, OrderId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

use super::value_objects::{CustomerInfo, OrderLineItem, OrderNumber, OrderTotals, ShippingAddress};

/// Events that can occur on an order aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// Order was created at the end of the stock deduction step.
    OrderCreated(OrderCreatedData),

    /// The checkout transaction that produced the order finished.
    CheckoutCompleted(CheckoutCompletedData),
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderCreated(_) => "OrderCreated",
            OrderEvent::CheckoutCompleted(_) => "CheckoutCompleted",
        }
    }
}

/// Data for OrderCreated event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreatedData {
    /// The order identity.
    pub order_id: OrderId,

    /// Human-facing order number.
    pub order_number: OrderNumber,

    /// Guest session the order was placed from.
    pub guest_token: GuestToken,

    /// Customer contact details.
    pub customer: CustomerInfo,

    /// Shipping destination.
    pub address: ShippingAddress,

    /// Order lines.
    pub line_items: Vec<OrderLineItem>,

    /// Money totals.
    pub totals: OrderTotals,

    /// When the order was created.
    pub created_at: DateTime<Utc>,
}

/// Data for CheckoutCompleted event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutCompletedData {
    /// The order whose checkout finished.
    pub order_id: OrderId,

    /// When the checkout finished.
    pub completed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Money;

    #[test]
    fn event_serialization_roundtrip() {
        let event = OrderEvent::OrderCreated(OrderCreatedData {
            order_id: OrderId::new(),
            order_number: OrderNumber::generate(),
            guest_token: GuestToken::new("g-1"),
            customer: CustomerInfo {
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                email: "ada@example.com".to_string(),
                phone: "555-0100".to_string(),
            },
            address: ShippingAddress {
                address_line1: "1 Main St".to_string(),
                address_line2: None,
                city: "Springfield".to_string(),
                state: "IL".to_string(),
                zip_code: "62701".to_string(),
                country: "US".to_string(),
            },
            line_items: vec![OrderLineItem::new(
                "SKU-1",
                "Widget",
                Money::from_cents(1000),
                2,
            )],
            totals: OrderTotals::of(Money::from_cents(2000), Money::zero()),
            created_at: Utc::now(),
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("OrderCreated"));

        let deserialized: OrderEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.event_type(), "OrderCreated");
        let OrderEvent::OrderCreated(data) = deserialized else {
            panic!("expected OrderCreated");
        };
        assert_eq!(data.totals.total.cents(), 2000);
    }
}
