//! Per-order detail view.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{GuestToken, OrderId};
use domain::order::{CustomerInfo, OrderEvent, OrderLineItem, OrderTotals, ShippingAddress};
use messaging::EventEnvelope;
use serde::Serialize;
use storage::{LedgerEntry, StateStore};
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::Projection;

/// One row of the order details read model.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetails {
    /// The order identity.
    pub order_id: OrderId,

    /// Human-facing order number.
    pub order_number: String,

    /// Current order status as projected from events.
    pub status: String,

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

    /// When the checkout finished, once it has.
    pub completed_at: Option<DateTime<Utc>>,
}

/// Read model over `order.OrderCreated` and `order.CheckoutCompleted`.
///
/// This is the view the HTTP boundary answers order-status polls from.
pub struct OrderDetailsView<S> {
    ledger: Arc<S>,
    orders: RwLock<HashMap<OrderId, OrderDetails>>,
}

impl<S: StateStore> OrderDetailsView<S> {
    /// Creates an empty view over the given ledger store.
    pub fn new(ledger: Arc<S>) -> Self {
        Self {
            ledger,
            orders: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the details of one order, if projected.
    pub async fn get(&self, order_id: OrderId) -> Option<OrderDetails> {
        self.orders.read().await.get(&order_id).cloned()
    }

    /// Returns the number of projected orders.
    pub async fn len(&self) -> usize {
        self.orders.read().await.len()
    }

    /// Returns true if no orders are projected.
    pub async fn is_empty(&self) -> bool {
        self.orders.read().await.is_empty()
    }

    async fn apply(&self, event: OrderEvent) {
        match event {
            OrderEvent::OrderCreated(data) => {
                let details = OrderDetails {
                    order_id: data.order_id,
                    order_number: data.order_number.as_str().to_string(),
                    status: "Placed".to_string(),
                    guest_token: data.guest_token,
                    customer: data.customer,
                    address: data.address,
                    line_items: data.line_items,
                    totals: data.totals,
                    created_at: data.created_at,
                    completed_at: None,
                };
                self.orders.write().await.insert(data.order_id, details);
            }
            OrderEvent::CheckoutCompleted(data) => {
                if let Some(details) = self.orders.write().await.get_mut(&data.order_id) {
                    details.status = "Completed".to_string();
                    details.completed_at = Some(data.completed_at);
                }
            }
        }
    }
}

#[async_trait]
impl<S: StateStore> Projection for OrderDetailsView<S> {
    fn name(&self) -> &'static str {
        "order-details-view"
    }

    fn subscriptions(&self) -> &'static [&'static str] {
        &["order.OrderCreated", "order.CheckoutCompleted"]
    }

    async fn handle(&self, envelope: &EventEnvelope) -> Result<()> {
        if self
            .ledger
            .is_processed(envelope.event_id.as_uuid(), self.name())
            .await?
        {
            return Ok(());
        }

        let event: OrderEvent = envelope.payload_as()?;
        self.apply(event).await;

        self.ledger
            .record_processed(LedgerEntry::new(
                envelope.event_id.as_uuid(),
                self.name(),
                envelope.event_type.clone(),
            ))
            .await?;
        Ok(())
    }
}
