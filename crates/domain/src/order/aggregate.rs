//! Order aggregate.

use chrono::Utc;
use common::{GuestToken, OrderId};
use serde::{Deserialize, Serialize};
use storage::Version;

use crate::aggregate::Aggregate;

use super::OrderError;
use super::events::{CheckoutCompletedData, OrderCreatedData, OrderEvent};
use super::value_objects::{CustomerInfo, OrderLineItem, OrderNumber, OrderTotals, ShippingAddress};

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Created; its checkout transaction is still running.
    #[default]
    Placed,

    /// The checkout transaction finished (terminal state).
    Completed,
}

impl OrderStatus {
    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Placed => "Placed",
            OrderStatus::Completed => "Completed",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Order aggregate root, keyed by order ID.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Order {
    /// Order identity, None before creation.
    id: Option<OrderId>,

    /// Human-facing order number.
    order_number: Option<OrderNumber>,

    /// Guest session the order was placed from.
    guest_token: Option<GuestToken>,

    /// Customer contact details.
    customer: Option<CustomerInfo>,

    /// Shipping destination.
    address: Option<ShippingAddress>,

    /// Order lines.
    line_items: Vec<OrderLineItem>,

    /// Money totals.
    totals: OrderTotals,

    /// Checkout idempotency key the order was created under.
    idempotency_key: Option<String>,

    /// Lifecycle status.
    status: OrderStatus,

    /// Current version for optimistic concurrency.
    #[serde(default)]
    version: Version,

    /// Events produced by the last batch of behavior calls.
    #[serde(skip)]
    uncommitted: Vec<OrderEvent>,
}

impl Aggregate for Order {
    type Event = OrderEvent;
    type Error = OrderError;

    fn aggregate_type() -> &'static str {
        super::AGGREGATE_TYPE
    }

    fn key(&self) -> Option<String> {
        self.id.map(|id| id.to_string())
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
impl Order {
    /// Returns the lifecycle status.
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Returns the order lines.
    pub fn line_items(&self) -> &[OrderLineItem] {
        &self.line_items
    }

    /// Returns the money totals.
    pub fn totals(&self) -> OrderTotals {
        self.totals
    }

    /// Returns the idempotency key the order was created under.
    pub fn idempotency_key(&self) -> Option<&str> {
        self.idempotency_key.as_deref()
    }
}

// Behaviors
impl Order {
    /// Creates the order from the data the checkout gathered.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        &mut self,
        order_id: OrderId,
        order_number: OrderNumber,
        guest_token: GuestToken,
        customer: CustomerInfo,
        address: ShippingAddress,
        line_items: Vec<OrderLineItem>,
        totals: OrderTotals,
        idempotency_key: String,
    ) -> Result<(), OrderError> {
        if self.id.is_some() {
            return Err(OrderError::AlreadyCreated {
                order_id: order_id.to_string(),
            });
        }
        if line_items.is_empty() {
            return Err(OrderError::NoLineItems);
        }

        self.id = Some(order_id);
        self.order_number = Some(order_number.clone());
        self.guest_token = Some(guest_token.clone());
        self.customer = Some(customer.clone());
        self.address = Some(address.clone());
        self.line_items = line_items.clone();
        self.totals = totals;
        self.idempotency_key = Some(idempotency_key);
        self.status = OrderStatus::Placed;

        self.record(OrderEvent::OrderCreated(OrderCreatedData {
            order_id,
            order_number,
            guest_token,
            customer,
            address,
            line_items,
            totals,
            created_at: Utc::now(),
        }));
        Ok(())
    }

    /// Marks the checkout transaction finished. Idempotent.
    pub fn mark_checkout_completed(&mut self) -> Result<(), OrderError> {
        let Some(order_id) = self.id else {
            return Err(OrderError::NotFound {
                order_id: String::new(),
            });
        };

        if self.status == OrderStatus::Completed {
            return Ok(());
        }

        self.status = OrderStatus::Completed;
        self.record(OrderEvent::CheckoutCompleted(CheckoutCompletedData {
            order_id,
            completed_at: Utc::now(),
        }));
        Ok(())
    }
}
