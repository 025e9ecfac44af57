//! Checkout bounded context.
//!
//! Checkout owns no aggregate: accepting a checkout is the announcement of a
//! business transaction, not a state change. The handler derives the order
//! identity from the idempotency key and publishes `CheckoutRequested`; the
//! saga takes it from there.

use std::sync::Arc;

use common::{GuestToken, OrderId};
use messaging::{CommandEnvelope, CommandPayload, EventEnvelope, MessageBroker};
use serde::{Deserialize, Serialize};
use storage::{LedgerEntry, StateStore};

use crate::aggregate::DomainEvent;
use crate::error::DomainError;
use crate::order::{CustomerInfo, ShippingAddress};

/// Commands accepted by the checkout context.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CheckoutCommand {
    /// Start a checkout for a guest's cart.
    PlaceOrder {
        /// Guest session whose cart is being checked out.
        guest_token: GuestToken,
        /// Customer contact details.
        customer: CustomerInfo,
        /// Shipping destination.
        address: ShippingAddress,
        /// Caller-supplied idempotency key; resubmissions with the same key
        /// converge on one order.
        idempotency_key: String,
    },
}

impl CommandPayload for CheckoutCommand {
    fn command_type(&self) -> &'static str {
        match self {
            CheckoutCommand::PlaceOrder { .. } => "PlaceOrder",
        }
    }
}

/// Event announcing a new checkout transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequested {
    /// The order the checkout will create.
    pub order_id: OrderId,

    /// Guest session whose cart is being checked out.
    pub guest_token: GuestToken,

    /// Customer contact details.
    pub customer: CustomerInfo,

    /// Shipping destination.
    pub address: ShippingAddress,

    /// Caller-supplied idempotency key.
    pub idempotency_key: String,
}

impl DomainEvent for CheckoutRequested {
    fn event_type(&self) -> &'static str {
        "CheckoutRequested"
    }
}

/// Handles commands from the `checkout.commands` queue.
pub struct CheckoutCommandHandler<S, B: ?Sized> {
    store: Arc<S>,
    broker: Arc<B>,
}

impl<S, B> CheckoutCommandHandler<S, B>
where
    S: StateStore,
    B: MessageBroker + ?Sized,
{
    /// Consumer identity recorded in the ledger, keyed by the derived order
    /// ID so duplicate submissions dedupe across command identities.
    pub const CONSUMER: &'static str = "checkout-request";

    /// Creates a new handler.
    pub fn new(store: Arc<S>, broker: Arc<B>) -> Self {
        Self { store, broker }
    }

    /// Dispatches one command envelope.
    #[tracing::instrument(
        skip(self, envelope),
        fields(command_id = %envelope.command_id)
    )]
    pub async fn handle(
        &self,
        envelope: CommandEnvelope<CheckoutCommand>,
    ) -> Result<(), DomainError> {
        let command_id = envelope.command_id;
        let CheckoutCommand::PlaceOrder {
            guest_token,
            customer,
            address,
            idempotency_key,
        } = envelope.command;

        let order_id = OrderId::for_idempotency_key(&idempotency_key);

        // One ledger entry per derived order ID covers both broker
        // redelivery and caller resubmission with the same key.
        let fresh = self
            .store
            .record_processed(LedgerEntry::new(
                order_id.as_uuid(),
                Self::CONSUMER,
                "PlaceOrder",
            ))
            .await?;
        if !fresh {
            tracing::info!(%order_id, "duplicate checkout submission discarded");
            metrics::counter!("checkout_duplicates_total").increment(1);
            return Ok(());
        }

        let event = CheckoutRequested {
            order_id,
            guest_token,
            customer,
            address,
            idempotency_key,
        };
        let envelope = EventEnvelope::builder()
            .event_type(event.event_type())
            .aggregate_id(order_id.to_string())
            .aggregate_type(crate::order::AGGREGATE_TYPE)
            .correlation_id(order_id.into())
            .causation_id(command_id.into())
            .payload(&event)?
            .build();
        self.broker.publish_event(envelope).await?;

        metrics::counter!("checkouts_requested_total").increment(1);
        tracing::info!(%order_id, "checkout requested");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use messaging::InMemoryBroker;
    use storage::InMemoryStateStore;

    fn handler() -> (
        CheckoutCommandHandler<InMemoryStateStore, InMemoryBroker>,
        Arc<InMemoryBroker>,
    ) {
        let store = Arc::new(InMemoryStateStore::new());
        let broker = Arc::new(InMemoryBroker::new());
        (CheckoutCommandHandler::new(store, broker.clone()), broker)
    }

    fn place_order(key: &str) -> CommandEnvelope<CheckoutCommand> {
        CommandEnvelope::wrap(CheckoutCommand::PlaceOrder {
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
            idempotency_key: key.to_string(),
        })
    }

    #[tokio::test]
    async fn place_order_publishes_checkout_requested() {
        let (handler, broker) = handler();
        let mut events = broker
            .subscribe_events(&["order.CheckoutRequested"])
            .await
            .unwrap();

        handler.handle(place_order("key-1")).await.unwrap();

        let envelope = events.recv().await.unwrap();
        let event: CheckoutRequested = envelope.payload_as().unwrap();
        assert_eq!(event.order_id, OrderId::for_idempotency_key("key-1"));
        assert_eq!(
            envelope.correlation_id.as_uuid(),
            event.order_id.as_uuid()
        );
    }

    #[tokio::test]
    async fn same_idempotency_key_announces_once() {
        let (handler, broker) = handler();
        let mut events = broker
            .subscribe_events(&["order.CheckoutRequested"])
            .await
            .unwrap();

        // Two distinct submissions (fresh command IDs) with one key.
        handler.handle(place_order("key-1")).await.unwrap();
        handler.handle(place_order("key-1")).await.unwrap();

        assert!(events.recv().await.is_some());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn different_keys_announce_separately() {
        let (handler, broker) = handler();
        let mut events = broker
            .subscribe_events(&["order.CheckoutRequested"])
            .await
            .unwrap();

        handler.handle(place_order("key-1")).await.unwrap();
        handler.handle(place_order("key-2")).await.unwrap();

        assert!(events.recv().await.is_some());
        assert!(events.recv().await.is_some());
    }
}
