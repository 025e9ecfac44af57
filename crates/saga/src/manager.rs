//! Event-driven saga manager.

use std::collections::HashMap;
use std::sync::Arc;

use common::{CausationId, CommandId, CorrelationId, EventId, OrderId};
use domain::cart::{CartEvent, CartSnapshotProvided};
use domain::catalog::ProductSnapshotsProvided;
use domain::checkout::CheckoutRequested;
use domain::inventory::{StockBatchValidated, StockDeductedForOrder, StockDeductionRejected};
use domain::order::OrderEvent;
use messaging::{CommandEnvelope, CommandMessage, CommandPayload, EventEnvelope, MessageBroker};
use storage::{LedgerEntry, StateStore};
use tokio::sync::{Mutex, OwnedMutexGuard, mpsc};
use uuid::Uuid;

use crate::error::Result;
use crate::instance::{CheckoutSaga, SagaCommand, StepOutcome, Transition};
use crate::store::SagaStore;

/// Namespace for deriving saga command IDs from the triggering event.
///
/// A redelivered event re-emits its commands with the same IDs, so consumers
/// dedupe them through the ledger.
const COMMAND_NAMESPACE: Uuid = Uuid::from_bytes([
    0x3c, 0x91, 0x5e, 0x0a, 0x2d, 0x77, 0x4b, 0x28, 0x8e, 0x64, 0x1f, 0xb9, 0x55, 0x02, 0xc7,
    0x13,
]);

/// Per-order async locks serializing saga transitions.
///
/// Transitions for different orders run in parallel; the saga state of one
/// order is a single-writer resource.
#[derive(Default)]
struct KeyedLocks {
    locks: Mutex<HashMap<OrderId, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    async fn acquire(&self, order_id: OrderId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(order_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    async fn discard(&self, order_id: OrderId) {
        self.locks.lock().await.remove(&order_id);
    }
}

/// An event the saga reacts to, decoded from its wire envelope.
enum SagaInput {
    Requested(CheckoutRequested),
    CartSnapshot(CartSnapshotProvided),
    Products(ProductSnapshotsProvided),
    Validated(StockBatchValidated),
    Deducted(StockDeductedForOrder),
    Rejected(StockDeductionRejected),
    OrderCreated(OrderId),
    CartCleared(OrderId),
}

impl SagaInput {
    fn order_id(&self) -> OrderId {
        match self {
            SagaInput::Requested(e) => e.order_id,
            SagaInput::CartSnapshot(e) => e.order_id,
            SagaInput::Products(e) => e.order_id,
            SagaInput::Validated(e) => e.order_id,
            SagaInput::Deducted(e) => e.order_id,
            SagaInput::Rejected(e) => e.order_id,
            SagaInput::OrderCreated(order_id) => *order_id,
            SagaInput::CartCleared(order_id) => *order_id,
        }
    }
}

/// Coordinates checkout sagas by reacting to context events and issuing the
/// next command.
///
/// Every emitted command carries the order ID as its correlation identity
/// and the triggering event as its causation identity.
pub struct CheckoutSagaManager<G, L, B: ?Sized> {
    sagas: Arc<G>,
    ledger: Arc<L>,
    broker: Arc<B>,
    locks: KeyedLocks,
}

impl<G, L, B> CheckoutSagaManager<G, L, B>
where
    G: SagaStore,
    L: StateStore,
    B: MessageBroker + ?Sized,
{
    /// Consumer identity recorded in the ledger.
    pub const CONSUMER: &'static str = "checkout-saga";

    /// Topic bindings the manager subscribes with.
    pub const SUBSCRIPTIONS: [&'static str; 8] = [
        "order.CheckoutRequested",
        "cart.CartSnapshotProvided",
        "catalog.ProductSnapshotsProvided",
        "inventory.StockBatchValidated",
        "inventory.StockDeductedForOrder",
        "inventory.StockDeductionRejected",
        "order.OrderCreated",
        "cart.CartCleared",
    ];

    /// Creates a new manager.
    pub fn new(sagas: Arc<G>, ledger: Arc<L>, broker: Arc<B>) -> Self {
        Self {
            sagas,
            ledger,
            broker,
            locks: KeyedLocks::default(),
        }
    }

    /// Consumes events from a subscription until the channel closes.
    pub async fn run(&self, mut events: mpsc::UnboundedReceiver<EventEnvelope>) {
        while let Some(envelope) = events.recv().await {
            if let Err(e) = self.handle_event(&envelope).await {
                tracing::error!(
                    event_id = %envelope.event_id,
                    event_type = %envelope.event_type,
                    error = %e,
                    "saga event handling failed"
                );
            }
        }
    }

    /// Applies one event to the saga it belongs to.
    #[tracing::instrument(
        skip(self, envelope),
        fields(event_id = %envelope.event_id, event_type = %envelope.event_type)
    )]
    pub async fn handle_event(&self, envelope: &EventEnvelope) -> Result<()> {
        let Some(input) = Self::decode(envelope)? else {
            return Ok(());
        };
        let order_id = input.order_id();

        // Single writer per order; other orders proceed in parallel.
        let _guard = self.locks.acquire(order_id).await;

        if self
            .ledger
            .is_processed(envelope.event_id.as_uuid(), Self::CONSUMER)
            .await?
        {
            tracing::debug!(%order_id, "duplicate saga event discarded");
            return Ok(());
        }

        let existing = self.sagas.load(order_id).await?;
        let (saga, transition) = match (input, existing) {
            (SagaInput::Requested(event), None) => {
                metrics::counter!("saga_started").increment(1);
                tracing::info!(%order_id, "checkout saga started");
                let (saga, transition) = CheckoutSaga::start(event);
                (Some(saga), transition)
            }
            (SagaInput::Requested(_), Some(saga)) => {
                // A saga already exists for this order; the request is a
                // duplicate.
                (Some(saga), Transition::ignored())
            }
            (input, Some(mut saga)) => {
                let transition = match input {
                    SagaInput::Requested(_) => unreachable!("handled above"),
                    SagaInput::CartSnapshot(event) => saga.on_cart_snapshot(event.items),
                    SagaInput::Products(event) => saga.on_product_snapshots(event.products),
                    SagaInput::Validated(event) => {
                        saga.on_stock_validated(event.success, event.failure_reason)
                    }
                    SagaInput::Deducted(_) => saga.on_stock_deducted(),
                    SagaInput::Rejected(event) => {
                        saga.on_deduction_rejected(event.reason, event.deducted)
                    }
                    SagaInput::OrderCreated(_) => saga.on_order_created(),
                    SagaInput::CartCleared(_) => saga.on_cart_cleared(),
                };
                (Some(saga), transition)
            }
            (_, None) => {
                // Late redelivery for a finished saga, or an event that
                // outran its CheckoutRequested; nothing to coordinate.
                tracing::warn!(%order_id, "saga state not found for event");
                (None, Transition::ignored())
            }
        };

        // Send commands before persisting: a crash in between re-sends with
        // the same derived command IDs, which the receivers dedupe.
        for command in &transition.commands {
            self.send(order_id, envelope.event_id, command.clone()).await?;
        }

        if let Some(saga) = saga {
            match transition.outcome {
                StepOutcome::Advanced => {
                    self.sagas.save(&saga).await?;
                    tracing::info!(%order_id, step = %saga.step(), "saga advanced");
                }
                StepOutcome::Completed => {
                    self.sagas.delete(order_id).await?;
                    self.locks.discard(order_id).await;
                    metrics::counter!("saga_completed").increment(1);
                    let duration = (chrono::Utc::now() - saga.started_at()).num_milliseconds();
                    metrics::histogram!("saga_duration_seconds")
                        .record(duration as f64 / 1000.0);
                    tracing::info!(%order_id, "checkout saga completed");
                }
                StepOutcome::Failed => {
                    self.sagas.save(&saga).await?;
                    metrics::counter!("saga_failed").increment(1);
                    tracing::warn!(
                        %order_id,
                        reason = saga.failure_reason().unwrap_or("unknown"),
                        "checkout saga failed"
                    );
                }
                StepOutcome::Ignored => {}
            }
        }

        let outcome_note = match transition.outcome {
            StepOutcome::Advanced => "advanced",
            StepOutcome::Ignored => "ignored",
            StepOutcome::Completed => "completed",
            StepOutcome::Failed => "failed",
        };
        self.ledger
            .record_processed(
                LedgerEntry::new(
                    envelope.event_id.as_uuid(),
                    Self::CONSUMER,
                    envelope.event_type.clone(),
                )
                .with_result(outcome_note),
            )
            .await?;
        Ok(())
    }

    fn decode(envelope: &EventEnvelope) -> Result<Option<SagaInput>> {
        let input = match (
            envelope.aggregate_type.as_str(),
            envelope.event_type.as_str(),
        ) {
            ("order", "CheckoutRequested") => SagaInput::Requested(envelope.payload_as()?),
            ("cart", "CartSnapshotProvided") => SagaInput::CartSnapshot(envelope.payload_as()?),
            ("catalog", "ProductSnapshotsProvided") => {
                SagaInput::Products(envelope.payload_as()?)
            }
            ("inventory", "StockBatchValidated") => SagaInput::Validated(envelope.payload_as()?),
            ("inventory", "StockDeductedForOrder") => SagaInput::Deducted(envelope.payload_as()?),
            ("inventory", "StockDeductionRejected") => {
                SagaInput::Rejected(envelope.payload_as()?)
            }
            ("order", "OrderCreated") => match envelope.payload_as::<OrderEvent>()? {
                OrderEvent::OrderCreated(data) => SagaInput::OrderCreated(data.order_id),
                OrderEvent::CheckoutCompleted(_) => return Ok(None),
            },
            ("cart", "CartCleared") => match envelope.payload_as::<CartEvent>()? {
                CartEvent::CartCleared(data) => SagaInput::CartCleared(data.order_id),
                _ => return Ok(None),
            },
            _ => return Ok(None),
        };
        Ok(Some(input))
    }

    async fn send(
        &self,
        order_id: OrderId,
        event_id: EventId,
        command: SagaCommand,
    ) -> Result<()> {
        let queue = command.queue();
        let correlation_id = CorrelationId::from(order_id);
        let causation_id = CausationId::from(event_id);

        let message = match command {
            SagaCommand::Cart(command) => {
                Self::encode(queue, command, correlation_id, causation_id, event_id)?
            }
            SagaCommand::Catalog(command) => {
                Self::encode(queue, command, correlation_id, causation_id, event_id)?
            }
            SagaCommand::Inventory(command) => {
                Self::encode(queue, command, correlation_id, causation_id, event_id)?
            }
            SagaCommand::Order(command) => {
                Self::encode(queue, command, correlation_id, causation_id, event_id)?
            }
        };

        tracing::debug!(%order_id, queue, command_type = %message.command_type, "saga command sent");
        self.broker.send_command(queue, message).await?;
        Ok(())
    }

    fn encode<C: CommandPayload>(
        queue: &str,
        command: C,
        correlation_id: CorrelationId,
        causation_id: CausationId,
        event_id: EventId,
    ) -> Result<CommandMessage> {
        let seed = format!("{event_id}:{queue}:{}", command.command_type());
        let command_id =
            CommandId::from_uuid(Uuid::new_v5(&COMMAND_NAMESPACE, seed.as_bytes()));

        let message = CommandEnvelope::builder(command)
            .command_id(command_id)
            .correlation_id(correlation_id)
            .causation_id(causation_id)
            .build()
            .into_message()?;
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemorySagaStore;
    use common::GuestToken;
    use domain::order::{CustomerInfo, ShippingAddress};
    use messaging::InMemoryBroker;
    use serde::Serialize;
    use storage::InMemoryStateStore;

    type Manager = CheckoutSagaManager<InMemorySagaStore, InMemoryStateStore, InMemoryBroker>;

    fn manager() -> (Arc<Manager>, Arc<InMemorySagaStore>, Arc<InMemoryBroker>) {
        let sagas = Arc::new(InMemorySagaStore::new());
        let ledger = Arc::new(InMemoryStateStore::new());
        let broker = Arc::new(InMemoryBroker::new());
        (
            Arc::new(CheckoutSagaManager::new(sagas.clone(), ledger, broker.clone())),
            sagas,
            broker,
        )
    }

    fn event_envelope<T: Serialize>(
        aggregate_type: &str,
        event_type: &str,
        order_id: OrderId,
        payload: &T,
    ) -> EventEnvelope {
        EventEnvelope::builder()
            .event_type(event_type)
            .aggregate_id(order_id.to_string())
            .aggregate_type(aggregate_type)
            .correlation_id(order_id.into())
            .payload(payload)
            .unwrap()
            .build()
    }

    fn checkout_requested(order_id: OrderId) -> EventEnvelope {
        let event = CheckoutRequested {
            order_id,
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
            idempotency_key: "key-1".to_string(),
        };
        event_envelope("order", "CheckoutRequested", order_id, &event)
    }

    #[tokio::test]
    async fn checkout_requested_creates_saga_and_requests_snapshot() {
        let (manager, sagas, broker) = manager();
        let mut cart_rx = broker.consume_commands("cart.commands").await.unwrap();

        let order_id = OrderId::new();
        manager.handle_event(&checkout_requested(order_id)).await.unwrap();

        assert_eq!(sagas.len().await, 1);
        let message = cart_rx.try_recv().unwrap();
        assert_eq!(message.command_type, "GetCartSnapshot");
        assert_eq!(message.correlation_id.as_uuid(), order_id.as_uuid());
    }

    #[tokio::test]
    async fn redelivered_event_is_discarded_by_the_ledger() {
        let (manager, _, broker) = manager();
        let mut cart_rx = broker.consume_commands("cart.commands").await.unwrap();

        let envelope = checkout_requested(OrderId::new());
        manager.handle_event(&envelope).await.unwrap();
        manager.handle_event(&envelope).await.unwrap();

        assert!(cart_rx.try_recv().is_ok());
        assert!(cart_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn duplicate_checkout_request_does_not_restart_saga() {
        let (manager, sagas, broker) = manager();
        let mut cart_rx = broker.consume_commands("cart.commands").await.unwrap();

        let order_id = OrderId::new();
        // Two distinct request events (fresh event IDs) for one order.
        manager.handle_event(&checkout_requested(order_id)).await.unwrap();
        manager.handle_event(&checkout_requested(order_id)).await.unwrap();

        assert_eq!(sagas.len().await, 1);
        assert!(cart_rx.try_recv().is_ok());
        assert!(cart_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn event_without_saga_is_ignored() {
        let (manager, sagas, broker) = manager();
        let mut catalog_rx = broker.consume_commands("catalog.commands").await.unwrap();

        let order_id = OrderId::new();
        let snapshot = CartSnapshotProvided {
            order_id,
            guest_token: GuestToken::new("g-1"),
            items: [(common::ProductId::new("SKU-1"), 1)].into_iter().collect(),
        };
        manager
            .handle_event(&event_envelope("cart", "CartSnapshotProvided", order_id, &snapshot))
            .await
            .unwrap();

        assert!(sagas.is_empty().await);
        assert!(catalog_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unrelated_event_types_are_skipped() {
        let (manager, sagas, _) = manager();

        let order_id = OrderId::new();
        let envelope = event_envelope(
            "inventory",
            "StockSet",
            order_id,
            &serde_json::json!({"whatever": true}),
        );
        manager.handle_event(&envelope).await.unwrap();

        assert!(sagas.is_empty().await);
    }

    #[tokio::test]
    async fn saga_commands_have_deterministic_ids() {
        // The same triggering event must produce the same command ID, so a
        // redelivered event's commands dedupe at the receiver.
        let (manager, _, broker) = manager();
        let mut cart_rx = broker.consume_commands("cart.commands").await.unwrap();

        let order_id = OrderId::new();
        let envelope = checkout_requested(order_id);
        manager.handle_event(&envelope).await.unwrap();
        let first = cart_rx.try_recv().unwrap();

        // Simulate a crash before the ledger write: clear the ledger and
        // deliver the same event again.
        let (manager2, _, broker2) = {
            let sagas = Arc::new(InMemorySagaStore::new());
            let ledger = Arc::new(InMemoryStateStore::new());
            let broker = Arc::new(InMemoryBroker::new());
            (
                Arc::new(CheckoutSagaManager::new(sagas.clone(), ledger, broker.clone())),
                sagas,
                broker,
            )
        };
        let mut cart_rx2 = broker2.consume_commands("cart.commands").await.unwrap();
        manager2.handle_event(&envelope).await.unwrap();
        let second = cart_rx2.try_recv().unwrap();

        let id = |m: &CommandMessage| {
            m.body
                .get("command_id")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap()
        };
        assert_eq!(id(&first), id(&second));
    }
}
