//! Durable checkout saga instance and its pure transition logic.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::{GuestToken, OrderId, ProductId};
use domain::cart::CartCommand;
use domain::catalog::{CatalogCommand, ProductSnapshot};
use domain::checkout::CheckoutRequested;
use domain::inventory::InventoryCommand;
use domain::order::{CustomerInfo, OrderCommand, OrderLineItem, OrderTotals, ShippingAddress};
use messaging::routing::queues;
use serde::{Deserialize, Serialize};

use crate::state::CheckoutStep;

/// A command the saga asks a bounded context to perform.
#[derive(Debug, Clone)]
pub enum SagaCommand {
    /// Command for the cart context.
    Cart(CartCommand),

    /// Command for the product catalog context.
    Catalog(CatalogCommand),

    /// Command for the inventory context.
    Inventory(InventoryCommand),

    /// Command for the order context.
    Order(OrderCommand),
}

impl SagaCommand {
    /// Returns the queue the command belongs on.
    pub fn queue(&self) -> &'static str {
        match self {
            SagaCommand::Cart(_) => queues::CART_COMMANDS,
            SagaCommand::Catalog(_) => queues::CATALOG_COMMANDS,
            SagaCommand::Inventory(_) => queues::INVENTORY_COMMANDS,
            SagaCommand::Order(_) => queues::ORDER_COMMANDS,
        }
    }
}

/// How a transition left the saga.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The saga moved to its next step.
    Advanced,

    /// The event did not match the current step; nothing changed.
    Ignored,

    /// The final step finished; the saga record can be deleted.
    Completed,

    /// The checkout was aborted with a reason; the record is kept.
    Failed,
}

/// Result of applying one event to the saga.
#[derive(Debug)]
pub struct Transition {
    /// How the saga changed.
    pub outcome: StepOutcome,

    /// Commands to send, in order.
    pub commands: Vec<SagaCommand>,
}

impl Transition {
    fn advanced(commands: Vec<SagaCommand>) -> Self {
        Self {
            outcome: StepOutcome::Advanced,
            commands,
        }
    }

    /// A transition that changed nothing.
    pub fn ignored() -> Self {
        Self {
            outcome: StepOutcome::Ignored,
            commands: vec![],
        }
    }
}

/// Durable per-checkout saga state, keyed by order ID.
///
/// Holds everything gathered across steps that cannot be re-derived from any
/// single event: the checkout request data, the cart lines, and the resolved
/// product snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSaga {
    order_id: OrderId,
    guest_token: GuestToken,
    customer: CustomerInfo,
    address: ShippingAddress,
    idempotency_key: String,
    cart_items: BTreeMap<ProductId, u32>,
    products: Vec<ProductSnapshot>,
    step: CheckoutStep,
    failure_reason: Option<String>,
    started_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

// Query methods
impl CheckoutSaga {
    /// Returns the order ID this saga is driving.
    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    /// Returns the step the saga is waiting on.
    pub fn step(&self) -> CheckoutStep {
        self.step
    }

    /// Returns the failure reason, if the saga was aborted.
    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    /// Returns the cart lines captured by the snapshot step.
    pub fn cart_items(&self) -> &BTreeMap<ProductId, u32> {
        &self.cart_items
    }

    /// Returns when the saga started.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

// Transitions
impl CheckoutSaga {
    /// Starts a saga from a checkout request.
    pub fn start(event: CheckoutRequested) -> (Self, Transition) {
        let now = Utc::now();
        let saga = Self {
            order_id: event.order_id,
            guest_token: event.guest_token.clone(),
            customer: event.customer,
            address: event.address,
            idempotency_key: event.idempotency_key,
            cart_items: BTreeMap::new(),
            products: Vec::new(),
            step: CheckoutStep::AwaitingCart,
            failure_reason: None,
            started_at: now,
            updated_at: now,
        };

        let transition = Transition::advanced(vec![SagaCommand::Cart(
            CartCommand::GetCartSnapshot {
                order_id: event.order_id,
                guest_token: event.guest_token,
            },
        )]);
        (saga, transition)
    }

    /// Step 2: the cart snapshot arrived.
    pub fn on_cart_snapshot(&mut self, items: BTreeMap<ProductId, u32>) -> Transition {
        if self.step != CheckoutStep::AwaitingCart {
            return Transition::ignored();
        }

        if items.is_empty() {
            return self.fail("cart is empty", vec![]);
        }

        self.cart_items = items;
        self.advance(
            CheckoutStep::AwaitingProducts,
            vec![SagaCommand::Catalog(CatalogCommand::GetProductSnapshots {
                order_id: self.order_id,
                product_ids: self.cart_items.keys().cloned().collect(),
            })],
        )
    }

    /// Step 3: the resolved product snapshots arrived.
    pub fn on_product_snapshots(&mut self, products: Vec<ProductSnapshot>) -> Transition {
        if self.step != CheckoutStep::AwaitingProducts {
            return Transition::ignored();
        }

        self.products = products;
        self.advance(
            CheckoutStep::AwaitingStockValidation,
            vec![SagaCommand::Inventory(InventoryCommand::ValidateStockBatch {
                order_id: self.order_id,
                items: self.cart_items.clone(),
            })],
        )
    }

    /// Step 4: the batch validation verdict arrived.
    pub fn on_stock_validated(
        &mut self,
        success: bool,
        failure_reason: Option<String>,
    ) -> Transition {
        if self.step != CheckoutStep::AwaitingStockValidation {
            return Transition::ignored();
        }

        if !success {
            let reason =
                failure_reason.unwrap_or_else(|| "stock validation failed".to_string());
            return self.fail(reason, vec![]);
        }

        self.advance(
            CheckoutStep::AwaitingDeduction,
            vec![SagaCommand::Inventory(InventoryCommand::DeductStockForOrder {
                order_id: self.order_id,
                items: self.cart_items.clone(),
            })],
        )
    }

    /// Step 5: every line was deducted; create the order.
    pub fn on_stock_deducted(&mut self) -> Transition {
        if self.step != CheckoutStep::AwaitingDeduction {
            return Transition::ignored();
        }

        let line_items = self.line_items();
        let totals = OrderTotals::from_line_items(&line_items);
        self.advance(
            CheckoutStep::AwaitingOrderCreation,
            vec![SagaCommand::Order(OrderCommand::CreateOrder {
                order_id: self.order_id,
                guest_token: self.guest_token.clone(),
                customer: self.customer.clone(),
                address: self.address.clone(),
                line_items,
                totals,
                idempotency_key: self.idempotency_key.clone(),
            })],
        )
    }

    /// Step 5 failure path: deduction was rejected; release what was
    /// already taken and abort.
    pub fn on_deduction_rejected(
        &mut self,
        reason: String,
        deducted: BTreeMap<ProductId, u32>,
    ) -> Transition {
        if self.step != CheckoutStep::AwaitingDeduction {
            return Transition::ignored();
        }

        let mut commands = vec![];
        if !deducted.is_empty() {
            commands.push(SagaCommand::Inventory(InventoryCommand::ReleaseStockForOrder {
                order_id: self.order_id,
                items: deducted,
            }));
        }
        self.fail(reason, commands)
    }

    /// Step 6: the order exists; clear the cart.
    pub fn on_order_created(&mut self) -> Transition {
        if self.step != CheckoutStep::AwaitingOrderCreation {
            return Transition::ignored();
        }

        self.advance(
            CheckoutStep::AwaitingCartClear,
            vec![SagaCommand::Cart(CartCommand::ClearCart {
                order_id: self.order_id,
                guest_token: self.guest_token.clone(),
            })],
        )
    }

    /// Step 7: the cart is empty; mark the checkout finished.
    pub fn on_cart_cleared(&mut self) -> Transition {
        if self.step != CheckoutStep::AwaitingCartClear {
            return Transition::ignored();
        }

        self.step = CheckoutStep::Completed;
        self.updated_at = Utc::now();
        Transition {
            outcome: StepOutcome::Completed,
            commands: vec![SagaCommand::Order(OrderCommand::MarkCheckoutCompleted {
                order_id: self.order_id,
            })],
        }
    }

    fn advance(&mut self, next: CheckoutStep, commands: Vec<SagaCommand>) -> Transition {
        self.step = next;
        self.updated_at = Utc::now();
        Transition::advanced(commands)
    }

    fn fail(&mut self, reason: impl Into<String>, commands: Vec<SagaCommand>) -> Transition {
        self.step = CheckoutStep::Failed;
        self.failure_reason = Some(reason.into());
        self.updated_at = Utc::now();
        Transition {
            outcome: StepOutcome::Failed,
            commands,
        }
    }

    /// Computes order lines: resolved product metadata times the requested
    /// quantity.
    fn line_items(&self) -> Vec<OrderLineItem> {
        self.products
            .iter()
            .filter_map(|product| {
                let quantity = *self.cart_items.get(&product.product_id)?;
                (quantity > 0).then(|| {
                    OrderLineItem::new(
                        product.product_id.clone(),
                        product.name.clone(),
                        product.unit_price,
                        quantity,
                    )
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Money;

    fn checkout_requested() -> CheckoutRequested {
        CheckoutRequested {
            order_id: OrderId::for_idempotency_key("key-1"),
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
        }
    }

    fn lines(items: &[(&str, u32)]) -> BTreeMap<ProductId, u32> {
        items
            .iter()
            .map(|(sku, qty)| (ProductId::new(*sku), *qty))
            .collect()
    }

    fn snapshots() -> Vec<ProductSnapshot> {
        vec![
            ProductSnapshot {
                product_id: ProductId::new("SKU-A"),
                name: "Widget".to_string(),
                unit_price: Money::from_cents(1000),
                active: true,
            },
            ProductSnapshot {
                product_id: ProductId::new("SKU-B"),
                name: "Gadget".to_string(),
                unit_price: Money::from_cents(2500),
                active: true,
            },
        ]
    }

    /// Drives a saga to the deduction step.
    fn saga_awaiting_deduction() -> CheckoutSaga {
        let (mut saga, _) = CheckoutSaga::start(checkout_requested());
        saga.on_cart_snapshot(lines(&[("SKU-A", 2), ("SKU-B", 1)]));
        saga.on_product_snapshots(snapshots());
        saga.on_stock_validated(true, None);
        assert_eq!(saga.step(), CheckoutStep::AwaitingDeduction);
        saga
    }

    #[test]
    fn start_requests_cart_snapshot() {
        let (saga, transition) = CheckoutSaga::start(checkout_requested());

        assert_eq!(saga.step(), CheckoutStep::AwaitingCart);
        assert_eq!(transition.outcome, StepOutcome::Advanced);
        assert_eq!(transition.commands.len(), 1);
        assert!(matches!(
            &transition.commands[0],
            SagaCommand::Cart(CartCommand::GetCartSnapshot { .. })
        ));
    }

    #[test]
    fn empty_cart_aborts_with_no_commands() {
        let (mut saga, _) = CheckoutSaga::start(checkout_requested());

        let transition = saga.on_cart_snapshot(BTreeMap::new());

        assert_eq!(transition.outcome, StepOutcome::Failed);
        assert!(transition.commands.is_empty());
        assert_eq!(saga.step(), CheckoutStep::Failed);
        assert_eq!(saga.failure_reason(), Some("cart is empty"));
    }

    #[test]
    fn cart_snapshot_requests_product_snapshots() {
        let (mut saga, _) = CheckoutSaga::start(checkout_requested());

        let transition = saga.on_cart_snapshot(lines(&[("SKU-A", 2)]));

        assert_eq!(saga.step(), CheckoutStep::AwaitingProducts);
        let SagaCommand::Catalog(CatalogCommand::GetProductSnapshots { product_ids, .. }) =
            &transition.commands[0]
        else {
            panic!("expected GetProductSnapshots");
        };
        assert_eq!(product_ids, &vec![ProductId::new("SKU-A")]);
    }

    #[test]
    fn failed_validation_aborts_with_reason() {
        let (mut saga, _) = CheckoutSaga::start(checkout_requested());
        saga.on_cart_snapshot(lines(&[("SKU-A", 2)]));
        saga.on_product_snapshots(snapshots());

        let transition =
            saga.on_stock_validated(false, Some("Insufficient stock for SKU-A".to_string()));

        assert_eq!(transition.outcome, StepOutcome::Failed);
        assert!(transition.commands.is_empty());
        assert_eq!(saga.failure_reason(), Some("Insufficient stock for SKU-A"));
    }

    #[test]
    fn deduction_produces_order_with_computed_totals() {
        let mut saga = saga_awaiting_deduction();

        let transition = saga.on_stock_deducted();

        assert_eq!(saga.step(), CheckoutStep::AwaitingOrderCreation);
        let SagaCommand::Order(OrderCommand::CreateOrder {
            line_items, totals, ..
        }) = &transition.commands[0]
        else {
            panic!("expected CreateOrder");
        };
        assert_eq!(line_items.len(), 2);
        // 2 x $10.00 + 1 x $25.00
        assert_eq!(totals.subtotal.cents(), 4500);
        assert_eq!(totals.total.cents(), 4500);
        assert_eq!(totals.tax.cents(), 0);
    }

    #[test]
    fn rejected_deduction_compensates_and_fails() {
        let mut saga = saga_awaiting_deduction();

        let transition = saga.on_deduction_rejected(
            "Insufficient stock for SKU-B".to_string(),
            lines(&[("SKU-A", 2)]),
        );

        assert_eq!(transition.outcome, StepOutcome::Failed);
        assert_eq!(saga.step(), CheckoutStep::Failed);
        let SagaCommand::Inventory(InventoryCommand::ReleaseStockForOrder { items, .. }) =
            &transition.commands[0]
        else {
            panic!("expected ReleaseStockForOrder");
        };
        assert_eq!(items, &lines(&[("SKU-A", 2)]));
    }

    #[test]
    fn rejected_deduction_with_nothing_deducted_emits_no_commands() {
        let mut saga = saga_awaiting_deduction();

        let transition =
            saga.on_deduction_rejected("Insufficient stock".to_string(), BTreeMap::new());

        assert_eq!(transition.outcome, StepOutcome::Failed);
        assert!(transition.commands.is_empty());
    }

    #[test]
    fn order_created_then_cart_cleared_completes() {
        let mut saga = saga_awaiting_deduction();
        saga.on_stock_deducted();

        let transition = saga.on_order_created();
        assert_eq!(saga.step(), CheckoutStep::AwaitingCartClear);
        assert!(matches!(
            &transition.commands[0],
            SagaCommand::Cart(CartCommand::ClearCart { .. })
        ));

        let transition = saga.on_cart_cleared();
        assert_eq!(transition.outcome, StepOutcome::Completed);
        assert_eq!(saga.step(), CheckoutStep::Completed);
        assert!(matches!(
            &transition.commands[0],
            SagaCommand::Order(OrderCommand::MarkCheckoutCompleted { .. })
        ));
    }

    #[test]
    fn out_of_step_events_are_ignored() {
        let (mut saga, _) = CheckoutSaga::start(checkout_requested());

        // Still awaiting the cart; later-step events must not move the saga.
        assert_eq!(saga.on_stock_deducted().outcome, StepOutcome::Ignored);
        assert_eq!(saga.on_order_created().outcome, StepOutcome::Ignored);
        assert_eq!(saga.on_cart_cleared().outcome, StepOutcome::Ignored);
        assert_eq!(saga.step(), CheckoutStep::AwaitingCart);

        // A redelivered snapshot after advancing is also ignored.
        saga.on_cart_snapshot(lines(&[("SKU-A", 1)]));
        let transition = saga.on_cart_snapshot(lines(&[("SKU-A", 9)]));
        assert_eq!(transition.outcome, StepOutcome::Ignored);
        assert_eq!(saga.cart_items(), &lines(&[("SKU-A", 1)]));
    }

    #[test]
    fn command_queues_match_contexts() {
        let order_id = OrderId::new();
        assert_eq!(
            SagaCommand::Cart(CartCommand::ClearCart {
                order_id,
                guest_token: GuestToken::new("g"),
            })
            .queue(),
            "cart.commands"
        );
        assert_eq!(
            SagaCommand::Order(OrderCommand::MarkCheckoutCompleted { order_id }).queue(),
            "order.commands"
        );
    }

    #[test]
    fn state_serialization_roundtrip() {
        let saga = saga_awaiting_deduction();

        let json = serde_json::to_string(&saga).unwrap();
        let restored: CheckoutSaga = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.order_id(), saga.order_id());
        assert_eq!(restored.step(), CheckoutStep::AwaitingDeduction);
        assert_eq!(restored.cart_items(), saga.cart_items());
    }
}
