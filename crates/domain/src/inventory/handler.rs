//! Inventory command handler.

use std::collections::BTreeMap;
use std::sync::Arc;

use common::{OrderId, ProductId};
use futures_util::future::join_all;
use messaging::{CommandEnvelope, EventEnvelope, MessageBroker};
use storage::{LedgerEntry, StateStore};

use crate::aggregate::DomainEvent;
use crate::error::DomainError;
use crate::processor::{CommandContext, CommandProcessor};

use super::aggregate::InventoryItem;
use super::commands::InventoryCommand;
use super::events::{StockBatchValidated, StockDeductedForOrder, StockDeductionRejected};

/// Handles commands from the `inventory.commands` queue.
///
/// Batch operations fan one sub-operation out per product line and join on
/// all of them before reporting a single outcome event; redelivery safety
/// for the per-line commits comes from the aggregate's per-order deduction
/// tracking rather than the ledger.
pub struct InventoryCommandHandler<S, B: ?Sized> {
    processor: CommandProcessor<S>,
    broker: Arc<B>,
}

impl<S, B> InventoryCommandHandler<S, B>
where
    S: StateStore,
    B: MessageBroker + ?Sized,
{
    /// Consumer identity recorded in the ledger.
    pub const CONSUMER: &'static str = "inventory-command-handler";

    /// Creates a new handler.
    pub fn new(store: Arc<S>, broker: Arc<B>) -> Self {
        Self {
            processor: CommandProcessor::new(store, Self::CONSUMER),
            broker,
        }
    }

    /// Dispatches one command envelope.
    #[tracing::instrument(
        skip(self, envelope),
        fields(command_id = %envelope.command_id, correlation_id = %envelope.correlation_id)
    )]
    pub async fn handle(
        &self,
        envelope: CommandEnvelope<InventoryCommand>,
    ) -> Result<(), DomainError> {
        let ctx = CommandContext::from_envelope(&envelope);

        match envelope.command {
            InventoryCommand::SetStock {
                product_id,
                quantity,
                reason,
            } => {
                let key = product_id.as_str().to_string();
                self.processor
                    .execute::<InventoryItem, _>(&key, &ctx, move |item| {
                        item.set_stock(product_id.clone(), quantity, reason)
                    })
                    .await?;
                Ok(())
            }

            InventoryCommand::ValidateStockBatch { order_id, items } => {
                self.validate_batch(&ctx, order_id, items).await
            }

            InventoryCommand::DeductStockForOrder { order_id, items } => {
                self.deduct_for_order(&ctx, order_id, items).await
            }

            InventoryCommand::ReleaseStockForOrder { order_id, items } => {
                self.release_for_order(&ctx, order_id, items).await
            }
        }
    }

    /// Checks every line concurrently and reports one verdict.
    async fn validate_batch(
        &self,
        ctx: &CommandContext,
        order_id: OrderId,
        items: BTreeMap<ProductId, u32>,
    ) -> Result<(), DomainError> {
        let store = self.processor.store();
        if store
            .is_processed(ctx.command_id.as_uuid(), Self::CONSUMER)
            .await?
        {
            return Ok(());
        }

        let checks = items.iter().map(|(product_id, &quantity)| async move {
            let item = self.processor.load::<InventoryItem>(product_id.as_str()).await?;
            let verdict = match item {
                None => Some(format!("Product {product_id} not found")),
                Some(item) if !item.can_satisfy(quantity) => {
                    Some(format!("Insufficient stock for {product_id}"))
                }
                Some(_) => None,
            };
            Ok::<_, DomainError>(verdict)
        });

        // First failing line in product order decides the verdict.
        let mut failure_reason = None;
        for verdict in join_all(checks).await {
            if let Some(reason) = verdict? {
                failure_reason = Some(reason);
                break;
            }
        }

        let event = StockBatchValidated {
            order_id,
            success: failure_reason.is_none(),
            failure_reason,
        };
        self.publish_report(ctx, order_id, event.event_type(), &event)
            .await?;

        store
            .record_processed(LedgerEntry::new(
                ctx.command_id.as_uuid(),
                Self::CONSUMER,
                ctx.command_type,
            ))
            .await?;
        Ok(())
    }

    /// Deducts every line, joining all sub-deductions before reporting.
    async fn deduct_for_order(
        &self,
        ctx: &CommandContext,
        order_id: OrderId,
        items: BTreeMap<ProductId, u32>,
    ) -> Result<(), DomainError> {
        let store = self.processor.store();
        if store
            .is_processed(ctx.command_id.as_uuid(), Self::CONSUMER)
            .await?
        {
            return Ok(());
        }

        let ops = items.iter().map(|(product_id, &quantity)| {
            let product_id = product_id.clone();
            async move {
                let result = self
                    .processor
                    .execute_unrecorded::<InventoryItem, _>(
                        product_id.as_str(),
                        ctx,
                        move |item| item.deduct_for_order(order_id, quantity),
                    )
                    .await;
                (product_id, quantity, result)
            }
        });

        let mut deducted = BTreeMap::new();
        let mut rejection: Option<String> = None;
        for (product_id, quantity, result) in join_all(ops).await {
            match result {
                Ok(_) => {
                    deducted.insert(product_id, quantity);
                }
                Err(DomainError::Inventory(e)) => {
                    // Business rejection of one line fails the batch; keep
                    // the first reason in product order.
                    if rejection.is_none() {
                        rejection = Some(e.to_string());
                    }
                }
                // Infrastructure failure: let the command be redelivered.
                Err(e) => return Err(e),
            }
        }

        match rejection {
            None => {
                let event = StockDeductedForOrder {
                    order_id,
                    items: deducted,
                };
                self.publish_report(ctx, order_id, event.event_type(), &event)
                    .await?;
            }
            Some(reason) => {
                tracing::warn!(%order_id, %reason, "stock deduction rejected");
                metrics::counter!("stock_deductions_rejected_total").increment(1);
                let event = StockDeductionRejected {
                    order_id,
                    reason,
                    deducted,
                };
                self.publish_report(ctx, order_id, event.event_type(), &event)
                    .await?;
            }
        }

        store
            .record_processed(LedgerEntry::new(
                ctx.command_id.as_uuid(),
                Self::CONSUMER,
                ctx.command_type,
            ))
            .await?;
        Ok(())
    }

    /// Releases previously deducted lines; fire-and-forget compensation.
    async fn release_for_order(
        &self,
        ctx: &CommandContext,
        order_id: OrderId,
        items: BTreeMap<ProductId, u32>,
    ) -> Result<(), DomainError> {
        let store = self.processor.store();
        if store
            .is_processed(ctx.command_id.as_uuid(), Self::CONSUMER)
            .await?
        {
            return Ok(());
        }

        let ops = items.keys().map(|product_id| {
            let product_id = product_id.clone();
            async move {
                self.processor
                    .execute_unrecorded::<InventoryItem, _>(
                        product_id.as_str(),
                        ctx,
                        move |item| item.release_for_order(order_id),
                    )
                    .await
            }
        });

        for result in join_all(ops).await {
            result?;
        }

        store
            .record_processed(LedgerEntry::new(
                ctx.command_id.as_uuid(),
                Self::CONSUMER,
                ctx.command_type,
            ))
            .await?;
        Ok(())
    }

    async fn publish_report<T: serde::Serialize>(
        &self,
        ctx: &CommandContext,
        order_id: OrderId,
        event_type: &'static str,
        event: &T,
    ) -> Result<(), DomainError> {
        let envelope = EventEnvelope::builder()
            .event_type(event_type)
            .aggregate_id(order_id.to_string())
            .aggregate_type(super::AGGREGATE_TYPE)
            .correlation_id(ctx.correlation_id)
            .causation_id(ctx.command_id.into())
            .payload(event)?
            .build();
        self.broker.publish_event(envelope).await?;
        Ok(())
    }
}
