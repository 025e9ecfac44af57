//! Catalog command handler.

use std::sync::Arc;

use common::{OrderId, ProductId};
use futures_util::future::join_all;
use messaging::{CommandEnvelope, EventEnvelope, MessageBroker};
use storage::{LedgerEntry, StateStore};

use crate::aggregate::DomainEvent;
use crate::error::DomainError;
use crate::processor::{CommandContext, CommandProcessor};

use super::aggregate::Product;
use super::commands::CatalogCommand;
use super::events::ProductSnapshotsProvided;

/// Handles commands from the `catalog.commands` queue.
pub struct CatalogCommandHandler<S, B: ?Sized> {
    processor: CommandProcessor<S>,
    broker: Arc<B>,
}

impl<S, B> CatalogCommandHandler<S, B>
where
    S: StateStore,
    B: MessageBroker + ?Sized,
{
    /// Consumer identity recorded in the ledger.
    pub const CONSUMER: &'static str = "catalog-command-handler";

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
        envelope: CommandEnvelope<CatalogCommand>,
    ) -> Result<(), DomainError> {
        let ctx = CommandContext::from_envelope(&envelope);

        match envelope.command {
            CatalogCommand::CreateProduct {
                product_id,
                name,
                description,
                unit_price,
            } => {
                let key = product_id.as_str().to_string();
                self.processor
                    .execute::<Product, _>(&key, &ctx, move |product| {
                        product.create(
                            product_id.clone(),
                            name.clone(),
                            description.clone(),
                            unit_price,
                        )
                    })
                    .await?;
                Ok(())
            }

            CatalogCommand::UpdateProductDetails {
                product_id,
                name,
                description,
            } => {
                self.processor
                    .execute::<Product, _>(product_id.as_str(), &ctx, move |product| {
                        product.update_details(name.clone(), description.clone())
                    })
                    .await?;
                Ok(())
            }

            CatalogCommand::ChangeProductPrice {
                product_id,
                new_price,
            } => {
                self.processor
                    .execute::<Product, _>(product_id.as_str(), &ctx, move |product| {
                        product.change_price(new_price)
                    })
                    .await?;
                Ok(())
            }

            CatalogCommand::ActivateProduct { product_id } => {
                self.processor
                    .execute::<Product, _>(product_id.as_str(), &ctx, |product| product.activate())
                    .await?;
                Ok(())
            }

            CatalogCommand::DeactivateProduct { product_id } => {
                self.processor
                    .execute::<Product, _>(product_id.as_str(), &ctx, |product| {
                        product.deactivate()
                    })
                    .await?;
                Ok(())
            }

            CatalogCommand::DeleteProduct { product_id } => {
                self.processor
                    .execute::<Product, _>(product_id.as_str(), &ctx, |product| product.delete())
                    .await?;
                Ok(())
            }

            CatalogCommand::GetProductSnapshots {
                order_id,
                product_ids,
            } => self.provide_snapshots(&ctx, order_id, product_ids).await,
        }
    }

    /// Resolves snapshots for every requested product concurrently.
    async fn provide_snapshots(
        &self,
        ctx: &CommandContext,
        order_id: OrderId,
        product_ids: Vec<ProductId>,
    ) -> Result<(), DomainError> {
        let store = self.processor.store();
        if store
            .is_processed(ctx.command_id.as_uuid(), Self::CONSUMER)
            .await?
        {
            return Ok(());
        }

        let loads = product_ids
            .iter()
            .map(|id| self.processor.load::<Product>(id.as_str()));
        let mut products = Vec::with_capacity(product_ids.len());
        for loaded in join_all(loads).await {
            if let Some(snapshot) = loaded?.and_then(|p| p.snapshot()) {
                products.push(snapshot);
            }
        }

        let event = ProductSnapshotsProvided { order_id, products };
        let envelope = EventEnvelope::builder()
            .event_type(event.event_type())
            .aggregate_id(order_id.to_string())
            .aggregate_type(super::AGGREGATE_TYPE)
            .correlation_id(ctx.correlation_id)
            .causation_id(ctx.command_id.into())
            .payload(&event)?
            .build();
        self.broker.publish_event(envelope).await?;

        store
            .record_processed(LedgerEntry::new(
                ctx.command_id.as_uuid(),
                Self::CONSUMER,
                ctx.command_type,
            ))
            .await?;
        Ok(())
    }
}
