//! Cart command handler.

use std::sync::Arc;

use common::{GuestToken, OrderId};
use messaging::{CommandEnvelope, EventEnvelope, MessageBroker};
use storage::{LedgerEntry, StateStore};

use crate::aggregate::{Aggregate, DomainEvent};
use crate::error::DomainError;
use crate::processor::{CommandContext, CommandProcessor};

use super::aggregate::ShoppingCart;
use super::commands::CartCommand;
use super::events::{CartClearedData, CartEvent, CartSnapshotProvided};

/// Handles commands from the `cart.commands` queue.
pub struct CartCommandHandler<S, B: ?Sized> {
    processor: CommandProcessor<S>,
    broker: Arc<B>,
}

impl<S, B> CartCommandHandler<S, B>
where
    S: StateStore,
    B: MessageBroker + ?Sized,
{
    /// Consumer identity recorded in the ledger.
    pub const CONSUMER: &'static str = "cart-command-handler";

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
    pub async fn handle(&self, envelope: CommandEnvelope<CartCommand>) -> Result<(), DomainError> {
        let ctx = CommandContext::from_envelope(&envelope);

        match envelope.command {
            CartCommand::AddCartItem {
                guest_token,
                product_id,
                quantity,
            } => {
                let key = guest_token.as_str().to_string();
                self.processor
                    .execute::<ShoppingCart, _>(&key, &ctx, move |cart| {
                        if cart.key().is_none() {
                            cart.create(guest_token.clone())?;
                        }
                        cart.add_item(product_id.clone(), quantity)
                    })
                    .await?;
                Ok(())
            }

            CartCommand::UpdateCartItemQuantity {
                guest_token,
                product_id,
                quantity,
            } => {
                self.processor
                    .execute::<ShoppingCart, _>(guest_token.as_str(), &ctx, move |cart| {
                        cart.update_item_quantity(product_id.clone(), quantity)
                    })
                    .await?;
                Ok(())
            }

            CartCommand::RemoveCartItem {
                guest_token,
                product_id,
            } => {
                self.processor
                    .execute::<ShoppingCart, _>(guest_token.as_str(), &ctx, move |cart| {
                        cart.remove_item(product_id.clone())
                    })
                    .await?;
                Ok(())
            }

            CartCommand::GetCartSnapshot {
                order_id,
                guest_token,
            } => self.provide_snapshot(&ctx, order_id, guest_token).await,

            CartCommand::ClearCart {
                order_id,
                guest_token,
            } => self.clear(&ctx, order_id, guest_token).await,
        }
    }

    /// Answers a snapshot request, even when no cart exists.
    async fn provide_snapshot(
        &self,
        ctx: &CommandContext,
        order_id: OrderId,
        guest_token: GuestToken,
    ) -> Result<(), DomainError> {
        let store = self.processor.store();
        if store
            .is_processed(ctx.command_id.as_uuid(), Self::CONSUMER)
            .await?
        {
            return Ok(());
        }

        let cart: Option<ShoppingCart> = self.processor.load(guest_token.as_str()).await?;
        let items = cart.map(|c| c.items().clone()).unwrap_or_default();

        let event = CartSnapshotProvided {
            order_id,
            guest_token: guest_token.clone(),
            items,
        };
        let envelope = EventEnvelope::builder()
            .event_type(event.event_type())
            .aggregate_id(guest_token.as_str())
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

    /// Empties the cart; a missing cart still reports the clear so the
    /// checkout can finish.
    async fn clear(
        &self,
        ctx: &CommandContext,
        order_id: OrderId,
        guest_token: GuestToken,
    ) -> Result<(), DomainError> {
        let existing: Option<ShoppingCart> = self.processor.load(guest_token.as_str()).await?;

        if existing.is_some() {
            let token = guest_token.clone();
            self.processor
                .execute::<ShoppingCart, _>(guest_token.as_str(), ctx, move |cart| {
                    cart.clear(order_id, token.clone())
                })
                .await?;
            return Ok(());
        }

        let store = self.processor.store();
        if store
            .is_processed(ctx.command_id.as_uuid(), Self::CONSUMER)
            .await?
        {
            return Ok(());
        }

        let event = CartEvent::CartCleared(CartClearedData {
            order_id,
            guest_token: guest_token.clone(),
        });
        let envelope = EventEnvelope::builder()
            .event_type(event.event_type())
            .aggregate_id(guest_token.as_str())
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
