//! Order command handler.

use std::sync::Arc;

use messaging::{CommandEnvelope, MessageBroker};
use storage::StateStore;

use crate::error::DomainError;
use crate::processor::{CommandContext, CommandProcessor};

use super::aggregate::Order;
use super::commands::OrderCommand;
use super::value_objects::OrderNumber;

/// Handles commands from the `order.commands` queue.
pub struct OrderCommandHandler<S, B: ?Sized> {
    processor: CommandProcessor<S>,
    #[allow(dead_code)] // Parity with the other handlers; orders emit no report events.
    broker: Arc<B>,
}

impl<S, B> OrderCommandHandler<S, B>
where
    S: StateStore,
    B: MessageBroker + ?Sized,
{
    /// Consumer identity recorded in the ledger.
    pub const CONSUMER: &'static str = "order-command-handler";

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
    pub async fn handle(&self, envelope: CommandEnvelope<OrderCommand>) -> Result<(), DomainError> {
        let ctx = CommandContext::from_envelope(&envelope);

        match envelope.command {
            OrderCommand::CreateOrder {
                order_id,
                guest_token,
                customer,
                address,
                line_items,
                totals,
                idempotency_key,
            } => {
                let key = order_id.to_string();
                self.processor
                    .execute::<Order, _>(&key, &ctx, move |order| {
                        order.create(
                            order_id,
                            OrderNumber::generate(),
                            guest_token.clone(),
                            customer.clone(),
                            address.clone(),
                            line_items.clone(),
                            totals,
                            idempotency_key.clone(),
                        )
                    })
                    .await?;
                metrics::counter!("orders_created_total").increment(1);
                Ok(())
            }

            OrderCommand::MarkCheckoutCompleted { order_id } => {
                let key = order_id.to_string();
                self.processor
                    .execute::<Order, _>(&key, &ctx, |order| order.mark_checkout_completed())
                    .await?;
                Ok(())
            }
        }
    }
}
