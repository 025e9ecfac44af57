//! Broker abstraction over command queues and the event topic.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::envelope::CommandMessage;
use crate::error::Result;
use crate::event::EventEnvelope;

/// A message broker offering per-context command queues and a single
/// publish/subscribe event topic with wildcard routing-key bindings.
///
/// Delivery is at-least-once: consumers must tolerate duplicates and dedupe
/// through the processed-message ledger.
#[async_trait]
pub trait MessageBroker: Send + Sync {
    /// Sends a command to the named queue.
    async fn send_command(&self, queue: &str, message: CommandMessage) -> Result<()>;

    /// Publishes an event to the topic under its routing key.
    async fn publish_event(&self, event: EventEnvelope) -> Result<()>;

    /// Takes the consumer side of the named command queue.
    ///
    /// Each queue supports a single consumer; a second call for the same
    /// queue fails with [`crate::MessagingError::QueueAlreadyConsumed`].
    async fn consume_commands(
        &self,
        queue: &str,
    ) -> Result<mpsc::UnboundedReceiver<CommandMessage>>;

    /// Binds a subscription to the event topic.
    ///
    /// The returned receiver yields every event whose routing key matches at
    /// least one of the given patterns.
    async fn subscribe_events(
        &self,
        patterns: &[&str],
    ) -> Result<mpsc::UnboundedReceiver<EventEnvelope>>;
}
