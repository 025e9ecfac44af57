//! In-memory broker implementation for tests and single-process deployments.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use crate::broker::MessageBroker;
use crate::envelope::CommandMessage;
use crate::error::{MessagingError, Result};
use crate::event::EventEnvelope;
use crate::routing::topic_matches;

struct Queue {
    sender: mpsc::UnboundedSender<CommandMessage>,
    receiver: Option<mpsc::UnboundedReceiver<CommandMessage>>,
}

impl Queue {
    fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Some(receiver),
        }
    }
}

struct Subscription {
    patterns: Vec<String>,
    sender: mpsc::UnboundedSender<EventEnvelope>,
}

#[derive(Default)]
struct Inner {
    queues: HashMap<String, Queue>,
    subscriptions: Vec<Subscription>,
}

impl Inner {
    fn new() -> Self {
        Self {
            queues: HashMap::new(),
            subscriptions: Vec::new(),
        }
    }
}

/// In-memory broker backed by unbounded tokio channels.
///
/// Queues are created lazily on first send or consume. Events are fanned
/// out to every subscription whose patterns match the routing key.
#[derive(Clone)]
pub struct InMemoryBroker {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryBroker {
    /// Creates a new empty broker.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::new())),
        }
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageBroker for InMemoryBroker {
    async fn send_command(&self, queue: &str, message: CommandMessage) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let entry = inner
            .queues
            .entry(queue.to_string())
            .or_insert_with(Queue::new);
        entry
            .sender
            .send(message)
            .map_err(|_| MessagingError::PublishFailed(format!("queue '{queue}' is closed")))?;
        metrics::counter!("broker_commands_sent_total").increment(1);
        Ok(())
    }

    async fn publish_event(&self, event: EventEnvelope) -> Result<()> {
        let routing_key = event.routing_key();
        let mut inner = self.inner.lock().await;

        // Drop subscriptions whose receivers are gone.
        inner.subscriptions.retain(|sub| !sub.sender.is_closed());

        for sub in &inner.subscriptions {
            if sub.patterns.iter().any(|p| topic_matches(p, &routing_key)) {
                // A closed receiver is not a publish failure for the others.
                let _ = sub.sender.send(event.clone());
            }
        }

        metrics::counter!("broker_events_published_total").increment(1);
        tracing::debug!(%routing_key, event_id = %event.event_id, "event published");
        Ok(())
    }

    async fn consume_commands(
        &self,
        queue: &str,
    ) -> Result<mpsc::UnboundedReceiver<CommandMessage>> {
        let mut inner = self.inner.lock().await;
        let entry = inner
            .queues
            .entry(queue.to_string())
            .or_insert_with(Queue::new);
        entry
            .receiver
            .take()
            .ok_or_else(|| MessagingError::QueueAlreadyConsumed(queue.to_string()))
    }

    async fn subscribe_events(
        &self,
        patterns: &[&str],
    ) -> Result<mpsc::UnboundedReceiver<EventEnvelope>> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock().await;
        inner.subscriptions.push(Subscription {
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            sender,
        });
        Ok(receiver)
    }
}
