//! Background relay draining the outbox to the message broker.

use std::sync::Arc;
use std::time::Duration;

use messaging::MessageBroker;

use crate::error::Result;
use crate::store::StateStore;

/// Drains unpublished outbox entries to the broker.
///
/// Entries are published oldest first; a publish failure leaves the entry
/// unpublished and ends the batch, so the next tick retries it. The result
/// is at-least-once delivery: an entry published but not yet marked may be
/// re-published after a crash, and consumers dedupe through the ledger.
pub struct OutboxRelay<S, B: ?Sized> {
    store: Arc<S>,
    broker: Arc<B>,
    batch_size: usize,
    poll_interval: Duration,
}

impl<S, B> OutboxRelay<S, B>
where
    S: StateStore,
    B: MessageBroker + ?Sized,
{
    /// Creates a relay with the default batch size (50) and poll interval.
    pub fn new(store: Arc<S>, broker: Arc<B>) -> Self {
        Self {
            store,
            broker,
            batch_size: 50,
            poll_interval: Duration::from_millis(200),
        }
    }

    /// Overrides the batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Overrides the poll interval.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Publishes one batch of pending entries. Returns how many were
    /// published and marked.
    #[tracing::instrument(skip(self))]
    pub async fn run_once(&self) -> Result<usize> {
        let pending = self.store.unpublished(self.batch_size).await?;
        let mut published = 0;

        for entry in pending {
            let envelope = entry.to_event_envelope();
            let routing_key = envelope.routing_key();

            if let Err(e) = self.broker.publish_event(envelope).await {
                metrics::counter!("outbox_publish_failures_total").increment(1);
                tracing::warn!(
                    entry_id = %entry.id,
                    %routing_key,
                    error = %e,
                    "outbox publish failed, entry left for retry"
                );
                break;
            }

            self.store.mark_published(entry.id).await?;
            metrics::counter!("outbox_published_total").increment(1);
            published += 1;
        }

        Ok(published)
    }

    /// Runs the relay loop until the shutdown future resolves.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once().await {
                        tracing::error!(error = %e, "outbox relay tick failed");
                    }
                }
                () = &mut shutdown => {
                    tracing::info!("outbox relay shutting down");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStateStore;
    use crate::records::{Commit, OutboxEntry, StateRecord};
    use crate::version::Version;
    use async_trait::async_trait;
    use chrono::Utc;
    use common::{CorrelationId, EventId};
    use messaging::{CommandMessage, EventEnvelope, InMemoryBroker, MessagingError};
    use tokio::sync::mpsc;
    use uuid::Uuid;

    fn seeded_store_commit(events: usize) -> Commit {
        let outbox = (0..events)
            .map(|i| OutboxEntry {
                id: Uuid::new_v4(),
                aggregate_id: "g-1".to_string(),
                aggregate_type: "cart".to_string(),
                aggregate_version: Version::first(),
                event_id: EventId::new(),
                event_type: format!("Event{i}"),
                payload: serde_json::json!({ "i": i }),
                correlation_id: CorrelationId::new(),
                causation_id: None,
                tenant_id: None,
                created_at: Utc::now() + chrono::Duration::milliseconds(i as i64),
                published_at: None,
            })
            .collect();

        Commit {
            record: StateRecord {
                aggregate_type: "cart".to_string(),
                key: "g-1".to_string(),
                version: Version::first(),
                state: serde_json::json!({}),
                updated_at: Utc::now(),
            },
            expected_version: None,
            outbox,
            ledger: None,
        }
    }

    #[tokio::test]
    async fn run_once_publishes_and_marks() {
        let store = Arc::new(InMemoryStateStore::new());
        let broker = Arc::new(InMemoryBroker::new());
        let mut rx = broker.subscribe_events(&["#"]).await.unwrap();

        store.commit(seeded_store_commit(3)).await.unwrap();

        let relay = OutboxRelay::new(store.clone(), broker);
        assert_eq!(relay.run_once().await.unwrap(), 3);
        assert!(store.unpublished(10).await.unwrap().is_empty());

        for i in 0..3 {
            let event = rx.recv().await.unwrap();
            assert_eq!(event.event_type, format!("Event{i}"));
        }
    }

    #[tokio::test]
    async fn restarted_relay_still_publishes_pending_entries() {
        let store = Arc::new(InMemoryStateStore::new());
        store.commit(seeded_store_commit(1)).await.unwrap();

        // The first relay "crashes" before ever running.
        let broker = Arc::new(InMemoryBroker::new());
        let mut rx = broker.subscribe_events(&["#"]).await.unwrap();
        drop(OutboxRelay::new(store.clone(), broker.clone()));

        // A fresh relay over the same store picks the entry up.
        let relay = OutboxRelay::new(store.clone(), broker);
        assert_eq!(relay.run_once().await.unwrap(), 1);
        assert!(rx.recv().await.is_some());

        // Once marked published, nothing is re-sent.
        assert_eq!(relay.run_once().await.unwrap(), 0);
        assert!(rx.try_recv().is_err());
    }

    /// Broker that fails every publish.
    struct FailingBroker;

    #[async_trait]
    impl MessageBroker for FailingBroker {
        async fn send_command(&self, _: &str, _: CommandMessage) -> messaging::Result<()> {
            Ok(())
        }

        async fn publish_event(&self, _: EventEnvelope) -> messaging::Result<()> {
            Err(MessagingError::PublishFailed("broker down".to_string()))
        }

        async fn consume_commands(
            &self,
            queue: &str,
        ) -> messaging::Result<mpsc::UnboundedReceiver<CommandMessage>> {
            Err(MessagingError::QueueAlreadyConsumed(queue.to_string()))
        }

        async fn subscribe_events(
            &self,
            _: &[&str],
        ) -> messaging::Result<mpsc::UnboundedReceiver<EventEnvelope>> {
            let (_tx, rx) = mpsc::unbounded_channel();
            Ok(rx)
        }
    }

    #[tokio::test]
    async fn publish_failure_leaves_entry_for_retry() {
        let store = Arc::new(InMemoryStateStore::new());
        store.commit(seeded_store_commit(2)).await.unwrap();

        let relay = OutboxRelay::new(store.clone(), Arc::new(FailingBroker));
        assert_eq!(relay.run_once().await.unwrap(), 0);
        assert_eq!(store.unpublished(10).await.unwrap().len(), 2);
    }
}
