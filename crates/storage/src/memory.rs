//! In-memory state store for tests and single-process deployments.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::records::{Commit, LedgerEntry, OutboxEntry, StateRecord};
use crate::store::StateStore;
use crate::version::Version;

#[derive(Default)]
struct Inner {
    states: HashMap<(String, String), StateRecord>,
    outbox: Vec<OutboxEntry>,
    ledger: HashMap<String, LedgerEntry>,
}

/// In-memory implementation of [`StateStore`].
///
/// A single mutex over all three record sets makes every commit atomic,
/// matching the transactional guarantees of the PostgreSQL implementation.
#[derive(Clone, Default)]
pub struct InMemoryStateStore {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryStateStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of outbox entries, published or not.
    pub async fn outbox_len(&self) -> usize {
        self.inner.lock().await.outbox.len()
    }

    /// Returns the number of ledger entries.
    pub async fn ledger_len(&self) -> usize {
        self.inner.lock().await.ledger.len()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn fetch(&self, aggregate_type: &str, key: &str) -> Result<Option<StateRecord>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .states
            .get(&(aggregate_type.to_string(), key.to_string()))
            .cloned())
    }

    async fn commit(&self, commit: Commit) -> Result<Version> {
        let mut inner = self.inner.lock().await;
        let state_key = (
            commit.record.aggregate_type.clone(),
            commit.record.key.clone(),
        );

        let actual = inner.states.get(&state_key).map(|r| r.version);
        match (commit.expected_version, actual) {
            (None, None) => {}
            (Some(expected), Some(actual)) if expected == actual => {}
            (expected, actual) => {
                return Err(StorageError::ConcurrencyConflict {
                    aggregate_type: commit.record.aggregate_type,
                    key: commit.record.key,
                    expected: expected.unwrap_or_else(Version::initial),
                    actual: actual.unwrap_or_else(Version::initial),
                });
            }
        }

        if let Some(ref entry) = commit.ledger {
            if inner.ledger.contains_key(&entry.ledger_key()) {
                return Err(StorageError::AlreadyProcessed {
                    message_id: entry.message_id,
                    consumer: entry.consumer.clone(),
                });
            }
        }

        let version = commit.record.version;
        inner.states.insert(state_key, commit.record);
        inner.outbox.extend(commit.outbox);
        if let Some(entry) = commit.ledger {
            inner.ledger.insert(entry.ledger_key(), entry);
        }

        Ok(version)
    }

    async fn is_processed(&self, message_id: Uuid, consumer: &str) -> Result<bool> {
        let inner = self.inner.lock().await;
        Ok(inner.ledger.contains_key(&format!("{consumer}:{message_id}")))
    }

    async fn record_processed(&self, entry: LedgerEntry) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        let key = entry.ledger_key();
        if inner.ledger.contains_key(&key) {
            return Ok(false);
        }
        inner.ledger.insert(key, entry);
        Ok(true)
    }

    async fn unpublished(&self, limit: usize) -> Result<Vec<OutboxEntry>> {
        let inner = self.inner.lock().await;
        let mut pending: Vec<OutboxEntry> = inner
            .outbox
            .iter()
            .filter(|e| e.published_at.is_none())
            .cloned()
            .collect();
        pending.sort_by_key(|e| e.created_at);
        pending.truncate(limit);
        Ok(pending)
    }

    async fn mark_published(&self, entry_id: Uuid) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if let Some(entry) = inner.outbox.iter_mut().find(|e| e.id == entry_id) {
            entry.published_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn prune_published(&self, older_than: DateTime<Utc>) -> Result<u64> {
        let mut inner = self.inner.lock().await;
        let before = inner.outbox.len();
        inner
            .outbox
            .retain(|e| e.published_at.is_none_or(|at| at >= older_than));
        Ok((before - inner.outbox.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{CorrelationId, EventId};

    fn record(aggregate_type: &str, key: &str, version: i64) -> StateRecord {
        StateRecord {
            aggregate_type: aggregate_type.to_string(),
            key: key.to_string(),
            version: Version::new(version),
            state: serde_json::json!({"v": version}),
            updated_at: Utc::now(),
        }
    }

    fn outbox_entry(aggregate_type: &str, key: &str) -> OutboxEntry {
        OutboxEntry {
            id: Uuid::new_v4(),
            aggregate_id: key.to_string(),
            aggregate_type: aggregate_type.to_string(),
            aggregate_version: Version::first(),
            event_id: EventId::new(),
            event_type: "TestEvent".to_string(),
            payload: serde_json::json!({}),
            correlation_id: CorrelationId::new(),
            causation_id: None,
            tenant_id: None,
            created_at: Utc::now(),
            published_at: None,
        }
    }

    fn commit_new(aggregate_type: &str, key: &str) -> Commit {
        Commit {
            record: record(aggregate_type, key, 1),
            expected_version: None,
            outbox: vec![],
            ledger: None,
        }
    }

    #[tokio::test]
    async fn insert_and_fetch() {
        let store = InMemoryStateStore::new();
        store.commit(commit_new("cart", "guest-1")).await.unwrap();

        let fetched = store.fetch("cart", "guest-1").await.unwrap().unwrap();
        assert_eq!(fetched.version, Version::first());

        assert!(store.fetch("cart", "guest-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn conditioned_update_succeeds_on_matching_version() {
        let store = InMemoryStateStore::new();
        store.commit(commit_new("cart", "guest-1")).await.unwrap();

        let version = store
            .commit(Commit {
                record: record("cart", "guest-1", 2),
                expected_version: Some(Version::first()),
                outbox: vec![],
                ledger: None,
            })
            .await
            .unwrap();

        assert_eq!(version, Version::new(2));
    }

    #[tokio::test]
    async fn stale_version_conflicts() {
        let store = InMemoryStateStore::new();
        store.commit(commit_new("cart", "guest-1")).await.unwrap();

        let result = store
            .commit(Commit {
                record: record("cart", "guest-1", 2),
                expected_version: Some(Version::initial()),
                outbox: vec![],
                ledger: None,
            })
            .await;

        assert!(matches!(
            result,
            Err(StorageError::ConcurrencyConflict { .. })
        ));
    }

    #[tokio::test]
    async fn insert_of_existing_aggregate_conflicts() {
        let store = InMemoryStateStore::new();
        store.commit(commit_new("cart", "guest-1")).await.unwrap();

        let result = store.commit(commit_new("cart", "guest-1")).await;
        assert!(matches!(
            result,
            Err(StorageError::ConcurrencyConflict { .. })
        ));
    }

    #[tokio::test]
    async fn two_concurrent_saves_one_wins() {
        let store = InMemoryStateStore::new();
        store.commit(commit_new("order", "o-1")).await.unwrap();

        let update = |n: i64| Commit {
            record: record("order", "o-1", 2),
            expected_version: Some(Version::first()),
            outbox: vec![outbox_entry("order", &format!("o-{n}"))],
            ledger: None,
        };

        let (a, b) = tokio::join!(store.commit(update(1)), store.commit(update(2)));
        assert!(a.is_ok() != b.is_ok(), "exactly one save must win");
        assert_eq!(store.outbox_len().await, 1);
    }

    #[tokio::test]
    async fn commit_writes_state_outbox_and_ledger_together() {
        let store = InMemoryStateStore::new();
        let message_id = Uuid::new_v4();

        store
            .commit(Commit {
                record: record("inventory", "SKU-1", 1),
                expected_version: None,
                outbox: vec![outbox_entry("inventory", "SKU-1")],
                ledger: Some(LedgerEntry::new(message_id, "inventory-command-handler", "SetStock")),
            })
            .await
            .unwrap();

        assert_eq!(store.outbox_len().await, 1);
        assert!(store
            .is_processed(message_id, "inventory-command-handler")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn duplicate_ledger_key_rejects_whole_commit() {
        let store = InMemoryStateStore::new();
        let message_id = Uuid::new_v4();
        let ledger = LedgerEntry::new(message_id, "handler", "Cmd");

        store
            .commit(Commit {
                record: record("cart", "g-1", 1),
                expected_version: None,
                outbox: vec![],
                ledger: Some(ledger.clone()),
            })
            .await
            .unwrap();

        let result = store
            .commit(Commit {
                record: record("cart", "g-2", 1),
                expected_version: None,
                outbox: vec![outbox_entry("cart", "g-2")],
                ledger: Some(ledger),
            })
            .await;

        assert!(matches!(result, Err(StorageError::AlreadyProcessed { .. })));
        // Nothing from the rejected unit may be visible.
        assert!(store.fetch("cart", "g-2").await.unwrap().is_none());
        assert_eq!(store.outbox_len().await, 0);
    }

    #[tokio::test]
    async fn record_processed_is_once_only() {
        let store = InMemoryStateStore::new();
        let entry = LedgerEntry::new(Uuid::new_v4(), "projector", "OrderCreated");

        assert!(store.record_processed(entry.clone()).await.unwrap());
        assert!(!store.record_processed(entry).await.unwrap());
    }

    #[tokio::test]
    async fn unpublished_respects_order_and_limit() {
        let store = InMemoryStateStore::new();
        let mut first = outbox_entry("cart", "g-1");
        first.created_at = Utc::now() - chrono::Duration::seconds(10);
        let second = outbox_entry("cart", "g-1");

        store
            .commit(Commit {
                record: record("cart", "g-1", 1),
                expected_version: None,
                outbox: vec![second, first.clone()],
                ledger: None,
            })
            .await
            .unwrap();

        let pending = store.unpublished(1).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, first.id);
    }

    #[tokio::test]
    async fn mark_published_removes_from_pending() {
        let store = InMemoryStateStore::new();
        let entry = outbox_entry("cart", "g-1");
        let entry_id = entry.id;

        store
            .commit(Commit {
                record: record("cart", "g-1", 1),
                expected_version: None,
                outbox: vec![entry],
                ledger: None,
            })
            .await
            .unwrap();

        store.mark_published(entry_id).await.unwrap();
        assert!(store.unpublished(10).await.unwrap().is_empty());
        // Published entries are retained, not deleted.
        assert_eq!(store.outbox_len().await, 1);
    }

    #[tokio::test]
    async fn prune_published_respects_retention() {
        let store = InMemoryStateStore::new();
        let entry = outbox_entry("cart", "g-1");
        let entry_id = entry.id;

        store
            .commit(Commit {
                record: record("cart", "g-1", 1),
                expected_version: None,
                outbox: vec![entry],
                ledger: None,
            })
            .await
            .unwrap();

        // Unpublished entries are never pruned.
        assert_eq!(store.prune_published(Utc::now()).await.unwrap(), 0);

        store.mark_published(entry_id).await.unwrap();
        let pruned = store
            .prune_published(Utc::now() + chrono::Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(pruned, 1);
        assert_eq!(store.outbox_len().await, 0);
    }
}
