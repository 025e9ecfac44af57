//! Core state-store trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::records::{Commit, LedgerEntry, OutboxEntry, StateRecord};
use crate::{Result, Version};

/// Persistence contract shared by every bounded context.
///
/// A store holds three co-located record sets: current aggregate states,
/// the transactional outbox, and the processed-message ledger. The central
/// guarantee is [`commit`](StateStore::commit): state, outbox entries, and
/// the ledger entry land in one atomic unit or not at all.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Fetches the current state of an aggregate, if it exists.
    async fn fetch(&self, aggregate_type: &str, key: &str) -> Result<Option<StateRecord>>;

    /// Applies a unit of work atomically.
    ///
    /// When `expected_version` is `Some(v)`, the write is conditioned on the
    /// stored version still being `v` and fails with
    /// [`crate::StorageError::ConcurrencyConflict`] otherwise. When `None`,
    /// the aggregate is new and the commit inserts; an existing row is
    /// reported as a conflict. A duplicate ledger key fails the whole unit
    /// with [`crate::StorageError::AlreadyProcessed`].
    ///
    /// Returns the version written.
    async fn commit(&self, commit: Commit) -> Result<Version>;

    /// Returns true if the ledger holds `(consumer, message_id)`.
    async fn is_processed(&self, message_id: Uuid, consumer: &str) -> Result<bool>;

    /// Records a processed message outside of a state commit.
    ///
    /// Used by consumers with no aggregate write (query handlers, batch
    /// summaries, projectors). Returns false when the entry already existed.
    async fn record_processed(&self, entry: LedgerEntry) -> Result<bool>;

    /// Returns unpublished outbox entries, oldest first, up to `limit`.
    async fn unpublished(&self, limit: usize) -> Result<Vec<OutboxEntry>>;

    /// Marks an outbox entry as published.
    async fn mark_published(&self, entry_id: Uuid) -> Result<()>;

    /// Deletes published entries older than the given instant, returning the
    /// number removed. Supports the outbox retention window.
    async fn prune_published(&self, older_than: DateTime<Utc>) -> Result<u64>;
}
