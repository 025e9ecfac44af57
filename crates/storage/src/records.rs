//! Record types persisted by the state store.

use chrono::{DateTime, Utc};
use common::{CausationId, CorrelationId, EventId, TenantId};
use messaging::EventEnvelope;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::version::Version;

/// The persisted current state of one aggregate instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateRecord {
    /// The aggregate type (e.g., "cart", "order").
    pub aggregate_type: String,

    /// Stable identity of the aggregate within its type.
    pub key: String,

    /// Version of this state for optimistic concurrency.
    pub version: Version,

    /// The serialized aggregate state.
    pub state: serde_json::Value,

    /// When the state was last written.
    pub updated_at: DateTime<Utc>,
}

impl StateRecord {
    /// Creates a record from a serializable aggregate state.
    pub fn from_state<T: Serialize>(
        aggregate_type: impl Into<String>,
        key: impl Into<String>,
        version: Version,
        state: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            aggregate_type: aggregate_type.into(),
            key: key.into(),
            version,
            state: serde_json::to_value(state)?,
            updated_at: Utc::now(),
        })
    }

    /// Deserializes the state into a concrete type.
    pub fn into_state<T: for<'de> Deserialize<'de>>(self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.state)
    }
}

/// One outbox row per domain event, written in the same atomic operation as
/// the aggregate state that produced it.
///
/// Entries are never deleted eagerly; published entries may be pruned after
/// a retention window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxEntry {
    /// Row identity.
    pub id: Uuid,

    /// Identity of the aggregate that produced the event.
    pub aggregate_id: String,

    /// Type of the producing aggregate.
    pub aggregate_type: String,

    /// Aggregate version after the producing write.
    pub aggregate_version: Version,

    /// Identity of the event.
    pub event_id: EventId,

    /// Event type tag.
    pub event_type: String,

    /// Serialized event payload.
    pub payload: serde_json::Value,

    /// Business transaction this event belongs to.
    pub correlation_id: CorrelationId,

    /// Message that caused this event.
    pub causation_id: Option<CausationId>,

    /// Tenant scope, if any.
    pub tenant_id: Option<TenantId>,

    /// When the entry was written.
    pub created_at: DateTime<Utc>,

    /// When the relay published the entry; None while pending.
    pub published_at: Option<DateTime<Utc>>,
}

impl OutboxEntry {
    /// Returns true if the relay has published this entry.
    pub fn is_published(&self) -> bool {
        self.published_at.is_some()
    }

    /// Builds the wire envelope published for this entry.
    pub fn to_event_envelope(&self) -> EventEnvelope {
        let mut builder = EventEnvelope::builder()
            .event_id(self.event_id)
            .event_type(self.event_type.clone())
            .aggregate_id(self.aggregate_id.clone())
            .aggregate_type(self.aggregate_type.clone())
            .aggregate_version(self.aggregate_version.as_i64())
            .correlation_id(self.correlation_id)
            .occurred_at(self.created_at)
            .payload_raw(self.payload.clone());
        if let Some(causation_id) = self.causation_id {
            builder = builder.causation_id(causation_id);
        }
        if let Some(ref tenant_id) = self.tenant_id {
            builder = builder.tenant_id(tenant_id.clone());
        }
        builder.build()
    }
}

/// A durable record that a consumer fully applied a message.
///
/// The uniqueness of `(consumer, message_id)` is the idempotency mechanism:
/// at-least-once delivery becomes effectively-once processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// The processed message's identity (command ID or event ID).
    pub message_id: Uuid,

    /// Identity of the consumer that processed it.
    pub consumer: String,

    /// Message type tag, kept for audit.
    pub message_type: String,

    /// When the message was processed.
    pub processed_at: DateTime<Utc>,

    /// Short processing outcome note, kept for audit.
    pub result: Option<String>,
}

impl LedgerEntry {
    /// Creates a ledger entry processed now.
    pub fn new(
        message_id: Uuid,
        consumer: impl Into<String>,
        message_type: impl Into<String>,
    ) -> Self {
        Self {
            message_id,
            consumer: consumer.into(),
            message_type: message_type.into(),
            processed_at: Utc::now(),
            result: None,
        }
    }

    /// Attaches a processing outcome note.
    pub fn with_result(mut self, result: impl Into<String>) -> Self {
        self.result = Some(result.into());
        self
    }

    /// Returns the composite ledger key `consumer:messageId`.
    pub fn ledger_key(&self) -> String {
        format!("{}:{}", self.consumer, self.message_id)
    }
}

/// A unit of work applied atomically by [`crate::StateStore::commit`].
#[derive(Debug, Clone)]
pub struct Commit {
    /// The new aggregate state.
    pub record: StateRecord,

    /// Expected stored version. `None` means the aggregate was never
    /// persisted and the commit performs an insert.
    pub expected_version: Option<Version>,

    /// Outbox entries for the events produced by this state change.
    pub outbox: Vec<OutboxEntry>,

    /// Ledger entry recording the message that caused this commit.
    pub ledger: Option<LedgerEntry>,
}
