//! Command processing infrastructure.

use std::sync::Arc;

use chrono::Utc;
use common::{CommandId, CorrelationId, EventId, TenantId};
use messaging::{CommandEnvelope, CommandPayload};
use storage::{Commit, LedgerEntry, OutboxEntry, StateRecord, StateStore, StorageError, Version};
use uuid::Uuid;

use crate::aggregate::{Aggregate, DomainEvent};
use crate::error::DomainError;

/// Bounded number of reload-and-retry attempts after a version conflict.
const MAX_ATTEMPTS: usize = 3;

/// Cross-cutting metadata of the command being processed.
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// Identity of the command, used as the ledger key.
    pub command_id: CommandId,

    /// Command type tag, recorded in the ledger for audit.
    pub command_type: &'static str,

    /// Business transaction the command belongs to; stamped onto every
    /// produced outbox entry.
    pub correlation_id: CorrelationId,

    /// Tenant scope, if any.
    pub tenant_id: Option<TenantId>,
}

impl CommandContext {
    /// Extracts the context from a command envelope.
    pub fn from_envelope<C: CommandPayload>(envelope: &CommandEnvelope<C>) -> Self {
        Self {
            command_id: envelope.command_id,
            command_type: envelope.command.command_type(),
            correlation_id: envelope.correlation_id,
            tenant_id: envelope.tenant_id.clone(),
        }
    }
}

/// Result of executing a command against an aggregate.
#[derive(Debug)]
pub enum Outcome<A: Aggregate> {
    /// The command was applied (possibly producing no events).
    Applied {
        /// The aggregate after the command.
        aggregate: A,
        /// The events that were produced and handed to the outbox.
        events: Vec<A::Event>,
        /// The version written.
        version: Version,
    },

    /// The ledger already held this command; nothing was done.
    Duplicate,
}

impl<A: Aggregate> Outcome<A> {
    /// Returns true if this outcome is a duplicate skip.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Outcome::Duplicate)
    }
}

/// Executes commands against aggregates with idempotency and optimistic
/// concurrency.
///
/// Each execution: consults the ledger, loads the aggregate, invokes exactly
/// one behavior, then commits the new state, one outbox entry per produced
/// event, and the ledger entry in a single atomic unit. A version conflict
/// re-reads and re-runs the whole command a bounded number of times.
pub struct CommandProcessor<S> {
    store: Arc<S>,
    consumer: &'static str,
}

impl<S: StateStore> CommandProcessor<S> {
    /// Creates a processor for the given consumer identity.
    pub fn new(store: Arc<S>, consumer: &'static str) -> Self {
        Self { store, consumer }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Returns this processor's consumer identity.
    pub fn consumer(&self) -> &'static str {
        self.consumer
    }

    /// Loads an aggregate, returning None if it was never persisted.
    pub async fn load<A: Aggregate>(&self, key: &str) -> Result<Option<A>, DomainError> {
        match self.store.fetch(A::aggregate_type(), key).await? {
            Some(record) => {
                let version = record.version;
                let mut aggregate: A = record.into_state()?;
                aggregate.set_version(version);
                Ok(Some(aggregate))
            }
            None => Ok(None),
        }
    }

    /// Executes a command with ledger-backed idempotency.
    pub async fn execute<A, F>(
        &self,
        key: &str,
        ctx: &CommandContext,
        command_fn: F,
    ) -> Result<Outcome<A>, DomainError>
    where
        A: Aggregate,
        F: Fn(&mut A) -> Result<(), A::Error>,
        DomainError: From<A::Error>,
    {
        if self
            .store
            .is_processed(ctx.command_id.as_uuid(), self.consumer)
            .await?
        {
            metrics::counter!("commands_duplicate_total").increment(1);
            tracing::debug!(
                command_id = %ctx.command_id,
                consumer = self.consumer,
                "duplicate command discarded"
            );
            return Ok(Outcome::Duplicate);
        }

        self.run(key, ctx, true, command_fn).await
    }

    /// Executes one sub-operation of a fanned-out command without touching
    /// the ledger.
    ///
    /// Used when a single command spans several aggregates: the ledger entry
    /// cannot be atomic with more than one commit, so redelivery safety must
    /// come from the aggregate's own state.
    pub async fn execute_unrecorded<A, F>(
        &self,
        key: &str,
        ctx: &CommandContext,
        command_fn: F,
    ) -> Result<Outcome<A>, DomainError>
    where
        A: Aggregate,
        F: Fn(&mut A) -> Result<(), A::Error>,
        DomainError: From<A::Error>,
    {
        self.run(key, ctx, false, command_fn).await
    }

    async fn run<A, F>(
        &self,
        key: &str,
        ctx: &CommandContext,
        with_ledger: bool,
        command_fn: F,
    ) -> Result<Outcome<A>, DomainError>
    where
        A: Aggregate,
        F: Fn(&mut A) -> Result<(), A::Error>,
        DomainError: From<A::Error>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;

            let (mut aggregate, expected) = match self.store.fetch(A::aggregate_type(), key).await?
            {
                Some(record) => {
                    let version = record.version;
                    let mut aggregate: A = record.into_state()?;
                    aggregate.set_version(version);
                    (aggregate, Some(version))
                }
                None => (A::default(), None),
            };

            command_fn(&mut aggregate)?;

            let events = aggregate.take_uncommitted();
            if events.is_empty() {
                // Nothing changed; still remember the command so redelivery
                // short-circuits.
                if with_ledger {
                    self.store
                        .record_processed(LedgerEntry::new(
                            ctx.command_id.as_uuid(),
                            self.consumer,
                            ctx.command_type,
                        ))
                        .await?;
                }
                let version = expected.unwrap_or_else(Version::initial);
                return Ok(Outcome::Applied {
                    aggregate,
                    events,
                    version,
                });
            }

            let new_version = expected.unwrap_or_else(Version::initial).next();
            aggregate.set_version(new_version);

            let record = StateRecord::from_state(A::aggregate_type(), key, new_version, &aggregate)?;
            let outbox = build_outbox_entries::<A>(key, new_version, &events, ctx)?;
            let ledger = with_ledger.then(|| {
                LedgerEntry::new(ctx.command_id.as_uuid(), self.consumer, ctx.command_type)
            });

            match self
                .store
                .commit(Commit {
                    record,
                    expected_version: expected,
                    outbox,
                    ledger,
                })
                .await
            {
                Ok(version) => {
                    metrics::counter!("commands_processed_total").increment(1);
                    return Ok(Outcome::Applied {
                        aggregate,
                        events,
                        version,
                    });
                }
                Err(StorageError::ConcurrencyConflict { .. }) if attempt < MAX_ATTEMPTS => {
                    metrics::counter!("commands_conflicts_total").increment(1);
                    tracing::debug!(key, attempt, "version conflict, re-reading and retrying");
                    continue;
                }
                Err(StorageError::AlreadyProcessed { .. }) => {
                    // A concurrent delivery of the same command won the race.
                    metrics::counter!("commands_duplicate_total").increment(1);
                    return Ok(Outcome::Duplicate);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

fn build_outbox_entries<A: Aggregate>(
    key: &str,
    version: Version,
    events: &[A::Event],
    ctx: &CommandContext,
) -> Result<Vec<OutboxEntry>, serde_json::Error> {
    events
        .iter()
        .map(|event| {
            Ok(OutboxEntry {
                id: Uuid::new_v4(),
                aggregate_id: key.to_string(),
                aggregate_type: A::aggregate_type().to_string(),
                aggregate_version: version,
                event_id: EventId::new(),
                event_type: event.event_type().to_string(),
                payload: serde_json::to_value(event)?,
                correlation_id: ctx.correlation_id,
                causation_id: Some(ctx.command_id.into()),
                tenant_id: ctx.tenant_id.clone(),
                created_at: Utc::now(),
                published_at: None,
            })
        })
        .collect()
}
