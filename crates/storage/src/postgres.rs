//! PostgreSQL-backed state store implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CausationId, CorrelationId, EventId, TenantId};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::records::{Commit, LedgerEntry, OutboxEntry, StateRecord};
use crate::store::StateStore;
use crate::version::Version;

/// PostgreSQL implementation of [`StateStore`].
///
/// Every [`commit`](StateStore::commit) runs in a single transaction, so the
/// aggregate state, its outbox entries, and the ledger entry are applied
/// together or not at all.
#[derive(Clone)]
pub struct PostgresStateStore {
    pool: PgPool,
}

impl PostgresStateStore {
    /// Creates a new PostgreSQL state store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_state(row: PgRow) -> Result<StateRecord> {
        Ok(StateRecord {
            aggregate_type: row.try_get("aggregate_type")?,
            key: row.try_get("key")?,
            version: Version::new(row.try_get("version")?),
            state: row.try_get("state")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_outbox(row: PgRow) -> Result<OutboxEntry> {
        Ok(OutboxEntry {
            id: row.try_get("id")?,
            aggregate_id: row.try_get("aggregate_id")?,
            aggregate_type: row.try_get("aggregate_type")?,
            aggregate_version: Version::new(row.try_get("aggregate_version")?),
            event_id: EventId::from_uuid(row.try_get::<Uuid, _>("event_id")?),
            event_type: row.try_get("event_type")?,
            payload: row.try_get("payload")?,
            correlation_id: CorrelationId::from_uuid(row.try_get::<Uuid, _>("correlation_id")?),
            causation_id: row
                .try_get::<Option<Uuid>, _>("causation_id")?
                .map(CausationId::from_uuid),
            tenant_id: row
                .try_get::<Option<String>, _>("tenant_id")?
                .map(TenantId::new),
            created_at: row.try_get("created_at")?,
            published_at: row.try_get("published_at")?,
        })
    }
}

#[async_trait]
impl StateStore for PostgresStateStore {
    async fn fetch(&self, aggregate_type: &str, key: &str) -> Result<Option<StateRecord>> {
        let row = sqlx::query(
            r#"
            SELECT aggregate_type, key, version, state, updated_at
            FROM aggregates
            WHERE aggregate_type = $1 AND key = $2
            "#,
        )
        .bind(aggregate_type)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_state).transpose()
    }

    async fn commit(&self, commit: Commit) -> Result<Version> {
        let record = &commit.record;
        let mut tx = self.pool.begin().await?;

        // Conditioned write: lock the current row and compare versions.
        let actual: Option<i64> = sqlx::query_scalar(
            "SELECT version FROM aggregates WHERE aggregate_type = $1 AND key = $2 FOR UPDATE",
        )
        .bind(&record.aggregate_type)
        .bind(&record.key)
        .fetch_optional(&mut *tx)
        .await?;

        match (commit.expected_version, actual) {
            (None, None) => {}
            (Some(expected), Some(actual)) if expected.as_i64() == actual => {}
            (expected, actual) => {
                return Err(StorageError::ConcurrencyConflict {
                    aggregate_type: record.aggregate_type.clone(),
                    key: record.key.clone(),
                    expected: expected.unwrap_or_else(Version::initial),
                    actual: actual.map(Version::new).unwrap_or_else(Version::initial),
                });
            }
        }

        if commit.expected_version.is_none() {
            sqlx::query(
                r#"
                INSERT INTO aggregates (aggregate_type, key, version, state, updated_at)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(&record.aggregate_type)
            .bind(&record.key)
            .bind(record.version.as_i64())
            .bind(&record.state)
            .bind(record.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                // Two racing inserts: the loser hits the primary key.
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.constraint() == Some("aggregates_pkey")
                {
                    return StorageError::ConcurrencyConflict {
                        aggregate_type: record.aggregate_type.clone(),
                        key: record.key.clone(),
                        expected: Version::initial(),
                        actual: record.version,
                    };
                }
                StorageError::Database(e)
            })?;
        } else {
            sqlx::query(
                r#"
                UPDATE aggregates
                SET version = $3, state = $4, updated_at = $5
                WHERE aggregate_type = $1 AND key = $2
                "#,
            )
            .bind(&record.aggregate_type)
            .bind(&record.key)
            .bind(record.version.as_i64())
            .bind(&record.state)
            .bind(record.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        for entry in &commit.outbox {
            sqlx::query(
                r#"
                INSERT INTO outbox (id, aggregate_id, aggregate_type, aggregate_version,
                                    event_id, event_type, payload, correlation_id,
                                    causation_id, tenant_id, created_at, published_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                "#,
            )
            .bind(entry.id)
            .bind(&entry.aggregate_id)
            .bind(&entry.aggregate_type)
            .bind(entry.aggregate_version.as_i64())
            .bind(entry.event_id.as_uuid())
            .bind(&entry.event_type)
            .bind(&entry.payload)
            .bind(entry.correlation_id.as_uuid())
            .bind(entry.causation_id.map(|id| id.as_uuid()))
            .bind(entry.tenant_id.as_ref().map(|t| t.as_str()))
            .bind(entry.created_at)
            .bind(entry.published_at)
            .execute(&mut *tx)
            .await?;
        }

        if let Some(ref ledger) = commit.ledger {
            sqlx::query(
                r#"
                INSERT INTO processed_messages (id, message_id, consumer, message_type, processed_at, result)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(ledger.ledger_key())
            .bind(ledger.message_id)
            .bind(&ledger.consumer)
            .bind(&ledger.message_type)
            .bind(ledger.processed_at)
            .bind(&ledger.result)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.constraint() == Some("processed_messages_pkey")
                {
                    return StorageError::AlreadyProcessed {
                        message_id: ledger.message_id,
                        consumer: ledger.consumer.clone(),
                    };
                }
                StorageError::Database(e)
            })?;
        }

        tx.commit().await?;
        Ok(record.version)
    }

    async fn is_processed(&self, message_id: Uuid, consumer: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM processed_messages WHERE message_id = $1 AND consumer = $2)",
        )
        .bind(message_id)
        .bind(consumer)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn record_processed(&self, entry: LedgerEntry) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO processed_messages (id, message_id, consumer, message_type, processed_at, result)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(entry.ledger_key())
        .bind(entry.message_id)
        .bind(&entry.consumer)
        .bind(&entry.message_type)
        .bind(entry.processed_at)
        .bind(&entry.result)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn unpublished(&self, limit: usize) -> Result<Vec<OutboxEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, aggregate_id, aggregate_type, aggregate_version, event_id, event_type,
                   payload, correlation_id, causation_id, tenant_id, created_at, published_at
            FROM outbox
            WHERE published_at IS NULL
            ORDER BY created_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_outbox).collect()
    }

    async fn mark_published(&self, entry_id: Uuid) -> Result<()> {
        sqlx::query("UPDATE outbox SET published_at = $2 WHERE id = $1")
            .bind(entry_id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn prune_published(&self, older_than: DateTime<Utc>) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM outbox WHERE published_at IS NOT NULL AND published_at < $1")
                .bind(older_than)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected())
    }
}
