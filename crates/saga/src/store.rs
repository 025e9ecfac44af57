//! Durable saga state storage.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::OrderId;
use sqlx::{PgPool, Row};
use tokio::sync::RwLock;

use crate::error::Result;
use crate::instance::CheckoutSaga;

/// Durable store for in-flight checkout sagas, keyed by order ID.
///
/// Saga progress must survive process restarts and support multiple
/// orchestrator instances; an unshared in-memory map is only acceptable for
/// tests and single-process deployments.
#[async_trait]
pub trait SagaStore: Send + Sync {
    /// Loads the saga for an order, if one is in flight or failed.
    async fn load(&self, order_id: OrderId) -> Result<Option<CheckoutSaga>>;

    /// Writes the saga state.
    async fn save(&self, saga: &CheckoutSaga) -> Result<()>;

    /// Deletes the saga for an order.
    async fn delete(&self, order_id: OrderId) -> Result<()>;
}

/// In-memory saga store for tests and single-process deployments.
#[derive(Clone, Default)]
pub struct InMemorySagaStore {
    sagas: Arc<RwLock<HashMap<OrderId, CheckoutSaga>>>,
}

impl InMemorySagaStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored sagas.
    pub async fn len(&self) -> usize {
        self.sagas.read().await.len()
    }

    /// Returns true if no sagas are stored.
    pub async fn is_empty(&self) -> bool {
        self.sagas.read().await.is_empty()
    }
}

#[async_trait]
impl SagaStore for InMemorySagaStore {
    async fn load(&self, order_id: OrderId) -> Result<Option<CheckoutSaga>> {
        Ok(self.sagas.read().await.get(&order_id).cloned())
    }

    async fn save(&self, saga: &CheckoutSaga) -> Result<()> {
        self.sagas.write().await.insert(saga.order_id(), saga.clone());
        Ok(())
    }

    async fn delete(&self, order_id: OrderId) -> Result<()> {
        self.sagas.write().await.remove(&order_id);
        Ok(())
    }
}

/// PostgreSQL-backed saga store.
#[derive(Clone)]
pub struct PostgresSagaStore {
    pool: PgPool,
}

impl PostgresSagaStore {
    /// Creates a new PostgreSQL saga store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SagaStore for PostgresSagaStore {
    async fn load(&self, order_id: OrderId) -> Result<Option<CheckoutSaga>> {
        let row = sqlx::query("SELECT state FROM saga_instances WHERE order_id = $1")
            .bind(order_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let state: serde_json::Value = row.try_get("state")?;
                Ok(Some(serde_json::from_value(state)?))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, saga: &CheckoutSaga) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO saga_instances (order_id, state, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (order_id) DO UPDATE SET
                state = EXCLUDED.state,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(saga.order_id().as_uuid())
        .bind(serde_json::to_value(saga)?)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, order_id: OrderId) -> Result<()> {
        sqlx::query("DELETE FROM saga_instances WHERE order_id = $1")
            .bind(order_id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::GuestToken;
    use domain::checkout::CheckoutRequested;
    use domain::order::{CustomerInfo, ShippingAddress};

    fn saga(key: &str) -> CheckoutSaga {
        let (saga, _) = CheckoutSaga::start(CheckoutRequested {
            order_id: OrderId::for_idempotency_key(key),
            guest_token: GuestToken::new("g-1"),
            customer: CustomerInfo {
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                email: "ada@example.com".to_string(),
                phone: "555-0100".to_string(),
            },
            address: ShippingAddress {
                address_line1: "1 Main St".to_string(),
                address_line2: None,
                city: "Springfield".to_string(),
                state: "IL".to_string(),
                zip_code: "62701".to_string(),
                country: "US".to_string(),
            },
            idempotency_key: key.to_string(),
        });
        saga
    }

    #[tokio::test]
    async fn save_load_delete() {
        let store = InMemorySagaStore::new();
        let saga = saga("key-1");
        let order_id = saga.order_id();

        assert!(store.load(order_id).await.unwrap().is_none());

        store.save(&saga).await.unwrap();
        let loaded = store.load(order_id).await.unwrap().unwrap();
        assert_eq!(loaded.order_id(), order_id);

        store.delete(order_id).await.unwrap();
        assert!(store.load(order_id).await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn save_overwrites_previous_state() {
        let store = InMemorySagaStore::new();
        let mut saga = saga("key-1");
        store.save(&saga).await.unwrap();

        saga.on_cart_snapshot([(common::ProductId::new("SKU-1"), 1)].into_iter().collect());
        store.save(&saga).await.unwrap();

        let loaded = store.load(saga.order_id()).await.unwrap().unwrap();
        assert_eq!(loaded.step(), saga.step());
        assert_eq!(store.len().await, 1);
    }
}
