//! Per-SKU stock availability view.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::ProductId;
use domain::inventory::InventoryEvent;
use messaging::EventEnvelope;
use storage::{LedgerEntry, StateStore};
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::Projection;

/// Read model over the inventory aggregate's fact events, answering "how
/// many units of this SKU are available".
pub struct StockLevelsView<S> {
    ledger: Arc<S>,
    levels: RwLock<HashMap<ProductId, u32>>,
}

impl<S: StateStore> StockLevelsView<S> {
    /// Creates an empty view over the given ledger store.
    pub fn new(ledger: Arc<S>) -> Self {
        Self {
            ledger,
            levels: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the available quantity for a product, if known.
    pub async fn get(&self, product_id: &ProductId) -> Option<u32> {
        self.levels.read().await.get(product_id).copied()
    }

    /// Returns the number of tracked SKUs.
    pub async fn len(&self) -> usize {
        self.levels.read().await.len()
    }

    /// Returns true if no SKUs are tracked.
    pub async fn is_empty(&self) -> bool {
        self.levels.read().await.is_empty()
    }

    async fn apply(&self, event: InventoryEvent) {
        let mut levels = self.levels.write().await;
        match event {
            InventoryEvent::StockSet(data) => {
                levels.insert(data.product_id, data.quantity);
            }
            InventoryEvent::StockDeducted(data) => {
                levels.insert(data.product_id, data.remaining);
            }
            InventoryEvent::StockReleased(data) => {
                levels.insert(data.product_id, data.remaining);
            }
        }
    }
}

#[async_trait]
impl<S: StateStore> Projection for StockLevelsView<S> {
    fn name(&self) -> &'static str {
        "stock-levels-view"
    }

    fn subscriptions(&self) -> &'static [&'static str] {
        &[
            "inventory.StockSet",
            "inventory.StockDeducted",
            "inventory.StockReleased",
        ]
    }

    async fn handle(&self, envelope: &EventEnvelope) -> Result<()> {
        if self
            .ledger
            .is_processed(envelope.event_id.as_uuid(), self.name())
            .await?
        {
            return Ok(());
        }

        let event: InventoryEvent = envelope.payload_as()?;
        self.apply(event).await;

        self.ledger
            .record_processed(LedgerEntry::new(
                envelope.event_id.as_uuid(),
                self.name(),
                envelope.event_type.clone(),
            ))
            .await?;
        Ok(())
    }
}
