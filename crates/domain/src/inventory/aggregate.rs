//! Inventory item aggregate.

use std::collections::BTreeMap;

use common::{OrderId, ProductId};
use serde::{Deserialize, Serialize};
use storage::Version;

use crate::aggregate::Aggregate;

use super::InventoryError;
use super::events::{InventoryEvent, StockDeductedData, StockReleasedData, StockSetData};

/// Why a stock level was adjusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AdjustmentReason {
    /// First stock intake for the product.
    Initial,

    /// Physical recount correction.
    Recount,

    /// Damaged or lost units written off.
    Damaged,

    /// Operator adjustment with no specific cause.
    #[default]
    Manual,
}

/// Inventory item aggregate root, keyed by product SKU.
///
/// Deductions are tracked per order so a redelivered deduct command is a
/// no-op instead of a double deduction.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct InventoryItem {
    /// SKU identity, None before first stock intake.
    product_id: Option<ProductId>,

    /// Units available for sale.
    available: u32,

    /// Units deducted per order, keyed by order ID string.
    deductions: BTreeMap<String, u32>,

    /// Current version for optimistic concurrency.
    #[serde(default)]
    version: Version,

    /// Events produced by the last batch of behavior calls.
    #[serde(skip)]
    uncommitted: Vec<InventoryEvent>,
}

impl Aggregate for InventoryItem {
    type Event = InventoryEvent;
    type Error = InventoryError;

    fn aggregate_type() -> &'static str {
        super::AGGREGATE_TYPE
    }

    fn key(&self) -> Option<String> {
        self.product_id.as_ref().map(|id| id.as_str().to_string())
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn record(&mut self, event: Self::Event) {
        self.uncommitted.push(event);
    }

    fn uncommitted(&self) -> &[Self::Event] {
        &self.uncommitted
    }

    fn take_uncommitted(&mut self) -> Vec<Self::Event> {
        std::mem::take(&mut self.uncommitted)
    }
}

// Query methods
impl InventoryItem {
    /// Returns the units available for sale.
    pub fn available(&self) -> u32 {
        self.available
    }

    /// Returns true if this item exists and can satisfy the quantity.
    pub fn can_satisfy(&self, quantity: u32) -> bool {
        self.product_id.is_some() && self.available >= quantity
    }

    /// Returns the units already deducted for an order, if any.
    pub fn deducted_for(&self, order_id: OrderId) -> Option<u32> {
        self.deductions.get(&order_id.to_string()).copied()
    }
}

// Behaviors
impl InventoryItem {
    /// Sets the available stock level, creating the item on first use.
    pub fn set_stock(
        &mut self,
        product_id: ProductId,
        quantity: u32,
        reason: AdjustmentReason,
    ) -> Result<(), InventoryError> {
        if self.product_id.is_none() {
            self.product_id = Some(product_id.clone());
        }

        self.available = quantity;
        self.record(InventoryEvent::StockSet(StockSetData {
            product_id,
            quantity,
            reason,
        }));
        Ok(())
    }

    /// Deducts units for one order line.
    ///
    /// A repeated deduction for the same order is a no-op, which makes
    /// redelivered deduct commands safe.
    pub fn deduct_for_order(
        &mut self,
        order_id: OrderId,
        quantity: u32,
    ) -> Result<(), InventoryError> {
        let Some(product_id) = self.product_id.clone() else {
            return Err(InventoryError::NotFound {
                product_id: String::new(),
            });
        };

        let order_key = order_id.to_string();
        if self.deductions.contains_key(&order_key) {
            return Ok(());
        }

        if self.available < quantity {
            return Err(InventoryError::InsufficientStock {
                product_id: product_id.to_string(),
                requested: quantity,
                available: self.available,
            });
        }

        self.available -= quantity;
        self.deductions.insert(order_key, quantity);
        self.record(InventoryEvent::StockDeducted(StockDeductedData {
            product_id,
            order_id,
            quantity,
            remaining: self.available,
        }));
        Ok(())
    }

    /// Returns a previous deduction for an order; a no-op when none exists.
    pub fn release_for_order(&mut self, order_id: OrderId) -> Result<(), InventoryError> {
        let Some(product_id) = self.product_id.clone() else {
            return Ok(());
        };

        let Some(quantity) = self.deductions.remove(&order_id.to_string()) else {
            return Ok(());
        };

        self.available += quantity;
        self.record(InventoryEvent::StockReleased(StockReleasedData {
            product_id,
            order_id,
            quantity,
            remaining: self.available,
        }));
        Ok(())
    }
}
