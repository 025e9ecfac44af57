//! Inventory domain events.

use std::collections::BTreeMap;

use common::{OrderId, ProductId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

use super::aggregate::AdjustmentReason;

/// Events that can occur on an inventory item aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum InventoryEvent {
    /// Available stock was set by an adjustment.
    StockSet(StockSetData),

    /// Stock was deducted for one order line.
    StockDeducted(StockDeductedData),

    /// A previous deduction was released back.
    StockReleased(StockReleasedData),
}

impl DomainEvent for InventoryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InventoryEvent::StockSet(_) => "StockSet",
            InventoryEvent::StockDeducted(_) => "StockDeducted",
            InventoryEvent::StockReleased(_) => "StockReleased",
        }
    }
}

/// Data for StockSet event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockSetData {
    /// The product whose stock was set.
    pub product_id: ProductId,

    /// New available quantity.
    pub quantity: u32,

    /// Why the stock level changed.
    pub reason: AdjustmentReason,
}

/// Data for StockDeducted event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockDeductedData {
    /// The product deducted from.
    pub product_id: ProductId,

    /// The order the deduction belongs to.
    pub order_id: OrderId,

    /// Units deducted.
    pub quantity: u32,

    /// Available quantity after the deduction.
    pub remaining: u32,
}

/// Data for StockReleased event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockReleasedData {
    /// The product released back to.
    pub product_id: ProductId,

    /// The order whose deduction was released.
    pub order_id: OrderId,

    /// Units returned.
    pub quantity: u32,

    /// Available quantity after the release.
    pub remaining: u32,
}

/// Report event answering a batch stock validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockBatchValidated {
    /// The checkout transaction the validation belongs to.
    pub order_id: OrderId,

    /// True when every requested line can be satisfied.
    pub success: bool,

    /// Reason for the first failing line, when `success` is false.
    pub failure_reason: Option<String>,
}

impl DomainEvent for StockBatchValidated {
    fn event_type(&self) -> &'static str {
        "StockBatchValidated"
    }
}

/// Report event published once every line of an order has been deducted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockDeductedForOrder {
    /// The order the deductions belong to.
    pub order_id: OrderId,

    /// Deducted quantity per product.
    pub items: BTreeMap<ProductId, u32>,
}

impl DomainEvent for StockDeductedForOrder {
    fn event_type(&self) -> &'static str {
        "StockDeductedForOrder"
    }
}

/// Report event published when a batch deduction could not complete.
///
/// Carries the lines that were already deducted so the saga can compensate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockDeductionRejected {
    /// The order the failed deduction belongs to.
    pub order_id: OrderId,

    /// Why the batch was rejected.
    pub reason: String,

    /// Lines deducted before the failure, per product.
    pub deducted: BTreeMap<ProductId, u32>,
}

impl DomainEvent for StockDeductionRejected {
    fn event_type(&self) -> &'static str {
        "StockDeductionRejected"
    }
}
