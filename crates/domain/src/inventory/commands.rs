//! Inventory commands: the closed set of messages accepted on
//! `inventory.commands`.

use std::collections::BTreeMap;

use common::{OrderId, ProductId};
use messaging::CommandPayload;
use serde::{Deserialize, Serialize};

use super::aggregate::AdjustmentReason;

/// Commands accepted by the inventory context.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum InventoryCommand {
    /// Set the available stock of a product.
    SetStock {
        /// Target product.
        product_id: ProductId,
        /// New available quantity.
        quantity: u32,
        /// Why the stock level changed.
        reason: AdjustmentReason,
    },

    /// Check that every requested line can be satisfied, without mutating.
    ValidateStockBatch {
        /// The checkout transaction requesting the validation.
        order_id: OrderId,
        /// Requested quantity per product.
        items: BTreeMap<ProductId, u32>,
    },

    /// Deduct every line for an order, joining all sub-deductions before
    /// reporting one outcome.
    DeductStockForOrder {
        /// The order being fulfilled.
        order_id: OrderId,
        /// Requested quantity per product.
        items: BTreeMap<ProductId, u32>,
    },

    /// Release previously deducted lines (compensation).
    ReleaseStockForOrder {
        /// The order whose deductions to release.
        order_id: OrderId,
        /// Products to release.
        items: BTreeMap<ProductId, u32>,
    },
}

impl CommandPayload for InventoryCommand {
    fn command_type(&self) -> &'static str {
        match self {
            InventoryCommand::SetStock { .. } => "SetStock",
            InventoryCommand::ValidateStockBatch { .. } => "ValidateStockBatch",
            InventoryCommand::DeductStockForOrder { .. } => "DeductStockForOrder",
            InventoryCommand::ReleaseStockForOrder { .. } => "ReleaseStockForOrder",
        }
    }
}
