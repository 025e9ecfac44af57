//! Catalog commands: the closed set of messages accepted on `catalog.commands`.

use common::{Money, OrderId, ProductId};
use messaging::CommandPayload;
use serde::{Deserialize, Serialize};

/// Commands accepted by the product catalog context.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CatalogCommand {
    /// Create a product.
    CreateProduct {
        /// SKU of the new product.
        product_id: ProductId,
        /// Display name.
        name: String,
        /// Description text.
        description: String,
        /// Initial unit price.
        unit_price: Money,
    },

    /// Update name and description.
    UpdateProductDetails {
        /// Target product.
        product_id: ProductId,
        /// New display name.
        name: String,
        /// New description text.
        description: String,
    },

    /// Change the unit price.
    ChangeProductPrice {
        /// Target product.
        product_id: ProductId,
        /// New unit price.
        new_price: Money,
    },

    /// Make the product purchasable.
    ActivateProduct {
        /// Target product.
        product_id: ProductId,
    },

    /// Withdraw the product from sale.
    DeactivateProduct {
        /// Target product.
        product_id: ProductId,
    },

    /// Delete the product.
    DeleteProduct {
        /// Target product.
        product_id: ProductId,
    },

    /// Resolve point-in-time snapshots for a checkout transaction.
    GetProductSnapshots {
        /// The checkout transaction requesting the snapshots.
        order_id: OrderId,
        /// Products to resolve.
        product_ids: Vec<ProductId>,
    },
}

impl CommandPayload for CatalogCommand {
    fn command_type(&self) -> &'static str {
        match self {
            CatalogCommand::CreateProduct { .. } => "CreateProduct",
            CatalogCommand::UpdateProductDetails { .. } => "UpdateProductDetails",
            CatalogCommand::ChangeProductPrice { .. } => "ChangeProductPrice",
            CatalogCommand::ActivateProduct { .. } => "ActivateProduct",
            CatalogCommand::DeactivateProduct { .. } => "DeactivateProduct",
            CatalogCommand::DeleteProduct { .. } => "DeleteProduct",
            CatalogCommand::GetProductSnapshots { .. } => "GetProductSnapshots",
        }
    }
}
