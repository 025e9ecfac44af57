//! Product aggregate.

use common::{Money, ProductId};
use serde::{Deserialize, Serialize};
use storage::Version;

use crate::aggregate::Aggregate;

use super::ProductError;
use super::events::{
    ProductCreatedData, ProductDetailsUpdatedData, ProductEvent, ProductPriceChangedData,
    ProductSnapshot,
};

/// Lifecycle status of a catalog product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ProductStatus {
    /// Purchasable.
    #[default]
    Active,

    /// Withdrawn from sale but still resolvable.
    Inactive,

    /// Deleted; accepts no further operations (terminal).
    Deleted,
}

impl ProductStatus {
    /// Returns true if no further operations are accepted.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProductStatus::Deleted)
    }
}

/// Product aggregate root, keyed by SKU.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Product {
    /// SKU identity, None before creation.
    id: Option<ProductId>,

    /// Display name.
    name: String,

    /// Description text.
    description: String,

    /// Unit price.
    unit_price: Money,

    /// Lifecycle status.
    status: ProductStatus,

    /// Current version for optimistic concurrency.
    #[serde(default)]
    version: Version,

    /// Events produced by the last batch of behavior calls.
    #[serde(skip)]
    uncommitted: Vec<ProductEvent>,
}

impl Aggregate for Product {
    type Event = ProductEvent;
    type Error = ProductError;

    fn aggregate_type() -> &'static str {
        super::AGGREGATE_TYPE
    }

    fn key(&self) -> Option<String> {
        self.id.as_ref().map(|id| id.as_str().to_string())
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
impl Product {
    /// Returns the display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the unit price.
    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    /// Returns the lifecycle status.
    pub fn status(&self) -> ProductStatus {
        self.status
    }

    /// Returns a point-in-time snapshot for checkout resolution.
    pub fn snapshot(&self) -> Option<ProductSnapshot> {
        let product_id = self.id.clone()?;
        Some(ProductSnapshot {
            product_id,
            name: self.name.clone(),
            unit_price: self.unit_price,
            active: self.status == ProductStatus::Active,
        })
    }
}

// Behaviors
impl Product {
    fn guard_live(&self) -> Result<(), ProductError> {
        let Some(id) = &self.id else {
            return Err(ProductError::NotFound {
                product_id: String::new(),
            });
        };
        if self.status.is_terminal() {
            return Err(ProductError::AlreadyDeleted {
                product_id: id.to_string(),
            });
        }
        Ok(())
    }

    /// Creates the product.
    pub fn create(
        &mut self,
        product_id: ProductId,
        name: impl Into<String>,
        description: impl Into<String>,
        unit_price: Money,
    ) -> Result<(), ProductError> {
        if self.id.is_some() {
            return Err(ProductError::AlreadyExists {
                product_id: product_id.to_string(),
            });
        }
        if !unit_price.is_positive() {
            return Err(ProductError::InvalidPrice {
                price: unit_price.cents(),
            });
        }

        let name = name.into();
        let description = description.into();
        self.id = Some(product_id.clone());
        self.name = name.clone();
        self.description = description.clone();
        self.unit_price = unit_price;
        self.status = ProductStatus::Active;
        self.record(ProductEvent::ProductCreated(ProductCreatedData {
            product_id,
            name,
            description,
            unit_price,
        }));
        Ok(())
    }

    /// Updates name and description.
    pub fn update_details(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<(), ProductError> {
        self.guard_live()?;

        let name = name.into();
        let description = description.into();
        self.name = name.clone();
        self.description = description.clone();
        self.record(ProductEvent::ProductDetailsUpdated(
            ProductDetailsUpdatedData { name, description },
        ));
        Ok(())
    }

    /// Changes the unit price.
    pub fn change_price(&mut self, new_price: Money) -> Result<(), ProductError> {
        self.guard_live()?;

        if !new_price.is_positive() {
            return Err(ProductError::InvalidPrice {
                price: new_price.cents(),
            });
        }

        let old_price = self.unit_price;
        if old_price == new_price {
            return Ok(());
        }

        self.unit_price = new_price;
        self.record(ProductEvent::ProductPriceChanged(ProductPriceChangedData {
            old_price,
            new_price,
        }));
        Ok(())
    }

    /// Makes the product purchasable.
    pub fn activate(&mut self) -> Result<(), ProductError> {
        self.guard_live()?;

        if self.status != ProductStatus::Active {
            self.status = ProductStatus::Active;
            self.record(ProductEvent::ProductActivated);
        }
        Ok(())
    }

    /// Withdraws the product from sale.
    pub fn deactivate(&mut self) -> Result<(), ProductError> {
        self.guard_live()?;

        if self.status != ProductStatus::Inactive {
            self.status = ProductStatus::Inactive;
            self.record(ProductEvent::ProductDeactivated);
        }
        Ok(())
    }

    /// Deletes the product (terminal).
    pub fn delete(&mut self) -> Result<(), ProductError> {
        self.guard_live()?;

        self.status = ProductStatus::Deleted;
        self.record(ProductEvent::ProductDeleted);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::DomainEvent;

    fn created_product() -> Product {
        let mut product = Product::default();
        product
            .create(ProductId::new("SKU-1"), "Widget", "A widget", Money::from_cents(999))
            .unwrap();
        product.take_uncommitted();
        product
    }

    #[test]
    fn create_sets_state() {
        let mut product = Product::default();
        product
            .create(ProductId::new("SKU-1"), "Widget", "A widget", Money::from_cents(999))
            .unwrap();

        assert_eq!(product.key(), Some("SKU-1".to_string()));
        assert_eq!(product.status(), ProductStatus::Active);
        assert_eq!(product.uncommitted()[0].event_type(), "ProductCreated");
    }

    #[test]
    fn create_twice_fails() {
        let mut product = created_product();
        let result = product.create(
            ProductId::new("SKU-1"),
            "Widget",
            "A widget",
            Money::from_cents(999),
        );
        assert!(matches!(result, Err(ProductError::AlreadyExists { .. })));
    }

    #[test]
    fn create_with_zero_price_fails() {
        let mut product = Product::default();
        let result = product.create(ProductId::new("SKU-1"), "Widget", "", Money::zero());
        assert!(matches!(result, Err(ProductError::InvalidPrice { .. })));
    }

    #[test]
    fn change_price_records_old_and_new() {
        let mut product = created_product();
        product.change_price(Money::from_cents(1200)).unwrap();

        let events = product.take_uncommitted();
        let ProductEvent::ProductPriceChanged(data) = &events[0] else {
            panic!("expected ProductPriceChanged");
        };
        assert_eq!(data.old_price.cents(), 999);
        assert_eq!(data.new_price.cents(), 1200);
    }

    #[test]
    fn unchanged_price_produces_no_event() {
        let mut product = created_product();
        product.change_price(Money::from_cents(999)).unwrap();
        assert!(product.uncommitted().is_empty());
    }

    #[test]
    fn deactivate_then_snapshot_reports_inactive() {
        let mut product = created_product();
        product.deactivate().unwrap();

        let snapshot = product.snapshot().unwrap();
        assert!(!snapshot.active);
        assert_eq!(snapshot.unit_price.cents(), 999);
    }

    #[test]
    fn deleted_product_rejects_operations() {
        let mut product = created_product();
        product.delete().unwrap();

        let result = product.change_price(Money::from_cents(100));
        assert!(matches!(result, Err(ProductError::AlreadyDeleted { .. })));
        let result = product.activate();
        assert!(matches!(result, Err(ProductError::AlreadyDeleted { .. })));
    }

    #[test]
    fn activate_is_idempotent() {
        let mut product = created_product();
        product.activate().unwrap();
        assert!(product.uncommitted().is_empty());

        product.deactivate().unwrap();
        product.activate().unwrap();
        assert_eq!(product.uncommitted().len(), 2);
        assert_eq!(product.status(), ProductStatus::Active);
    }
}
