//! Value objects for the order domain.

use common::{Money, ProductId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Human-facing order number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Generates a new order number.
    pub fn generate() -> Self {
        let suffix = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
        Self(format!("ORD-{suffix}"))
    }

    /// Returns the order number as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Customer contact details captured at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    /// Given name.
    pub first_name: String,

    /// Family name.
    pub last_name: String,

    /// Contact email.
    pub email: String,

    /// Contact phone number.
    pub phone: String,
}

/// Shipping destination captured at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    /// Street address.
    pub address_line1: String,

    /// Apartment, suite, etc.
    pub address_line2: Option<String>,

    /// City.
    pub city: String,

    /// State or province.
    pub state: String,

    /// Postal code.
    pub zip_code: String,

    /// Country.
    pub country: String,
}

/// One line of an order: a product snapshot times the requested quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineItem {
    /// The product's SKU.
    pub product_id: ProductId,

    /// Product name at order time.
    pub product_name: String,

    /// Unit price at order time.
    pub unit_price: Money,

    /// Quantity ordered.
    pub quantity: u32,
}

impl OrderLineItem {
    /// Creates a new line item.
    pub fn new(
        product_id: impl Into<ProductId>,
        product_name: impl Into<String>,
        unit_price: Money,
        quantity: u32,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            product_name: product_name.into(),
            unit_price,
            quantity,
        }
    }

    /// Returns unit price times quantity.
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// Order money totals. Tax is fixed at zero in the base model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct OrderTotals {
    /// Sum of line totals.
    pub subtotal: Money,

    /// Shipping fee.
    pub shipping_fee: Money,

    /// Tax amount.
    pub tax: Money,

    /// Grand total.
    pub total: Money,
}

impl OrderTotals {
    /// Builds totals from a subtotal and shipping fee.
    pub fn of(subtotal: Money, shipping_fee: Money) -> Self {
        Self {
            subtotal,
            shipping_fee,
            tax: Money::zero(),
            total: subtotal + shipping_fee,
        }
    }

    /// Builds totals by summing the given line items, with no shipping fee.
    pub fn from_line_items(items: &[OrderLineItem]) -> Self {
        let subtotal = items.iter().map(OrderLineItem::line_total).sum();
        Self::of(subtotal, Money::zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_number_format() {
        let number = OrderNumber::generate();
        assert!(number.as_str().starts_with("ORD-"));
        assert_eq!(number.as_str().len(), 12);
        assert_ne!(number, OrderNumber::generate());
    }

    #[test]
    fn line_total_is_price_times_quantity() {
        let item = OrderLineItem::new("SKU-1", "Widget", Money::from_cents(1000), 3);
        assert_eq!(item.line_total().cents(), 3000);
    }

    #[test]
    fn totals_sum_line_totals() {
        let items = vec![
            OrderLineItem::new("SKU-1", "Widget", Money::from_cents(1000), 2),
            OrderLineItem::new("SKU-2", "Gadget", Money::from_cents(2500), 1),
        ];

        let totals = OrderTotals::from_line_items(&items);
        assert_eq!(totals.subtotal.cents(), 4500);
        assert_eq!(totals.tax.cents(), 0);
        assert_eq!(totals.total.cents(), 4500);
    }

    #[test]
    fn totals_of_adds_shipping() {
        let totals = OrderTotals::of(Money::from_cents(1000), Money::from_cents(250));
        assert_eq!(totals.total.cents(), 1250);
    }
}
