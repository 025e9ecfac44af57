//! Checkout saga step machine.

use serde::{Deserialize, Serialize};

/// The step a checkout saga is waiting on.
///
/// Step transitions:
/// ```text
/// AwaitingCart ──► AwaitingProducts ──► AwaitingStockValidation
///      │                                        │
///      │                                        ▼
///      │                                AwaitingDeduction ──► AwaitingOrderCreation
///      │                                        │                     │
///      │                                        │                     ▼
///      │                                        │             AwaitingCartClear ──► Completed
///      └────────────────────────────────────────┴──► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CheckoutStep {
    /// Waiting for the cart snapshot.
    #[default]
    AwaitingCart,

    /// Waiting for resolved product snapshots.
    AwaitingProducts,

    /// Waiting for the batch stock validation verdict.
    AwaitingStockValidation,

    /// Waiting for the stock deduction outcome.
    AwaitingDeduction,

    /// Waiting for the order to be created.
    AwaitingOrderCreation,

    /// Waiting for the cart to be cleared.
    AwaitingCartClear,

    /// Every step finished; the saga record is deleted (terminal).
    Completed,

    /// The checkout was aborted; the record is kept with its reason
    /// (terminal).
    Failed,
}

impl CheckoutStep {
    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CheckoutStep::Completed | CheckoutStep::Failed)
    }

    /// Returns the step name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutStep::AwaitingCart => "AwaitingCart",
            CheckoutStep::AwaitingProducts => "AwaitingProducts",
            CheckoutStep::AwaitingStockValidation => "AwaitingStockValidation",
            CheckoutStep::AwaitingDeduction => "AwaitingDeduction",
            CheckoutStep::AwaitingOrderCreation => "AwaitingOrderCreation",
            CheckoutStep::AwaitingCartClear => "AwaitingCartClear",
            CheckoutStep::Completed => "Completed",
            CheckoutStep::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
