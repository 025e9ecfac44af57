//! Shared identifiers and value types used across every bounded context.

pub mod ids;
pub mod money;

pub use ids::{
    CartId, CausationId, CommandId, CorrelationId, CustomerId, EventId, GuestToken, OrderId,
    ProductId, TenantId,
};
pub use money::Money;
