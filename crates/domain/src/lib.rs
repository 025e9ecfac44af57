//! Domain layer for the checkout platform.
//!
//! This crate provides the core domain abstractions including:
//! - Aggregate trait (version + uncommitted-event accumulation)
//! - DomainEvent trait for domain events
//! - CommandProcessor for idempotent, version-checked command execution
//! - The cart, catalog, inventory, order, and checkout bounded contexts

pub mod aggregate;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod error;
pub mod inventory;
pub mod order;
pub mod processor;

pub use aggregate::{Aggregate, DomainEvent};
pub use error::DomainError;
pub use processor::{CommandContext, CommandProcessor, Outcome};
