//! Read models for the CQRS query side.
//!
//! Each view subscribes to the event topic and applies events idempotently:
//! the processed-message ledger is checked per event ID before a view
//! mutates, so at-least-once delivery updates a read model exactly once.
//! The HTTP boundary only ever answers from these views; callers poll them
//! for a saga's eventual outcome.

pub mod error;
pub mod projection;
pub mod views;
pub mod worker;

pub use error::{ProjectionError, Result};
pub use projection::Projection;
pub use views::{OrderDetails, OrderDetailsView, StockLevelsView};
pub use worker::ProjectionWorker;
