//! Persistence layer shared by every bounded context.
//!
//! An aggregate's state change, its outbox entries, and the processed-message
//! ledger entry that records the command are committed in one atomic unit —
//! the state change and its resulting notifications are never observably
//! divergent, and redelivered messages are discarded by the ledger.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod records;
pub mod relay;
pub mod store;
pub mod version;

pub use error::{Result, StorageError};
pub use memory::InMemoryStateStore;
pub use postgres::PostgresStateStore;
pub use records::{Commit, LedgerEntry, OutboxEntry, StateRecord};
pub use relay::OutboxRelay;
pub use store::StateStore;
pub use version::Version;
