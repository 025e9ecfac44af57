//! Core projection trait.

use async_trait::async_trait;
use messaging::EventEnvelope;

use crate::Result;

/// A projection that processes events into a denormalized read model.
///
/// Implementations must be idempotent per event identity: handling the same
/// envelope twice updates the read model exactly once. Views achieve this by
/// consulting the processed-message ledger under their own consumer name
/// before applying.
#[async_trait]
pub trait Projection: Send + Sync {
    /// Returns the name of this projection, used as its ledger consumer
    /// identity.
    fn name(&self) -> &'static str;

    /// Topic patterns this projection wants events for.
    fn subscriptions(&self) -> &'static [&'static str];

    /// Handles a single event, updating the read model.
    async fn handle(&self, envelope: &EventEnvelope) -> Result<()>;
}
