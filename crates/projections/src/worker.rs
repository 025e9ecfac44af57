//! Worker fanning broker events out to registered projections.

use std::sync::Arc;

use messaging::{EventEnvelope, topic_matches};
use tokio::sync::mpsc;

use crate::projection::Projection;

/// Delivers events from a broker subscription to every matching projection.
pub struct ProjectionWorker {
    projections: Vec<Arc<dyn Projection>>,
}

impl ProjectionWorker {
    /// Creates a worker with no projections.
    pub fn new() -> Self {
        Self {
            projections: Vec::new(),
        }
    }

    /// Registers a projection.
    pub fn register(&mut self, projection: Arc<dyn Projection>) {
        self.projections.push(projection);
    }

    /// Returns the number of registered projections.
    pub fn projection_count(&self) -> usize {
        self.projections.len()
    }

    /// Returns the union of all projections' topic patterns.
    pub fn subscriptions(&self) -> Vec<&'static str> {
        let mut patterns: Vec<&'static str> = self
            .projections
            .iter()
            .flat_map(|p| p.subscriptions().iter().copied())
            .collect();
        patterns.sort_unstable();
        patterns.dedup();
        patterns
    }

    /// Delivers one event to every projection whose patterns match.
    #[tracing::instrument(skip(self, envelope), fields(event_type = %envelope.event_type))]
    pub async fn process_event(&self, envelope: &EventEnvelope) {
        let routing_key = envelope.routing_key();
        for projection in &self.projections {
            if !projection
                .subscriptions()
                .iter()
                .any(|pattern| topic_matches(pattern, &routing_key))
            {
                continue;
            }

            match projection.handle(envelope).await {
                Ok(()) => {
                    metrics::counter!("projection_events_processed_total").increment(1);
                }
                Err(e) => {
                    // The event stays unacknowledged in the view's ledger and
                    // applies on a later delivery.
                    tracing::error!(
                        projection = projection.name(),
                        event_id = %envelope.event_id,
                        error = %e,
                        "projection failed to apply event"
                    );
                }
            }
        }
    }

    /// Consumes events from a subscription until the channel closes.
    pub async fn run(&self, mut events: mpsc::UnboundedReceiver<EventEnvelope>) {
        while let Some(envelope) = events.recv().await {
            self.process_event(&envelope).await;
        }
    }
}

impl Default for ProjectionWorker {
    fn default() -> Self {
        Self::new()
    }
}
