//! Core aggregate and domain event traits.

use serde::{Serialize, de::DeserializeOwned};
use storage::Version;

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the domain.
/// They are immutable, named in past tense, and produced only as a side
/// effect of aggregate behavior.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Returns the event type name.
    ///
    /// This is used as the event-type tag in envelopes and routing keys.
    fn event_type(&self) -> &'static str;
}

/// Capability trait for aggregate roots.
///
/// An aggregate is a cluster of domain objects treated as a single
/// consistency unit. Each bounded context implements this trait on its own
/// types rather than inheriting shared behavior; the contract is:
/// - a monotonic version, incremented on every persisted mutation
/// - a transient buffer of uncommitted events produced by the last batch of
///   behavior calls, handed to the outbox on save and cleared afterwards
///
/// Behaviors validate against current state, mutate, and [`record`] the
/// resulting events; invariant violations are returned as typed errors.
///
/// [`record`]: Aggregate::record
pub trait Aggregate: Default + Serialize + DeserializeOwned + Send + Sync + Sized {
    /// The type of events this aggregate produces.
    type Event: DomainEvent;

    /// The type of errors this aggregate's behaviors can produce.
    type Error: std::error::Error + Send + Sync;

    /// Returns the aggregate type name used for storage and routing keys.
    fn aggregate_type() -> &'static str;

    /// Returns the aggregate's stable identity, or None before creation.
    fn key(&self) -> Option<String>;

    /// Returns the current version of the aggregate.
    ///
    /// Version is 0 for a never-persisted aggregate.
    fn version(&self) -> Version;

    /// Sets the aggregate version. Called by the command processor after
    /// loading stored state.
    fn set_version(&mut self, version: Version);

    /// Appends an event to the uncommitted buffer.
    fn record(&mut self, event: Self::Event);

    /// Returns the uncommitted events accumulated so far.
    fn uncommitted(&self) -> &[Self::Event];

    /// Takes the uncommitted events, leaving the buffer empty.
    fn take_uncommitted(&mut self) -> Vec<Self::Event>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(tag = "type", content = "data")]
    enum TestEvent {
        Created { name: String },
        Bumped { by: u32 },
    }

    impl DomainEvent for TestEvent {
        fn event_type(&self) -> &'static str {
            match self {
                TestEvent::Created { .. } => "TestCreated",
                TestEvent::Bumped { .. } => "TestBumped",
            }
        }
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct TestAggregate {
        name: Option<String>,
        count: u32,
        #[serde(default)]
        version: Version,
        #[serde(skip)]
        uncommitted: Vec<TestEvent>,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("test error")]
    struct TestError;

    impl Aggregate for TestAggregate {
        type Event = TestEvent;
        type Error = TestError;

        fn aggregate_type() -> &'static str {
            "test"
        }

        fn key(&self) -> Option<String> {
            self.name.clone()
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

    impl TestAggregate {
        fn create(&mut self, name: &str) -> Result<(), TestError> {
            if self.name.is_some() {
                return Err(TestError);
            }
            self.name = Some(name.to_string());
            self.record(TestEvent::Created {
                name: name.to_string(),
            });
            Ok(())
        }

        fn bump(&mut self, by: u32) {
            self.count += by;
            self.record(TestEvent::Bumped { by });
        }
    }

    #[test]
    fn behaviors_accumulate_uncommitted_events() {
        let mut aggregate = TestAggregate::default();
        aggregate.create("a").unwrap();
        aggregate.bump(2);

        assert_eq!(aggregate.uncommitted().len(), 2);
        assert_eq!(aggregate.count, 2);

        let events = aggregate.take_uncommitted();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type(), "TestCreated");
        assert!(aggregate.uncommitted().is_empty());
    }

    #[test]
    fn uncommitted_buffer_is_not_serialized() {
        let mut aggregate = TestAggregate::default();
        aggregate.create("a").unwrap();

        let json = serde_json::to_value(&aggregate).unwrap();
        assert!(json.get("uncommitted").is_none());

        let restored: TestAggregate = serde_json::from_value(json).unwrap();
        assert!(restored.uncommitted().is_empty());
        assert_eq!(restored.key(), Some("a".to_string()));
    }
}
