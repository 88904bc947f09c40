//! Core event types for the auth state machine.
//!
//! # Events are facts
//!
//! An event is an immutable description of something that happened: a
//! sign-in was requested, a challenge answer was verified, a backend call
//! failed. Events are produced by the client API and by completing actions,
//! and consumed exactly once by the resolution step that matches their
//! family against the current state. Unmatched events resolve to the
//! unchanged state - that is a design choice, not an error.
//!
//! # Envelopes
//!
//! Events travel through the machine as [`EventEnvelope`]s: a family enum
//! payload wrapped with an id, a timestamp, and the payload's `TypeId`.
//! Resolvers check family membership by downcasting, so one envelope type
//! can carry any family without the domain enums knowing about transport.

use std::any::{Any, TypeId};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A fact - something that happened.
///
/// **Note**: This trait is automatically implemented for any type that is
/// `Clone + Send + Sync + 'static`. You don't need to implement it manually.
pub trait Event: Any + Send + Sync + 'static {}

// Blanket implementation for any type that meets the requirements
impl<T: Clone + Send + Sync + 'static> Event for T {}

/// Envelope wrapping an event payload with identity and timing metadata.
///
/// The envelope is the machine's internal transport format. Domain event
/// enums stay clean - id and timestamp are transport-level metadata.
#[derive(Clone)]
pub struct EventEnvelope {
    /// Unique id of this event instance.
    pub id: Uuid,
    /// When the event was created.
    pub time: DateTime<Utc>,
    /// Type ID of the payload event, used for family matching.
    pub type_id: TypeId,
    /// The actual event payload.
    payload: Arc<dyn Any + Send + Sync>,
}

impl EventEnvelope {
    /// Wrap an event payload in a fresh envelope.
    pub fn new<E: Event>(event: E) -> Self {
        Self {
            id: Uuid::new_v4(),
            time: Utc::now(),
            type_id: TypeId::of::<E>(),
            payload: Arc::new(event),
        }
    }

    /// Downcast the payload to a concrete event family.
    ///
    /// Returns `None` when the payload belongs to a different family -
    /// the caller's identity branch handles that case.
    pub fn downcast_ref<E: Event>(&self) -> Option<&E> {
        self.payload.downcast_ref()
    }

    /// Check if the payload belongs to the given event family.
    pub fn is<E: Event>(&self) -> bool {
        self.type_id == TypeId::of::<E>()
    }
}

impl std::fmt::Debug for EventEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEnvelope")
            .field("id", &self.id)
            .field("time", &self.time)
            .field("type_id", &self.type_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum TestEvent {
        Ping,
        Value(i32),
    }
    // Event auto-impl by blanket

    #[derive(Debug, Clone)]
    struct OtherEvent;
    // Event auto-impl by blanket

    #[test]
    fn test_envelope_downcast() {
        let envelope = EventEnvelope::new(TestEvent::Value(7));

        assert_eq!(envelope.downcast_ref::<TestEvent>(), Some(&TestEvent::Value(7)));
        assert!(envelope.downcast_ref::<OtherEvent>().is_none());
    }

    #[test]
    fn test_envelope_is() {
        let envelope = EventEnvelope::new(TestEvent::Ping);

        assert!(envelope.is::<TestEvent>());
        assert!(!envelope.is::<OtherEvent>());
    }

    #[test]
    fn test_envelope_ids_are_unique() {
        let a = EventEnvelope::new(TestEvent::Ping);
        let b = EventEnvelope::new(TestEvent::Ping);

        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_envelope_debug_elides_payload() {
        let envelope = EventEnvelope::new(TestEvent::Ping);
        let debug = format!("{:?}", envelope);

        assert!(debug.contains("EventEnvelope"));
        assert!(debug.contains("id"));
    }
}
