//! Event dispatcher - the narrow handle actions use to feed events back.
//!
//! The dispatcher exposes exactly one capability: enqueue an event. Actions
//! cannot read state, cannot subscribe, cannot short-circuit the queue.
//! This is what enforces the "effects only communicate via events"
//! invariant - an action's result re-enters the machine the same way an
//! external caller's event does, with no special casing.

use crate::core::{Event, EventEnvelope};

/// Enqueue events onto a state machine.
///
/// Implemented by the engine's queue handle; test code substitutes a
/// collecting implementation to assert on dispatched events.
pub trait EventDispatcher: Send + Sync {
    /// Enqueue an already-wrapped event envelope.
    ///
    /// Fire-and-forget: if the machine has stopped, the event is dropped.
    fn send(&self, envelope: EventEnvelope);
}

/// Convenience wrapper so callers dispatch domain events directly.
pub trait DispatchEventExt {
    /// Wrap `event` in an envelope and enqueue it.
    fn dispatch<E: Event>(&self, event: E);
}

impl<D: EventDispatcher + ?Sized> DispatchEventExt for D {
    fn dispatch<E: Event>(&self, event: E) {
        self.send(EventEnvelope::new(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::CollectingDispatcher;

    #[derive(Debug, Clone, PartialEq)]
    struct Ping(u32);

    #[test]
    fn test_dispatch_wraps_in_envelope() {
        let dispatcher = CollectingDispatcher::new();
        dispatcher.dispatch(Ping(1));
        dispatcher.dispatch(Ping(2));

        let events = dispatcher.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].downcast_ref::<Ping>(), Some(&Ping(1)));
        assert_eq!(events[1].downcast_ref::<Ping>(), Some(&Ping(2)));
    }

    #[test]
    fn test_dispatch_through_trait_object() {
        let dispatcher = CollectingDispatcher::new();
        let as_dyn: &dyn EventDispatcher = &dispatcher;

        as_dyn.dispatch(Ping(7));

        assert_eq!(dispatcher.events().len(), 1);
    }
}
