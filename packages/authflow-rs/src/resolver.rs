//! Resolver trait and state resolution.
//!
//! A resolver is a pure mapping `(old_state, event) -> (new_state, actions)`
//! for one state family. No IO, no async, no mutation - data in, data and
//! action descriptions out. The engine applies the root resolver to every
//! incoming event and runs the returned actions afterwards.
//!
//! # Totality
//!
//! Every `(state, event)` pair resolves to *something*. Resolvers switch on
//! the state variant, then on the event family; any combination they do not
//! recognize falls through to `StateResolution::from(old.clone())` - the
//! identity resolution. A resolver never panics on an unknown event and the
//! identity branch is mandatory in every implementation.
//!
//! # Nesting
//!
//! Parent states carry child states as payload. The parent resolver
//! delegates the event to the child resolver, then lifts the child's new
//! state back into its own variant, keeping the child's actions. Terminal
//! child states (signed in, signed out, error) graduate into the matching
//! parent variant - those short-circuits live in the parent, after
//! delegation, where they are explicit and testable.

use std::fmt;

use crate::action::Action;
use crate::core::EventEnvelope;

/// A state value in one family of the hierarchy.
///
/// States are immutable tagged values; the machine replaces the whole value
/// on every transition. `PartialEq` drives the "no notification on no-op"
/// rule, `label` feeds tracing.
pub trait MachineState: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Human-readable variant name for logs.
    fn label(&self) -> &'static str;
}

/// Pure state-transition function for one state family.
pub trait StateMachineResolver: Send + Sync + 'static {
    /// The state family this resolver owns.
    type StateType: MachineState;

    /// The state a fresh machine starts in.
    fn default_state(&self) -> Self::StateType;

    /// Apply one event to one state.
    ///
    /// Must be total: unknown events return the identity resolution, never
    /// an error and never a panic.
    fn resolve(
        &self,
        old_state: &Self::StateType,
        event: &EventEnvelope,
    ) -> StateResolution<Self::StateType>;
}

/// The outcome of applying one event: the next state plus the side effects
/// to schedule.
pub struct StateResolution<S> {
    pub new_state: S,
    pub actions: Vec<Box<dyn Action>>,
}

impl<S> StateResolution<S> {
    /// A transition with actions to run.
    pub fn new(new_state: S, actions: Vec<Box<dyn Action>>) -> Self {
        Self { new_state, actions }
    }

    /// The identity resolution: this state, no actions.
    ///
    /// This is every resolver's fallback branch, and also the way to move
    /// to a new state without side effects.
    pub fn from(new_state: S) -> Self {
        Self {
            new_state,
            actions: Vec::new(),
        }
    }

    /// A transition with a single action.
    pub fn with_action(new_state: S, action: Box<dyn Action>) -> Self {
        Self {
            new_state,
            actions: vec![action],
        }
    }

    /// Lift this resolution into a parent state shape, keeping the actions.
    pub fn map<T>(self, f: impl FnOnce(S) -> T) -> StateResolution<T> {
        StateResolution {
            new_state: f(self.new_state),
            actions: self.actions,
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for StateResolution<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateResolution")
            .field("new_state", &self.new_state)
            .field("action_count", &self.actions.len())
            .finish()
    }
}
