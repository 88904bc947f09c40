//! The state machine engine.
//!
//! One worker task owns the current state, the resolver, and the listener
//! registry. Every operation - event application, state reads, subscribe,
//! unsubscribe - is a message serviced by that task in FIFO order, so state
//! transitions are linearizable without a lock and reads reflect every
//! event the caller already enqueued.
//!
//! Actions run on their own tasks. Their dispatcher feeds events back into
//! the same queue, which means a command's follow-up event is processed
//! strictly after the resolution that scheduled the command - re-entrancy
//! without deadlock, by construction.
//!
//! ```text
//! send(event) ─► queue ─► resolve ─► swap state ─► notify listeners
//!                  ▲                     │
//!                  │                     ▼
//!                  └──── dispatcher ◄── spawn(action.execute(..))
//! ```

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::core::{Event, EventEnvelope};
use crate::dispatch::EventDispatcher;
use crate::environment::AuthEnvironment;
use crate::error::MachineStopped;
use crate::resolver::{MachineState, StateMachineResolver};

/// Opaque unsubscribe token returned by [`StateMachine::listen`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerToken(Uuid);

impl ListenerToken {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// A state-change callback.
type StateListener<S> = Box<dyn FnMut(&S) + Send>;

enum MachineMessage<S> {
    Apply(EventEnvelope),
    Read(oneshot::Sender<S>),
    Subscribe(StateListener<S>, oneshot::Sender<ListenerToken>),
    Unsubscribe(ListenerToken),
}

/// Handle to a running state machine.
///
/// Cheap to clone; all clones address the same worker. The worker exits
/// when every handle (and every in-flight action's dispatcher) is gone.
pub struct StateMachine<R: StateMachineResolver> {
    tx: mpsc::UnboundedSender<MachineMessage<R::StateType>>,
}

impl<R: StateMachineResolver> Clone for StateMachine<R> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<R: StateMachineResolver> StateMachine<R> {
    /// Spawn a machine with the given resolver and environment.
    ///
    /// The machine starts in `resolver.default_state()` and processes
    /// events until the last handle is dropped.
    pub fn new(resolver: R, environment: AuthEnvironment) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        // Actions hold a weak queue handle: an in-flight action must not
        // keep a machine alive after every external handle is gone.
        let dispatcher: Arc<dyn EventDispatcher> = Arc::new(QueueDispatcher {
            tx: tx.downgrade(),
        });

        tokio::spawn(run(resolver, Arc::new(environment), rx, dispatcher));

        Self { tx }
    }

    /// Enqueue an event (fire-and-forget).
    ///
    /// Events are applied in submission order relative to this queue. If
    /// the machine has stopped, the event is dropped with a warning.
    pub fn send<E: Event>(&self, event: E) {
        self.send_envelope(EventEnvelope::new(event));
    }

    /// Enqueue an already-wrapped envelope.
    pub fn send_envelope(&self, envelope: EventEnvelope) {
        if self.tx.send(MachineMessage::Apply(envelope)).is_err() {
            warn!("state machine stopped, event dropped");
        }
    }

    /// Read the current state.
    ///
    /// Serviced by the same queue as `send`, so the returned state reflects
    /// every event this caller enqueued before the read.
    pub async fn current_state(&self) -> Result<R::StateType, MachineStopped> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(MachineMessage::Read(reply))
            .map_err(|_| MachineStopped)?;
        rx.await.map_err(|_| MachineStopped)
    }

    /// Register a state listener.
    ///
    /// The callback fires once immediately with the current state (replay),
    /// then on every subsequent change where the new state differs from the
    /// old. Returns a token for [`StateMachine::cancel`].
    pub async fn listen(
        &self,
        listener: impl FnMut(&R::StateType) + Send + 'static,
    ) -> Result<ListenerToken, MachineStopped> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(MachineMessage::Subscribe(Box::new(listener), reply))
            .map_err(|_| MachineStopped)?;
        rx.await.map_err(|_| MachineStopped)
    }

    /// Remove a listener. Idempotent; unknown tokens are ignored.
    ///
    /// Best-effort: a notification already queued to the worker may still
    /// run before the removal is serviced.
    pub fn cancel(&self, token: ListenerToken) {
        let _ = self.tx.send(MachineMessage::Unsubscribe(token));
    }
}

/// Dispatcher handed to actions: a weak handle onto the machine's queue.
struct QueueDispatcher<S> {
    tx: mpsc::WeakUnboundedSender<MachineMessage<S>>,
}

impl<S: MachineState> EventDispatcher for QueueDispatcher<S> {
    fn send(&self, envelope: EventEnvelope) {
        match self.tx.upgrade() {
            Some(tx) => {
                if tx.send(MachineMessage::Apply(envelope)).is_err() {
                    warn!("state machine stopped, action event dropped");
                }
            }
            None => {
                warn!("state machine gone, action event dropped");
            }
        }
    }
}

async fn run<R: StateMachineResolver>(
    resolver: R,
    environment: Arc<AuthEnvironment>,
    mut rx: mpsc::UnboundedReceiver<MachineMessage<R::StateType>>,
    dispatcher: Arc<dyn EventDispatcher>,
) {
    let mut current = resolver.default_state();
    let mut listeners: HashMap<ListenerToken, StateListener<R::StateType>> = HashMap::new();

    info!(state = current.label(), "auth state machine started");

    while let Some(message) = rx.recv().await {
        match message {
            MachineMessage::Apply(envelope) => {
                // A panicking resolver must not take the machine down;
                // the event is dropped and the state left unchanged.
                let resolution =
                    match catch_unwind(AssertUnwindSafe(|| resolver.resolve(&current, &envelope))) {
                        Ok(resolution) => resolution,
                        Err(_) => {
                            error!(
                                state = current.label(),
                                event_id = %envelope.id,
                                "resolver panicked, event dropped"
                            );
                            continue;
                        }
                    };

                if resolution.new_state != current {
                    debug!(
                        from = current.label(),
                        to = resolution.new_state.label(),
                        event_id = %envelope.id,
                        "state transition"
                    );
                    current = resolution.new_state;
                    for listener in listeners.values_mut() {
                        listener(&current);
                    }
                }

                for action in resolution.actions {
                    let label = action.label();
                    debug!(action = label, "executing action");
                    let dispatcher = dispatcher.clone();
                    let environment = environment.clone();
                    tokio::spawn(async move {
                        if AssertUnwindSafe(action.execute(dispatcher, environment))
                            .catch_unwind()
                            .await
                            .is_err()
                        {
                            error!(action = label, "action panicked");
                        }
                    });
                }
            }
            MachineMessage::Read(reply) => {
                let _ = reply.send(current.clone());
            }
            MachineMessage::Subscribe(mut listener, reply) => {
                // Replay happens here, on the worker, so a subscriber can
                // never land between a transition and its notification.
                listener(&current);
                let token = ListenerToken::new();
                listeners.insert(token, listener);
                let _ = reply.send(token);
            }
            MachineMessage::Unsubscribe(token) => {
                listeners.remove(&token);
            }
        }
    }

    info!("auth state machine stopped");
}
