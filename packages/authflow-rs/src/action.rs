//! Action trait - the unit of asynchronous side-effecting work.
//!
//! Actions are scheduled by resolutions and executed by the engine after the
//! state swap. They perform exactly one unit of work (usually a backend
//! call), then translate the outcome into events dispatched back into the
//! machine. They never touch machine state directly.
//!
//! # Key Properties
//!
//! - **Effects only communicate via events**: an action receives a
//!   [`EventDispatcher`](crate::dispatch::EventDispatcher), nothing else
//!   that can observe or mutate the machine.
//! - **Failures are events**: a failing backend call is converted into an
//!   error-carrying event (`ThrowAuthError` and friends), never thrown.
//! - **No orphans**: an action representing a pending operation dispatches
//!   at least one event on every path, so the state it left behind can
//!   always progress.

use std::sync::Arc;

use async_trait::async_trait;

use crate::dispatch::EventDispatcher;
use crate::environment::AuthEnvironment;

/// A unit of asynchronous work produced by a resolution step.
///
/// # Example
///
/// ```ignore
/// struct RevokeToken {
///     signed_in_data: SignedInData,
/// }
///
/// #[async_trait]
/// impl Action for RevokeToken {
///     fn label(&self) -> &'static str {
///         "RevokeToken"
///     }
///
///     async fn execute(
///         self: Box<Self>,
///         dispatcher: Arc<dyn EventDispatcher>,
///         environment: Arc<AuthEnvironment>,
///     ) {
///         let outcome = environment
///             .user_pool
///             .revoke_token(&self.signed_in_data.tokens.refresh_token)
///             .await;
///         // success and failure both become events
///         dispatcher.dispatch(SignOutEvent::from_revoke_outcome(outcome));
///     }
/// }
/// ```
#[async_trait]
pub trait Action: Send + 'static {
    /// Name of this action for logs and assertions.
    fn label(&self) -> &'static str;

    /// Perform the work and dispatch the resulting events.
    ///
    /// Runs on its own task; the engine does not wait for it. The dispatcher
    /// feeds events back into the same machine, serialized behind whatever
    /// resolution is currently in flight.
    async fn execute(
        self: Box<Self>,
        dispatcher: Arc<dyn EventDispatcher>,
        environment: Arc<AuthEnvironment>,
    );
}
