//! # Authflow
//!
//! A hierarchical auth state machine where resolvers decide, actions
//! execute, and events drive the lifecycle.
//!
//! ## Core Concepts
//!
//! Authflow separates **what happened** from **what to do about it**:
//! - [`EventEnvelope`] = Facts (a sign-in was requested, a challenge answer
//!   was verified, a backend call failed)
//! - [`Action`] = Work (one backend call, whose outcome re-enters the
//!   machine as new events)
//!
//! The key principle: **resolution is pure and total**. Every
//! `(state, event)` pair maps to some resolution; unmatched events resolve
//! to the unchanged state with no actions, and nothing in the resolution
//! path performs IO.
//!
//! ## Architecture
//!
//! ```text
//! Client API (sign_in / confirm_sign_in / sign_out / ...)
//!     │
//!     ▼ send()
//! StateMachine queue (one worker task, FIFO)
//!     │
//!     ├─► Resolver.resolve(state, event) ─► (new state, actions)
//!     │
//!     ├─► state swap + listener notification (on change only)
//!     │
//!     └─► spawn Action.execute(dispatcher, environment)
//!                 │
//!                 └─► dispatcher.send(event) ──► back onto the queue
//! ```
//!
//! ## State hierarchy
//!
//! States nest: `AuthState` carries `AuthenticationState` and
//! `AuthorizationState`; authentication carries the in-flight sign-in,
//! sign-out, or sign-up sub-machine; sign-in carries the active flow (SRP,
//! hosted UI, WebAuthn, challenge). Each level has its own resolver;
//! parents delegate and lift, and terminal child states graduate into the
//! parent's terminal variants.
//!
//! ## Key Invariants
//!
//! 1. **Resolvers are pure** - no IO, no async, total over all events
//! 2. **Actions only speak in events** - the dispatcher is their whole
//!    world; failures become error events, never panics or returns
//! 3. **One worker, one state** - every read and write is serialized
//!    behind the machine's queue; no external component touches state
//! 4. **Listeners replay** - subscription delivers the current state
//!    immediately, then only real changes
//!
//! ## Example
//!
//! ```ignore
//! use authflow::{AuthClient, AuthConfiguration, AuthEnvironment};
//!
//! let environment = AuthEnvironment::new(user_pool, identity, hosted_ui, webauthn, store);
//! let client = AuthClient::new(configuration, environment);
//!
//! match client.sign_in("alice", "hunter2").await? {
//!     SignInResult::Done(session) => println!("signed in as {}", session.username),
//!     SignInResult::ChallengeRequired(challenge, _) => {
//!         let code = prompt_for(challenge);
//!         client.confirm_sign_in(code).await?;
//!     }
//! }
//! ```

// Core modules
mod action;
mod client;
mod core;
mod dispatch;
mod environment;
mod error;
mod machine;
mod resolver;

// Domain modules
mod actions;
mod data;
mod events;
mod states;

// Testing utilities (feature-gated)
#[cfg(any(test, feature = "testing"))]
pub mod testing;


// Re-export core types
pub use crate::action::Action;
pub use crate::core::{Event, EventEnvelope};
pub use crate::dispatch::{DispatchEventExt, EventDispatcher};
pub use crate::machine::{ListenerToken, StateMachine};
pub use crate::resolver::{MachineState, StateMachineResolver, StateResolution};

// Re-export the environment seam
pub use crate::environment::{
    AuthEnvironment, CredentialStoreBehavior, HostedUiBehavior, HostedUiTokens, IdentityBehavior,
    PresentationError, SignInResponse, SignUpResponse, UserPoolBehavior, WebAuthnBehavior,
};

// Re-export error types
pub use crate::error::{
    AuthError, CredentialStoreError, MachineStopped, ServiceError, SignOutError,
};

// Re-export domain data
pub use crate::data::{
    AuthConfiguration, AuthFlowType, AwsCredentials, ChallengeType, SessionCredentials,
    CodeDeliveryDetails, ConfirmSignInEventData, CredentialAssertion, CredentialOptions,
    DeliveryMedium, GlobalSignOutError, HostedUiError, HostedUiOptions, IdentityPoolConfig,
    RespondToAuthChallenge, RevokeTokenError, SignInEventData, SignInMethod, SignInStep,
    SignOutEventData, SignUpEventData, SignedInData, SignedOutData, SrpStateData, UserPoolConfig,
    UserPoolTokens,
};

// Re-export event families
pub use crate::events::{
    AuthenticationEvent, AuthorizationEvent, FetchAuthSessionEvent, HostedUiEvent,
    SignInChallengeEvent, SignInEvent, SignOutEvent, SignUpEvent, SrpSignInEvent, WebAuthnEvent,
};

// Re-export state families and resolvers
pub use crate::states::{
    AuthState, AuthStateResolver, AuthenticationResolver, AuthenticationState,
    AuthorizationResolver, AuthorizationState, FetchAuthSessionResolver, FetchAuthSessionState,
    HostedUiResolver, HostedUiSignInState, SignInChallengeResolver, SignInChallengeState,
    SignInResolver, SignInState, SignOutResolver, SignOutState, SignUpResolver, SignUpState,
    SrpSignInResolver, SrpSignInState, WebAuthnResolver, WebAuthnSignInState,
};

// Re-export the client facade
pub use crate::client::{AuthClient, SignInResult, SignUpOutcome, DEFAULT_OPERATION_TIMEOUT};
