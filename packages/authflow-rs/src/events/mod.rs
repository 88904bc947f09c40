//! Event families.
//!
//! One enum per family. A family groups the events one state family (and
//! its resolver) recognizes; everything else is ignored by construction.
//! Event values are plain facts - they carry data, never behavior.

mod authentication;
mod authorization;
mod sign_in;
mod sign_out;
mod sign_up;

pub use authentication::AuthenticationEvent;
pub use authorization::{AuthorizationEvent, FetchAuthSessionEvent};
pub use sign_in::{
    HostedUiEvent, SignInChallengeEvent, SignInEvent, SrpSignInEvent, WebAuthnEvent,
};
pub use sign_out::SignOutEvent;
pub use sign_up::SignUpEvent;
