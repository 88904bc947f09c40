//! Authentication family - the top-level sign-in/sign-out lifecycle.

use crate::data::{
    AuthConfiguration, SignInEventData, SignOutEventData, SignUpEventData, SignedInData,
    SignedOutData,
};
use crate::error::AuthError;

/// Events recognized by the authentication state family.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthenticationEvent {
    /// Apply a resolved configuration. Only meaningful from `NotConfigured`.
    Configure(AuthConfiguration),

    /// Bootstrap found a cached session.
    InitializedSignedIn(SignedInData),

    /// Bootstrap found no usable session.
    InitializedSignedOut(SignedOutData),

    /// A caller asked to sign in.
    SignInRequested(SignInEventData),

    /// A caller asked to sign up.
    SignUpRequested(SignUpEventData),

    /// A caller asked to sign out.
    SignOutRequested(SignOutEventData),

    /// The sign-out flow was cancelled by the user; restore the session.
    SignOutCancelled(SignedInData),

    /// Abandon an in-flight sign-in and return to signed out.
    CancelSignIn,

    /// Abandon an in-flight sign-up and return to signed out.
    CancelSignUp,

    /// An unrecoverable failure in this family.
    ThrowError(AuthError),
}
