//! Structured error types for the auth state machine.
//!
//! # The Error Boundary Rule
//!
//! > **No error ever crosses the resolver boundary.**
//!
//! Resolvers are total functions - they cannot fail. All failure information
//! flows through the machine as event payloads (`ThrowAuthError` and friends)
//! and surfaces as `Error` state variants. The types here are the payloads.
//!
//! - [`ServiceError`] - what a backend adapter call can report
//! - [`AuthError`] - the domain error carried by `Error` states
//! - [`SignOutError`] - terminal failures of the sign-out pipeline
//! - [`CredentialStoreError`] - opaque storage failures behind the
//!   credential store seam (`anyhow` stays internal to the backend)
//! - [`MachineStopped`] - handle operations after the engine task exited

use thiserror::Error;

/// Errors reported by backend adapter calls.
///
/// Adapters (user pool, identity pool, hosted UI, WebAuthn) are external
/// collaborators. Their failures are converted into events by the action
/// that made the call - never thrown past it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The backend rejected the request with a service-level message.
    #[error("service error: {message}")]
    Service { message: String },

    /// The backend returned a response the client could not interpret.
    #[error("invalid service response")]
    InvalidResponse,

    /// The caller is not authorized for the requested operation.
    #[error("not authorized")]
    NotAuthorized,

    /// The referenced resource does not exist.
    #[error("resource not found")]
    ResourceNotFound,

    /// A submitted confirmation code did not match.
    #[error("code mismatch")]
    CodeMismatch,

    /// The request never reached the backend.
    #[error("connectivity error: {message}")]
    Connectivity { message: String },
}

impl ServiceError {
    /// Shorthand for a service-level rejection.
    pub fn service(message: impl Into<String>) -> Self {
        ServiceError::Service {
            message: message.into(),
        }
    }
}

/// Domain error carried by `Error` state variants and error events.
///
/// `Error` states retain enough context (prior configuration, this value)
/// to support retry-from-error transitions where the domain allows it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AuthError {
    /// The plugin was driven before or against a usable configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A backend call failed.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// The user dismissed an interactive flow (hosted UI, WebAuthn prompt).
    #[error("operation cancelled by user")]
    UserCancelled,

    /// The session is no longer valid and cannot be refreshed.
    #[error("session expired")]
    SessionExpired,

    /// A caller-facing operation did not reach a terminal state in time.
    #[error("operation timed out")]
    Timeout,

    /// Caller-supplied input failed validation before any backend call.
    #[error("validation error: {0}")]
    Validation(String),

    /// A WebAuthn assertion or attestation step failed.
    #[error("webauthn error: {0}")]
    WebAuthn(String),

    /// The sign-out pipeline ended in a terminal failure.
    #[error("sign out failed: {0}")]
    SignOut(SignOutError),

    /// Anything the taxonomy above does not cover.
    #[error("unknown error: {0}")]
    Unknown(String),
}

/// Terminal failures of the sign-out state family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SignOutError {
    /// The user dismissed the hosted UI sign-out page.
    #[error("user cancelled sign out")]
    UserCancelled,

    /// Clearing the local session failed.
    #[error("local sign out failed")]
    LocalSignOut,
}

/// Failures of the credential store seam.
///
/// `Backend` wraps whatever the storage implementation reports. The
/// distinction matters: a corrupted entry means the cached session must be
/// discarded, a backend failure means storage itself is unavailable.
#[derive(Debug, Error)]
pub enum CredentialStoreError {
    /// The stored entry could not be decoded.
    #[error("stored credentials are corrupted")]
    Corrupted,

    /// Storage backend failed (keychain, disk, serialization).
    #[error("credential store backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

/// The engine task has exited; the handle can no longer service requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("state machine task has stopped")]
pub struct MachineStopped;
