//! Sign-in families: the shared sign-in events plus one family per flow
//! (SRP, challenge, hosted UI, WebAuthn).

use crate::data::{
    ConfirmSignInEventData, CredentialAssertion, CredentialOptions, HostedUiOptions,
    RespondToAuthChallenge, SignInEventData, SignInMethod, SignInStep, SignedInData, SrpStateData,
};
use crate::error::AuthError;

/// Events shared across every sign-in flow.
#[derive(Debug, Clone, PartialEq)]
pub enum SignInEvent {
    /// The backend demanded an auxiliary challenge mid-flow.
    ReceivedChallenge(RespondToAuthChallenge),

    /// The flow produced a full session; graduate to signed in.
    FinalizeSignIn(SignedInData),

    /// The flow failed.
    ThrowAuthError(AuthError),
}

/// Events recognized by the SRP sub-machine.
#[derive(Debug, Clone, PartialEq)]
pub enum SrpSignInEvent {
    /// Begin the SRP exchange for these credentials.
    InitiateSrp(SignInEventData),

    /// SRP_A was accepted; answer the password-verifier challenge.
    RespondPasswordVerifier(SrpStateData),

    /// An SRP step failed.
    ThrowAuthError(AuthError),
}

/// Events recognized by the challenge sub-machine.
#[derive(Debug, Clone, PartialEq)]
pub enum SignInChallengeEvent {
    /// A challenge arrived; wait for the caller's answer.
    WaitForAnswer(RespondToAuthChallenge, SignInMethod, SignInStep),

    /// The caller answered; verify it with the backend.
    VerifyChallengeAnswer(ConfirmSignInEventData),

    /// Verification must be retried with a fresh answer.
    RetryVerifyChallengeAnswer(ConfirmSignInEventData, SignInStep),

    /// Verification failed terminally.
    ThrowAuthError(AuthError),
}

/// Events recognized by the hosted UI sub-machine.
#[derive(Debug, Clone, PartialEq)]
pub enum HostedUiEvent {
    /// Present the hosted sign-in page.
    ShowHostedUi(HostedUiOptions),

    /// The page returned an authorization code; exchange it for tokens.
    FetchToken(String),

    /// Presentation or exchange failed.
    ThrowError(AuthError),
}

/// Events recognized by the WebAuthn sub-machine.
#[derive(Debug, Clone, PartialEq)]
pub enum WebAuthnEvent {
    /// Fetch credential request options for the user.
    FetchCredentialOptions(SignInEventData),

    /// Options arrived; ask the platform authenticator for an assertion.
    AssertCredentials(CredentialOptions),

    /// An assertion was produced; verify it and complete the sign-in.
    VerifyCredentialsAndSignIn(CredentialAssertion),

    /// Verification succeeded with a full session.
    SignedIn(SignedInData),

    /// The user dismissed the authenticator prompt.
    Cancel,

    /// Any step failed.
    ThrowError(AuthError),
}
