//! Backend adapter seam.
//!
//! The machine never owns network IO, persistence, or UI presentation. It
//! issues actions, and actions call the adapters collected here. The
//! adapters are trait objects so test builds can substitute mocks - this is
//! the seam that keeps the resolver/action core decoupled from the actual
//! service clients.
//!
//! Adapter methods are async and return typed errors. The actions that call
//! them convert both outcomes into events; nothing here reaches the
//! resolvers directly.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::data::{
    AwsCredentials, CodeDeliveryDetails, ConfirmSignInEventData, CredentialAssertion,
    CredentialOptions, HostedUiOptions, RespondToAuthChallenge, SignUpEventData, SignedInData,
    SrpStateData, UserPoolTokens,
};
use crate::error::{CredentialStoreError, ServiceError};

/// Outcome of a sign-in round trip: either the backend issued tokens, or it
/// demanded another challenge first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInResponse {
    Tokens(UserPoolTokens),
    Challenge(RespondToAuthChallenge),
}

/// Outcome of a sign-up call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpResponse {
    pub user_sub: String,
    pub user_confirmed: bool,
    pub code_delivery: Option<CodeDeliveryDetails>,
}

/// Result of a hosted UI code exchange: the tokens plus the username the
/// backend resolved from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedUiTokens {
    pub tokens: UserPoolTokens,
    pub username: String,
}

/// Failure of an interactive presentation step.
///
/// Cancellation is not a service error: the user closed the page or
/// dismissed the prompt. It maps to the cancellation events of whichever
/// flow was presenting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PresentationError {
    #[error("user cancelled the presentation")]
    Cancelled,
    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// User pool operations: SRP steps, challenge answers, token lifecycle,
/// sign-up.
#[async_trait]
pub trait UserPoolBehavior: Send + Sync + 'static {
    /// Start an SRP auth flow. Returns the password-verifier challenge.
    async fn initiate_srp_auth(
        &self,
        username: &str,
    ) -> Result<RespondToAuthChallenge, ServiceError>;

    /// Answer the password-verifier challenge with the SRP proof.
    async fn respond_to_password_verifier(
        &self,
        state: &SrpStateData,
    ) -> Result<SignInResponse, ServiceError>;

    /// Answer an auxiliary challenge (SMS code, custom challenge, ...).
    async fn respond_to_challenge(
        &self,
        challenge: &RespondToAuthChallenge,
        answer: &ConfirmSignInEventData,
    ) -> Result<SignInResponse, ServiceError>;

    /// Invalidate the user's tokens on every device.
    async fn global_sign_out(&self, access_token: &str) -> Result<(), ServiceError>;

    /// Revoke a refresh token.
    async fn revoke_token(&self, refresh_token: &str) -> Result<(), ServiceError>;

    /// Register a new user.
    async fn sign_up(&self, data: &SignUpEventData) -> Result<SignUpResponse, ServiceError>;

    /// Confirm a registration with a delivered code.
    async fn confirm_sign_up(&self, username: &str, code: &str) -> Result<(), ServiceError>;
}

/// Identity pool operations: identity resolution and AWS credential vending.
#[async_trait]
pub trait IdentityBehavior: Send + Sync + 'static {
    /// Resolve the identity id, authenticated when tokens are present.
    async fn identity_id(&self, tokens: Option<&UserPoolTokens>) -> Result<String, ServiceError>;

    /// Fetch AWS credentials for an identity.
    async fn aws_credentials(
        &self,
        identity_id: &str,
        tokens: Option<&UserPoolTokens>,
    ) -> Result<AwsCredentials, ServiceError>;
}

/// Hosted UI presentation: browser-delegated sign-in and sign-out.
#[async_trait]
pub trait HostedUiBehavior: Send + Sync + 'static {
    /// Present the sign-in page. Resolves to the authorization code.
    async fn present_sign_in(
        &self,
        options: &HostedUiOptions,
    ) -> Result<String, PresentationError>;

    /// Exchange an authorization code for user pool tokens.
    async fn exchange_code(&self, code: &str) -> Result<HostedUiTokens, ServiceError>;

    /// Present the sign-out page, invalidating the browser session.
    async fn present_sign_out(&self, private_session: bool) -> Result<(), PresentationError>;
}

/// WebAuthn operations: credential options, platform assertion, backend
/// verification.
#[async_trait]
pub trait WebAuthnBehavior: Send + Sync + 'static {
    /// Fetch credential request options for a username.
    async fn fetch_credential_options(
        &self,
        username: &str,
    ) -> Result<CredentialOptions, ServiceError>;

    /// Ask the platform authenticator for an assertion.
    async fn assert_credentials(
        &self,
        options: &CredentialOptions,
    ) -> Result<CredentialAssertion, PresentationError>;

    /// Verify an assertion with the backend and complete the sign-in.
    async fn verify_assertion(
        &self,
        assertion: &CredentialAssertion,
    ) -> Result<UserPoolTokens, ServiceError>;
}

/// Local session cache. Backend failures stay opaque (`anyhow` inside
/// [`CredentialStoreError::Backend`]); the bootstrap action treats any
/// failure as "no cached session".
#[async_trait]
pub trait CredentialStoreBehavior: Send + Sync + 'static {
    async fn load(&self) -> Result<Option<SignedInData>, CredentialStoreError>;
    async fn save(&self, data: &SignedInData) -> Result<(), CredentialStoreError>;
    async fn clear(&self) -> Result<(), CredentialStoreError>;
}

/// The concrete adapter bundle handed to every action.
///
/// Cheap to clone behind an `Arc`; the machine owns one instance for its
/// whole lifetime.
pub struct AuthEnvironment {
    pub user_pool: Arc<dyn UserPoolBehavior>,
    pub identity: Arc<dyn IdentityBehavior>,
    pub hosted_ui: Arc<dyn HostedUiBehavior>,
    pub webauthn: Arc<dyn WebAuthnBehavior>,
    pub credential_store: Arc<dyn CredentialStoreBehavior>,
}

impl AuthEnvironment {
    pub fn new(
        user_pool: Arc<dyn UserPoolBehavior>,
        identity: Arc<dyn IdentityBehavior>,
        hosted_ui: Arc<dyn HostedUiBehavior>,
        webauthn: Arc<dyn WebAuthnBehavior>,
        credential_store: Arc<dyn CredentialStoreBehavior>,
    ) -> Self {
        Self {
            user_pool,
            identity,
            hosted_ui,
            webauthn,
            credential_store,
        }
    }
}

impl std::fmt::Debug for AuthEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthEnvironment").finish_non_exhaustive()
    }
}
