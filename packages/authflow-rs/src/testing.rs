//! Testing utilities: programmable adapter mocks, a collecting dispatcher,
//! and shared fixtures.
//!
//! This module is available with the `testing` feature (and to the crate's
//! own tests):
//!
//! ```toml
//! [dev-dependencies]
//! authflow = { version = "0.1", features = ["testing"] }
//! ```
//!
//! Mocks default to rejecting every call, so a test only wires up the
//! adapters its flow actually touches:
//!
//! ```ignore
//! let mut env = mock_environment();
//! env.user_pool = Arc::new(
//!     MockUserPool::new()
//!         .with_initiate_srp_auth(|u| Ok(test_challenge(ChallengeType::DeviceSrpAuth, u)))
//!         .with_respond_to_password_verifier(|_| Ok(SignInResponse::Tokens(test_tokens()))),
//! );
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use crate::action::Action;
use crate::core::EventEnvelope;
use crate::data::{
    AuthConfiguration, AuthFlowType, AwsCredentials, ChallengeType, ConfirmSignInEventData,
    CredentialAssertion, CredentialOptions, HostedUiOptions, IdentityPoolConfig,
    RespondToAuthChallenge, SignInMethod, SignUpEventData, SignedInData, SrpStateData,
    UserPoolConfig, UserPoolTokens,
};
use crate::dispatch::EventDispatcher;
use crate::environment::{
    AuthEnvironment, CredentialStoreBehavior, HostedUiBehavior, HostedUiTokens, IdentityBehavior,
    PresentationError, SignInResponse, SignUpResponse, UserPoolBehavior, WebAuthnBehavior,
};
use crate::error::{CredentialStoreError, ServiceError};

// =============================================================================
// Dispatcher
// =============================================================================

/// Dispatcher that records every envelope instead of feeding a machine.
///
/// The standard harness for action unit tests: execute the action, then
/// assert on the dispatched events.
#[derive(Default)]
pub struct CollectingDispatcher {
    events: Mutex<Vec<EventEnvelope>>,
}

impl CollectingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything dispatched so far, in order.
    pub fn events(&self) -> Vec<EventEnvelope> {
        self.events.lock().expect("dispatcher mutex poisoned").clone()
    }
}

impl EventDispatcher for CollectingDispatcher {
    fn send(&self, envelope: EventEnvelope) {
        self.events
            .lock()
            .expect("dispatcher mutex poisoned")
            .push(envelope);
    }
}

// =============================================================================
// Actions
// =============================================================================

/// Action that only counts its executions.
pub struct CountingAction {
    label: &'static str,
    count: Arc<AtomicUsize>,
}

impl CountingAction {
    pub fn new(label: &'static str) -> (Self, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        (
            Self {
                label,
                count: count.clone(),
            },
            count,
        )
    }
}

#[async_trait]
impl Action for CountingAction {
    fn label(&self) -> &'static str {
        self.label
    }

    async fn execute(
        self: Box<Self>,
        _dispatcher: Arc<dyn EventDispatcher>,
        _environment: Arc<AuthEnvironment>,
    ) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

// =============================================================================
// Adapter mocks
// =============================================================================

macro_rules! mock_call {
    ($slot:expr, $name:literal $(, $arg:expr)*) => {
        match &$slot {
            Some(f) => f($($arg),*),
            None => Err(ServiceError::service(concat!($name, " not mocked")).into()),
        }
    };
}

type InitiateSrpFn = dyn Fn(&str) -> Result<RespondToAuthChallenge, ServiceError> + Send + Sync;
type PasswordVerifierFn = dyn Fn(&SrpStateData) -> Result<SignInResponse, ServiceError> + Send + Sync;
type RespondChallengeFn = dyn Fn(&RespondToAuthChallenge, &ConfirmSignInEventData) -> Result<SignInResponse, ServiceError>
    + Send
    + Sync;
type TokenCallFn = dyn Fn(&str) -> Result<(), ServiceError> + Send + Sync;
type SignUpFn = dyn Fn(&SignUpEventData) -> Result<SignUpResponse, ServiceError> + Send + Sync;
type ConfirmSignUpFn = dyn Fn(&str, &str) -> Result<(), ServiceError> + Send + Sync;

/// Programmable [`UserPoolBehavior`] mock. Unconfigured calls fail.
#[derive(Default)]
pub struct MockUserPool {
    initiate_srp_auth: Option<Box<InitiateSrpFn>>,
    respond_to_password_verifier: Option<Box<PasswordVerifierFn>>,
    respond_to_challenge: Option<Box<RespondChallengeFn>>,
    global_sign_out: Option<Box<TokenCallFn>>,
    revoke_token: Option<Box<TokenCallFn>>,
    sign_up: Option<Box<SignUpFn>>,
    confirm_sign_up: Option<Box<ConfirmSignUpFn>>,
}

impl MockUserPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_initiate_srp_auth(
        mut self,
        f: impl Fn(&str) -> Result<RespondToAuthChallenge, ServiceError> + Send + Sync + 'static,
    ) -> Self {
        self.initiate_srp_auth = Some(Box::new(f));
        self
    }

    pub fn with_respond_to_password_verifier(
        mut self,
        f: impl Fn(&SrpStateData) -> Result<SignInResponse, ServiceError> + Send + Sync + 'static,
    ) -> Self {
        self.respond_to_password_verifier = Some(Box::new(f));
        self
    }

    pub fn with_respond_to_challenge(
        mut self,
        f: impl Fn(&RespondToAuthChallenge, &ConfirmSignInEventData) -> Result<SignInResponse, ServiceError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.respond_to_challenge = Some(Box::new(f));
        self
    }

    pub fn with_global_sign_out(
        mut self,
        f: impl Fn(&str) -> Result<(), ServiceError> + Send + Sync + 'static,
    ) -> Self {
        self.global_sign_out = Some(Box::new(f));
        self
    }

    pub fn with_revoke_token(
        mut self,
        f: impl Fn(&str) -> Result<(), ServiceError> + Send + Sync + 'static,
    ) -> Self {
        self.revoke_token = Some(Box::new(f));
        self
    }

    pub fn with_sign_up(
        mut self,
        f: impl Fn(&SignUpEventData) -> Result<SignUpResponse, ServiceError> + Send + Sync + 'static,
    ) -> Self {
        self.sign_up = Some(Box::new(f));
        self
    }

    pub fn with_confirm_sign_up(
        mut self,
        f: impl Fn(&str, &str) -> Result<(), ServiceError> + Send + Sync + 'static,
    ) -> Self {
        self.confirm_sign_up = Some(Box::new(f));
        self
    }
}

#[async_trait]
impl UserPoolBehavior for MockUserPool {
    async fn initiate_srp_auth(
        &self,
        username: &str,
    ) -> Result<RespondToAuthChallenge, ServiceError> {
        mock_call!(self.initiate_srp_auth, "initiate_srp_auth", username)
    }

    async fn respond_to_password_verifier(
        &self,
        state: &SrpStateData,
    ) -> Result<SignInResponse, ServiceError> {
        mock_call!(
            self.respond_to_password_verifier,
            "respond_to_password_verifier",
            state
        )
    }

    async fn respond_to_challenge(
        &self,
        challenge: &RespondToAuthChallenge,
        answer: &ConfirmSignInEventData,
    ) -> Result<SignInResponse, ServiceError> {
        mock_call!(
            self.respond_to_challenge,
            "respond_to_challenge",
            challenge,
            answer
        )
    }

    async fn global_sign_out(&self, access_token: &str) -> Result<(), ServiceError> {
        mock_call!(self.global_sign_out, "global_sign_out", access_token)
    }

    async fn revoke_token(&self, refresh_token: &str) -> Result<(), ServiceError> {
        mock_call!(self.revoke_token, "revoke_token", refresh_token)
    }

    async fn sign_up(&self, data: &SignUpEventData) -> Result<SignUpResponse, ServiceError> {
        mock_call!(self.sign_up, "sign_up", data)
    }

    async fn confirm_sign_up(&self, username: &str, code: &str) -> Result<(), ServiceError> {
        mock_call!(self.confirm_sign_up, "confirm_sign_up", username, code)
    }
}

type IdentityIdFn = dyn Fn(Option<&UserPoolTokens>) -> Result<String, ServiceError> + Send + Sync;
type AwsCredentialsFn =
    dyn Fn(&str, Option<&UserPoolTokens>) -> Result<AwsCredentials, ServiceError> + Send + Sync;

/// Programmable [`IdentityBehavior`] mock.
#[derive(Default)]
pub struct MockIdentity {
    identity_id: Option<Box<IdentityIdFn>>,
    aws_credentials: Option<Box<AwsCredentialsFn>>,
}

impl MockIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identity_id(
        mut self,
        f: impl Fn(Option<&UserPoolTokens>) -> Result<String, ServiceError> + Send + Sync + 'static,
    ) -> Self {
        self.identity_id = Some(Box::new(f));
        self
    }

    pub fn with_aws_credentials(
        mut self,
        f: impl Fn(&str, Option<&UserPoolTokens>) -> Result<AwsCredentials, ServiceError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.aws_credentials = Some(Box::new(f));
        self
    }
}

#[async_trait]
impl IdentityBehavior for MockIdentity {
    async fn identity_id(&self, tokens: Option<&UserPoolTokens>) -> Result<String, ServiceError> {
        mock_call!(self.identity_id, "identity_id", tokens)
    }

    async fn aws_credentials(
        &self,
        identity_id: &str,
        tokens: Option<&UserPoolTokens>,
    ) -> Result<AwsCredentials, ServiceError> {
        mock_call!(self.aws_credentials, "aws_credentials", identity_id, tokens)
    }
}

type PresentSignInFn = dyn Fn(&HostedUiOptions) -> Result<String, PresentationError> + Send + Sync;
type ExchangeCodeFn = dyn Fn(&str) -> Result<HostedUiTokens, ServiceError> + Send + Sync;
type PresentSignOutFn = dyn Fn(bool) -> Result<(), PresentationError> + Send + Sync;

/// Programmable [`HostedUiBehavior`] mock.
#[derive(Default)]
pub struct MockHostedUi {
    present_sign_in: Option<Box<PresentSignInFn>>,
    exchange_code: Option<Box<ExchangeCodeFn>>,
    present_sign_out: Option<Box<PresentSignOutFn>>,
}

impl MockHostedUi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_present_sign_in(
        mut self,
        f: impl Fn(&HostedUiOptions) -> Result<String, PresentationError> + Send + Sync + 'static,
    ) -> Self {
        self.present_sign_in = Some(Box::new(f));
        self
    }

    pub fn with_exchange_code(
        mut self,
        f: impl Fn(&str) -> Result<HostedUiTokens, ServiceError> + Send + Sync + 'static,
    ) -> Self {
        self.exchange_code = Some(Box::new(f));
        self
    }

    pub fn with_present_sign_out(
        mut self,
        f: impl Fn(bool) -> Result<(), PresentationError> + Send + Sync + 'static,
    ) -> Self {
        self.present_sign_out = Some(Box::new(f));
        self
    }
}

#[async_trait]
impl HostedUiBehavior for MockHostedUi {
    async fn present_sign_in(
        &self,
        options: &HostedUiOptions,
    ) -> Result<String, PresentationError> {
        mock_call!(self.present_sign_in, "present_sign_in", options)
    }

    async fn exchange_code(&self, code: &str) -> Result<HostedUiTokens, ServiceError> {
        mock_call!(self.exchange_code, "exchange_code", code)
    }

    async fn present_sign_out(&self, private_session: bool) -> Result<(), PresentationError> {
        mock_call!(self.present_sign_out, "present_sign_out", private_session)
    }
}

type FetchOptionsFn = dyn Fn(&str) -> Result<CredentialOptions, ServiceError> + Send + Sync;
type AssertFn =
    dyn Fn(&CredentialOptions) -> Result<CredentialAssertion, PresentationError> + Send + Sync;
type VerifyAssertionFn =
    dyn Fn(&CredentialAssertion) -> Result<UserPoolTokens, ServiceError> + Send + Sync;

/// Programmable [`WebAuthnBehavior`] mock.
#[derive(Default)]
pub struct MockWebAuthn {
    fetch_credential_options: Option<Box<FetchOptionsFn>>,
    assert_credentials: Option<Box<AssertFn>>,
    verify_assertion: Option<Box<VerifyAssertionFn>>,
}

impl MockWebAuthn {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fetch_credential_options(
        mut self,
        f: impl Fn(&str) -> Result<CredentialOptions, ServiceError> + Send + Sync + 'static,
    ) -> Self {
        self.fetch_credential_options = Some(Box::new(f));
        self
    }

    pub fn with_assert_credentials(
        mut self,
        f: impl Fn(&CredentialOptions) -> Result<CredentialAssertion, PresentationError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.assert_credentials = Some(Box::new(f));
        self
    }

    pub fn with_verify_assertion(
        mut self,
        f: impl Fn(&CredentialAssertion) -> Result<UserPoolTokens, ServiceError> + Send + Sync + 'static,
    ) -> Self {
        self.verify_assertion = Some(Box::new(f));
        self
    }
}

#[async_trait]
impl WebAuthnBehavior for MockWebAuthn {
    async fn fetch_credential_options(
        &self,
        username: &str,
    ) -> Result<CredentialOptions, ServiceError> {
        mock_call!(
            self.fetch_credential_options,
            "fetch_credential_options",
            username
        )
    }

    async fn assert_credentials(
        &self,
        options: &CredentialOptions,
    ) -> Result<CredentialAssertion, PresentationError> {
        mock_call!(self.assert_credentials, "assert_credentials", options)
    }

    async fn verify_assertion(
        &self,
        assertion: &CredentialAssertion,
    ) -> Result<UserPoolTokens, ServiceError> {
        mock_call!(self.verify_assertion, "verify_assertion", assertion)
    }
}

/// In-memory [`CredentialStoreBehavior`] mock.
pub struct MockCredentialStore {
    session: Mutex<Option<SignedInData>>,
    failing: bool,
}

impl MockCredentialStore {
    /// Empty store; loads return `None`, saves and clears succeed.
    pub fn new() -> Self {
        Self {
            session: Mutex::new(None),
            failing: false,
        }
    }

    /// Store seeded with a cached session.
    pub fn with_session(data: SignedInData) -> Self {
        Self {
            session: Mutex::new(Some(data)),
            failing: false,
        }
    }

    /// Store whose every operation fails with a backend error.
    pub fn failing() -> Self {
        Self {
            session: Mutex::new(None),
            failing: true,
        }
    }

    fn check(&self) -> Result<(), CredentialStoreError> {
        if self.failing {
            return Err(anyhow::anyhow!("keychain unavailable").into());
        }
        Ok(())
    }
}

impl Default for MockCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialStoreBehavior for MockCredentialStore {
    async fn load(&self) -> Result<Option<SignedInData>, CredentialStoreError> {
        self.check()?;
        Ok(self.session.lock().expect("store mutex poisoned").clone())
    }

    async fn save(&self, data: &SignedInData) -> Result<(), CredentialStoreError> {
        self.check()?;
        *self.session.lock().expect("store mutex poisoned") = Some(data.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), CredentialStoreError> {
        self.check()?;
        *self.session.lock().expect("store mutex poisoned") = None;
        Ok(())
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// An environment of unconfigured mocks (every backend call rejects, the
/// credential store is empty and working).
pub fn mock_environment() -> AuthEnvironment {
    AuthEnvironment::new(
        Arc::new(MockUserPool::new()),
        Arc::new(MockIdentity::new()),
        Arc::new(MockHostedUi::new()),
        Arc::new(MockWebAuthn::new()),
        Arc::new(MockCredentialStore::new()),
    )
}

/// User pool + identity pool configuration.
pub fn test_configuration() -> AuthConfiguration {
    AuthConfiguration::UserPoolsAndIdentityPools(
        UserPoolConfig {
            pool_id: "us-east-1_testpool".into(),
            client_id: "test-client".into(),
            region: "us-east-1".into(),
            client_secret: None,
            hosted_ui_domain: Some("auth.example.com".into()),
        },
        IdentityPoolConfig {
            pool_id: "us-east-1:test-identity-pool".into(),
            region: "us-east-1".into(),
        },
    )
}

/// User pool only configuration.
pub fn test_user_pool_only_configuration() -> AuthConfiguration {
    AuthConfiguration::UserPools(UserPoolConfig {
        pool_id: "us-east-1_testpool".into(),
        client_id: "test-client".into(),
        region: "us-east-1".into(),
        client_secret: None,
        hosted_ui_domain: None,
    })
}

pub fn test_tokens() -> UserPoolTokens {
    UserPoolTokens {
        id_token: "id-token".into(),
        access_token: "access-token".into(),
        refresh_token: "refresh-token".into(),
        expires_in: 3600,
    }
}

/// A session with a fixed timestamp so fixtures compare equal.
pub fn test_signed_in_data(username: &str) -> SignedInData {
    SignedInData {
        user_id: username.to_string(),
        username: username.to_string(),
        signed_in_date: Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap(),
        sign_in_method: SignInMethod::ApiBased(AuthFlowType::UserSrp),
        tokens: test_tokens(),
    }
}

pub fn test_challenge(challenge: ChallengeType, username: &str) -> RespondToAuthChallenge {
    RespondToAuthChallenge {
        challenge,
        username: username.to_string(),
        session: Some("session-token".into()),
        parameters: Default::default(),
    }
}

pub fn test_aws_credentials() -> AwsCredentials {
    AwsCredentials {
        access_key_id: "AKIATEST".into(),
        secret_access_key: "secret".into(),
        session_token: "session".into(),
        expiration: Utc.with_ymd_and_hms(2024, 1, 15, 13, 0, 0).unwrap(),
    }
}
