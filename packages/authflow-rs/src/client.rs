//! Caller-facing client over the auth state machine.
//!
//! Category API calls translate to one initial event each; completion is
//! observed by bridging listener notifications on terminal state variants
//! into one-shot results, with a timeout backstop. The client never reads
//! or mutates state directly - it is an ordinary machine caller.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::data::{
    AuthConfiguration, AuthFlowType, ChallengeType, CodeDeliveryDetails, SessionCredentials,
    ConfirmSignInEventData, HostedUiOptions, SignInEventData, SignInMethod, SignInStep,
    SignOutEventData, SignUpEventData, SignedInData, SignedOutData,
};
use crate::environment::AuthEnvironment;
use crate::error::AuthError;
use crate::events::{
    AuthenticationEvent, AuthorizationEvent, SignInChallengeEvent, SignUpEvent,
};
use crate::machine::StateMachine;
use crate::states::{
    AuthState, AuthStateResolver, AuthenticationState, SignInChallengeState, SignInState,
    SignUpState,
};

/// Default wait for a caller-facing operation to reach a terminal state.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome of a sign-in call.
#[derive(Debug, Clone, PartialEq)]
pub enum SignInResult {
    /// The session is established.
    Done(SignedInData),
    /// The backend demands a challenge answer; continue with
    /// [`AuthClient::confirm_sign_in`].
    ChallengeRequired(ChallengeType, SignInStep),
}

/// Outcome of a sign-up call.
#[derive(Debug, Clone, PartialEq)]
pub enum SignUpOutcome {
    /// The registration is complete; the user can sign in.
    Done,
    /// A confirmation code was delivered; continue with
    /// [`AuthClient::confirm_sign_up`].
    ConfirmationRequired(Option<CodeDeliveryDetails>),
}

/// Client handle over a configured auth state machine.
pub struct AuthClient {
    machine: StateMachine<AuthStateResolver>,
    timeout: Duration,
}

impl AuthClient {
    /// Spawn a machine and configure it.
    pub fn new(configuration: AuthConfiguration, environment: AuthEnvironment) -> Self {
        let machine = StateMachine::new(AuthStateResolver, environment);
        machine.send(AuthenticationEvent::Configure(configuration));
        Self {
            machine,
            timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    /// Override the terminal-state timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The underlying machine, for callers that want raw events or
    /// listeners.
    pub fn machine(&self) -> &StateMachine<AuthStateResolver> {
        &self.machine
    }

    /// Sign in with username and password over SRP.
    pub async fn sign_in(
        &self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<SignInResult, AuthError> {
        self.request_sign_in(SignInEventData {
            username: username.into(),
            password: Some(password.into()),
            sign_in_method: SignInMethod::ApiBased(AuthFlowType::UserSrp),
        })
        .await
    }

    /// Sign in through the hosted UI.
    pub async fn sign_in_with_hosted_ui(
        &self,
        username_hint: impl Into<String>,
        options: HostedUiOptions,
    ) -> Result<SignInResult, AuthError> {
        self.request_sign_in(SignInEventData {
            username: username_hint.into(),
            password: None,
            sign_in_method: SignInMethod::HostedUi(options),
        })
        .await
    }

    /// Sign in with a WebAuthn credential.
    pub async fn sign_in_with_webauthn(
        &self,
        username: impl Into<String>,
    ) -> Result<SignInResult, AuthError> {
        self.request_sign_in(SignInEventData {
            username: username.into(),
            password: None,
            sign_in_method: SignInMethod::ApiBased(AuthFlowType::UserAuth),
        })
        .await
    }

    async fn request_sign_in(&self, data: SignInEventData) -> Result<SignInResult, AuthError> {
        self.await_ready().await?;
        self.machine.send(AuthenticationEvent::SignInRequested(data));
        self.await_sign_in_outcome().await
    }

    /// Wait for the configure bootstrap to settle.
    ///
    /// Requests issued against `Configured` (bootstrap still in flight)
    /// would be absorbed as no-ops, so every operation entry point waits
    /// for the authentication family to reach a settled variant first.
    async fn await_ready(&self) -> Result<(), AuthError> {
        self.wait_for(|state| match state.authentication() {
            Some(
                AuthenticationState::SignedIn(..)
                | AuthenticationState::SignedOut(..)
                | AuthenticationState::SigningIn(..)
                | AuthenticationState::SigningUp(..)
                | AuthenticationState::SigningOut(..)
                | AuthenticationState::Error(..),
            ) => Some(Ok(())),
            _ => None,
        })
        .await
    }

    /// Answer an outstanding challenge.
    ///
    /// Allowed again after an `Err`: challenge verification is retryable.
    pub async fn confirm_sign_in(
        &self,
        answer: impl Into<String>,
    ) -> Result<SignInResult, AuthError> {
        self.machine
            .send(SignInChallengeEvent::VerifyChallengeAnswer(
                ConfirmSignInEventData {
                    answer: answer.into(),
                    attributes: Default::default(),
                    metadata: Default::default(),
                },
            ));
        self.await_sign_in_outcome().await
    }

    async fn await_sign_in_outcome(&self) -> Result<SignInResult, AuthError> {
        let mut was_in_flight = false;
        self.wait_for(move |state| {
            let authn = state.authentication()?;
            match authn {
                AuthenticationState::SignedIn(_, data) => {
                    Some(Ok(SignInResult::Done(data.clone())))
                }
                AuthenticationState::SigningIn(_, sign_in) => {
                    was_in_flight = true;
                    match sign_in {
                        SignInState::ResolvingChallenge(
                            SignInChallengeState::WaitingForAnswer(challenge, _, step),
                            _,
                        ) => Some(Ok(SignInResult::ChallengeRequired(
                            challenge.challenge,
                            *step,
                        ))),
                        SignInState::ResolvingChallenge(
                            SignInChallengeState::Error { error, .. },
                            _,
                        ) => Some(Err(error.clone())),
                        _ => None,
                    }
                }
                AuthenticationState::Error(_, error) => Some(Err(error.clone())),
                // Back to signed out after an in-flight sign-in means the
                // flow was cancelled (user dismissal, webauthn cancel).
                AuthenticationState::SignedOut(..) if was_in_flight => {
                    Some(Err(AuthError::UserCancelled))
                }
                _ => None,
            }
        })
        .await
    }

    /// Abandon an in-flight sign-in.
    pub fn cancel_sign_in(&self) {
        self.machine.send(AuthenticationEvent::CancelSignIn);
    }

    /// Register a new user.
    pub async fn sign_up(&self, data: SignUpEventData) -> Result<SignUpOutcome, AuthError> {
        self.await_ready().await?;
        let username = data.username.clone();
        self.machine.send(AuthenticationEvent::SignUpRequested(data));

        self.wait_for(move |state| match state.authentication()? {
            AuthenticationState::SigningUp(_, SignUpState::AwaitingUserConfirmation(_, delivery)) => {
                Some(Ok(SignUpOutcome::ConfirmationRequired(delivery.clone())))
            }
            AuthenticationState::SigningUp(_, SignUpState::Error(error)) => {
                Some(Err(error.clone()))
            }
            AuthenticationState::SignedOut(_, data)
                if data.last_known_username.as_deref() == Some(username.as_str()) =>
            {
                Some(Ok(SignUpOutcome::Done))
            }
            AuthenticationState::Error(_, error) => Some(Err(error.clone())),
            _ => None,
        })
        .await
    }

    /// Confirm a registration with the delivered code.
    pub async fn confirm_sign_up(&self, code: impl Into<String>) -> Result<(), AuthError> {
        self.machine.send(SignUpEvent::ConfirmSignUp { code: code.into() });

        self.wait_for(|state| match state.authentication()? {
            AuthenticationState::SignedOut(_, data) if data.last_known_username.is_some() => {
                Some(Ok(()))
            }
            AuthenticationState::SigningUp(_, SignUpState::Error(error)) => {
                Some(Err(error.clone()))
            }
            AuthenticationState::Error(_, error) => Some(Err(error.clone())),
            _ => None,
        })
        .await
    }

    /// Abandon an in-flight sign-up.
    pub fn cancel_sign_up(&self) {
        self.machine.send(AuthenticationEvent::CancelSignUp);
    }

    /// Sign out, returning what the pipeline managed to clean up.
    pub async fn sign_out(&self, options: SignOutEventData) -> Result<SignedOutData, AuthError> {
        self.await_ready().await?;
        self.machine
            .send(AuthenticationEvent::SignOutRequested(options));

        let mut was_signing_out = false;
        self.wait_for(move |state| match state.authentication()? {
            AuthenticationState::SignedOut(_, data) => Some(Ok(data.clone())),
            AuthenticationState::SigningOut(..) => {
                was_signing_out = true;
                None
            }
            // The session came back: the user cancelled the sign-out.
            AuthenticationState::SignedIn(..) if was_signing_out => {
                Some(Err(AuthError::UserCancelled))
            }
            AuthenticationState::Error(_, error) => Some(Err(error.clone())),
            _ => None,
        })
        .await
    }

    /// Establish (or re-establish) the session's credentials.
    pub async fn fetch_auth_session(&self) -> Result<SessionCredentials, AuthError> {
        let tokens = match self.machine.current_state().await {
            Ok(state) => match state.authentication() {
                Some(AuthenticationState::SignedIn(_, data)) => Some(data.tokens.clone()),
                _ => None,
            },
            Err(_) => return Err(AuthError::Unknown("state machine stopped".into())),
        };

        self.machine
            .send(AuthorizationEvent::FetchAuthSession { tokens });

        self.wait_for(|state| match state.authorization()? {
            crate::states::AuthorizationState::SessionEstablished(_, credentials) => {
                Some(Ok(credentials.clone()))
            }
            crate::states::AuthorizationState::Error(_, error) => Some(Err(error.clone())),
            _ => None,
        })
        .await
    }

    /// Snapshot of the current root state.
    pub async fn current_state(&self) -> Result<AuthState, AuthError> {
        self.machine
            .current_state()
            .await
            .map_err(|_| AuthError::Unknown("state machine stopped".into()))
    }

    /// Bridge listener notifications into a one-shot result.
    ///
    /// The listener subscribes *after* the operation's event was enqueued,
    /// so the replay already reflects the applied request - the predicate
    /// sees the in-flight state first, then every change.
    async fn wait_for<T: Send + 'static>(
        &self,
        mut predicate: impl FnMut(&AuthState) -> Option<Result<T, AuthError>> + Send + 'static,
    ) -> Result<T, AuthError> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let token = self
            .machine
            .listen(move |state: &AuthState| {
                let _ = tx.send(state.clone());
            })
            .await
            .map_err(|_| AuthError::Unknown("state machine stopped".into()))?;

        let outcome = tokio::time::timeout(self.timeout, async {
            while let Some(state) = rx.recv().await {
                if let Some(result) = predicate(&state) {
                    return result;
                }
            }
            Err(AuthError::Unknown("state machine stopped".into()))
        })
        .await;

        self.machine.cancel(token);

        match outcome {
            Ok(result) => result,
            Err(_) => Err(AuthError::Timeout),
        }
    }
}
