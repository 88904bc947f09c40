//! Sign-in actions: the SRP exchange, challenge verification, and sign-in
//! completion.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};

use crate::action::Action;
use crate::data::{
    AuthFlowType, ConfirmSignInEventData, RespondToAuthChallenge, SignInEventData, SignInMethod,
    SignInStep, SignedInData, SrpStateData,
};
use crate::dispatch::{DispatchEventExt, EventDispatcher};
use crate::environment::{AuthEnvironment, SignInResponse};
use crate::error::AuthError;
use crate::events::{
    AuthenticationEvent, AuthorizationEvent, SignInChallengeEvent, SignInEvent, SrpSignInEvent,
};

/// Kick the SRP sub-machine into motion for a requested sign-in.
///
/// Pure dispatch - the backend call happens in [`InitiateAuthSrp`] once the
/// SRP sub-machine has accepted the flow.
pub struct StartSrpFlow {
    pub sign_in_data: SignInEventData,
}

#[async_trait]
impl Action for StartSrpFlow {
    fn label(&self) -> &'static str {
        "StartSrpFlow"
    }

    async fn execute(
        self: Box<Self>,
        dispatcher: Arc<dyn EventDispatcher>,
        _environment: Arc<AuthEnvironment>,
    ) {
        dispatcher.dispatch(SrpSignInEvent::InitiateSrp(self.sign_in_data));
    }
}

/// First SRP round trip: send SRP_A, receive the password-verifier
/// challenge.
pub struct InitiateAuthSrp {
    pub sign_in_data: SignInEventData,
}

#[async_trait]
impl Action for InitiateAuthSrp {
    fn label(&self) -> &'static str {
        "InitiateAuthSrp"
    }

    async fn execute(
        self: Box<Self>,
        dispatcher: Arc<dyn EventDispatcher>,
        environment: Arc<AuthEnvironment>,
    ) {
        let Some(password) = self.sign_in_data.password.clone() else {
            dispatcher.dispatch(SrpSignInEvent::ThrowAuthError(AuthError::Validation(
                "srp sign in requires a password".into(),
            )));
            return;
        };

        match environment
            .user_pool
            .initiate_srp_auth(&self.sign_in_data.username)
            .await
        {
            Ok(challenge) => {
                debug!(username = %self.sign_in_data.username, "srp flow initiated");
                dispatcher.dispatch(SrpSignInEvent::RespondPasswordVerifier(SrpStateData {
                    username: self.sign_in_data.username,
                    password,
                    client_timestamp: Utc::now(),
                    challenge,
                }));
            }
            Err(error) => {
                dispatcher.dispatch(SrpSignInEvent::ThrowAuthError(error.into()));
            }
        }
    }
}

/// Second SRP round trip: answer the password verifier with the proof.
///
/// The outcome is either a full session, another challenge, or a failure.
pub struct VerifyPasswordSrp {
    pub srp_state: SrpStateData,
}

#[async_trait]
impl Action for VerifyPasswordSrp {
    fn label(&self) -> &'static str {
        "VerifyPasswordSrp"
    }

    async fn execute(
        self: Box<Self>,
        dispatcher: Arc<dyn EventDispatcher>,
        environment: Arc<AuthEnvironment>,
    ) {
        match environment
            .user_pool
            .respond_to_password_verifier(&self.srp_state)
            .await
        {
            Ok(SignInResponse::Tokens(tokens)) => {
                // USER_ID_FOR_SRP is authoritative when the pool aliases
                // usernames; fall back to the name the caller signed in with.
                let user_id = self
                    .srp_state
                    .challenge
                    .parameters
                    .get("USER_ID_FOR_SRP")
                    .cloned()
                    .unwrap_or_else(|| self.srp_state.username.clone());
                dispatcher.dispatch(SignInEvent::FinalizeSignIn(SignedInData::new(
                    user_id,
                    self.srp_state.username.clone(),
                    SignInMethod::ApiBased(AuthFlowType::UserSrp),
                    tokens,
                )));
            }
            Ok(SignInResponse::Challenge(challenge)) => {
                dispatcher.dispatch(SignInEvent::ReceivedChallenge(challenge));
            }
            Err(error) => {
                dispatcher.dispatch(SrpSignInEvent::ThrowAuthError(error.into()));
            }
        }
    }
}

/// Move a freshly received challenge into its waiting state.
pub struct InitializeResolveChallenge {
    pub challenge: RespondToAuthChallenge,
    pub sign_in_method: SignInMethod,
}

#[async_trait]
impl Action for InitializeResolveChallenge {
    fn label(&self) -> &'static str {
        "InitializeResolveChallenge"
    }

    async fn execute(
        self: Box<Self>,
        dispatcher: Arc<dyn EventDispatcher>,
        _environment: Arc<AuthEnvironment>,
    ) {
        let step = SignInStep::for_challenge(self.challenge.challenge);
        dispatcher.dispatch(SignInChallengeEvent::WaitForAnswer(
            self.challenge,
            self.sign_in_method,
            step,
        ));
    }
}

/// Verify a challenge answer with the backend.
pub struct VerifySignInChallenge {
    pub challenge: RespondToAuthChallenge,
    pub answer: ConfirmSignInEventData,
    pub sign_in_method: SignInMethod,
}

#[async_trait]
impl Action for VerifySignInChallenge {
    fn label(&self) -> &'static str {
        "VerifySignInChallenge"
    }

    async fn execute(
        self: Box<Self>,
        dispatcher: Arc<dyn EventDispatcher>,
        environment: Arc<AuthEnvironment>,
    ) {
        match environment
            .user_pool
            .respond_to_challenge(&self.challenge, &self.answer)
            .await
        {
            Ok(SignInResponse::Tokens(tokens)) => {
                dispatcher.dispatch(SignInEvent::FinalizeSignIn(SignedInData::new(
                    self.challenge.username.clone(),
                    self.challenge.username.clone(),
                    self.sign_in_method,
                    tokens,
                )));
            }
            Ok(SignInResponse::Challenge(next)) => {
                dispatcher.dispatch(SignInEvent::ReceivedChallenge(next));
            }
            Err(error) => {
                dispatcher.dispatch(SignInChallengeEvent::ThrowAuthError(error.into()));
            }
        }
    }
}

/// Persist the session and hand off to the authorization family.
pub struct SignInComplete {
    pub signed_in_data: SignedInData,
}

#[async_trait]
impl Action for SignInComplete {
    fn label(&self) -> &'static str {
        "SignInComplete"
    }

    async fn execute(
        self: Box<Self>,
        dispatcher: Arc<dyn EventDispatcher>,
        environment: Arc<AuthEnvironment>,
    ) {
        if let Err(error) = environment.credential_store.save(&self.signed_in_data).await {
            // A broken cache loses the session across restarts but must not
            // fail the sign-in that just succeeded.
            warn!(%error, "failed to cache session");
        }
        dispatcher.dispatch(AuthorizationEvent::FetchAuthSession {
            tokens: Some(self.signed_in_data.tokens.clone()),
        });
    }
}

/// Abandon the in-flight sign-in.
pub struct CancelSignIn;

#[async_trait]
impl Action for CancelSignIn {
    fn label(&self) -> &'static str {
        "CancelSignIn"
    }

    async fn execute(
        self: Box<Self>,
        dispatcher: Arc<dyn EventDispatcher>,
        _environment: Arc<AuthEnvironment>,
    ) {
        dispatcher.dispatch(AuthenticationEvent::CancelSignIn);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ChallengeType;
    use crate::error::ServiceError;
    use crate::testing::{
        mock_environment, test_challenge, test_tokens, CollectingDispatcher, MockUserPool,
    };

    fn srp_state() -> SrpStateData {
        SrpStateData {
            username: "alice".into(),
            password: "hunter2".into(),
            client_timestamp: Utc::now(),
            challenge: test_challenge(ChallengeType::DeviceSrpAuth, "alice"),
        }
    }

    #[tokio::test]
    async fn test_initiate_auth_srp_dispatches_password_verifier() {
        let mut env = mock_environment();
        env.user_pool = Arc::new(MockUserPool::new().with_initiate_srp_auth(|username| {
            Ok(test_challenge(ChallengeType::DeviceSrpAuth, username))
        }));

        let dispatcher = Arc::new(CollectingDispatcher::new());
        let action = Box::new(InitiateAuthSrp {
            sign_in_data: SignInEventData {
                username: "alice".into(),
                password: Some("hunter2".into()),
                sign_in_method: SignInMethod::ApiBased(AuthFlowType::UserSrp),
            },
        });
        action.execute(dispatcher.clone(), Arc::new(env)).await;

        let events = dispatcher.events();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0].downcast_ref::<SrpSignInEvent>(),
            Some(SrpSignInEvent::RespondPasswordVerifier(state)) if state.username == "alice"
        ));
    }

    #[tokio::test]
    async fn test_initiate_auth_srp_without_password_throws() {
        let dispatcher = Arc::new(CollectingDispatcher::new());
        let action = Box::new(InitiateAuthSrp {
            sign_in_data: SignInEventData {
                username: "alice".into(),
                password: None,
                sign_in_method: SignInMethod::ApiBased(AuthFlowType::UserSrp),
            },
        });
        action
            .execute(dispatcher.clone(), Arc::new(mock_environment()))
            .await;

        assert!(matches!(
            dispatcher.events()[0].downcast_ref::<SrpSignInEvent>(),
            Some(SrpSignInEvent::ThrowAuthError(AuthError::Validation(_)))
        ));
    }

    #[tokio::test]
    async fn test_verify_password_srp_finalizes_on_tokens() {
        let mut env = mock_environment();
        env.user_pool = Arc::new(
            MockUserPool::new()
                .with_respond_to_password_verifier(|_| Ok(SignInResponse::Tokens(test_tokens()))),
        );

        let dispatcher = Arc::new(CollectingDispatcher::new());
        let action = Box::new(VerifyPasswordSrp {
            srp_state: srp_state(),
        });
        action.execute(dispatcher.clone(), Arc::new(env)).await;

        assert!(matches!(
            dispatcher.events()[0].downcast_ref::<SignInEvent>(),
            Some(SignInEvent::FinalizeSignIn(data)) if data.username == "alice"
        ));
    }

    #[tokio::test]
    async fn test_verify_password_srp_forwards_challenge() {
        let mut env = mock_environment();
        env.user_pool =
            Arc::new(MockUserPool::new().with_respond_to_password_verifier(|_| {
                Ok(SignInResponse::Challenge(test_challenge(
                    ChallengeType::SmsMfa,
                    "alice",
                )))
            }));

        let dispatcher = Arc::new(CollectingDispatcher::new());
        let action = Box::new(VerifyPasswordSrp {
            srp_state: srp_state(),
        });
        action.execute(dispatcher.clone(), Arc::new(env)).await;

        assert!(matches!(
            dispatcher.events()[0].downcast_ref::<SignInEvent>(),
            Some(SignInEvent::ReceivedChallenge(c)) if c.challenge == ChallengeType::SmsMfa
        ));
    }

    #[tokio::test]
    async fn test_verify_challenge_success_finalizes_sign_in() {
        let mut env = mock_environment();
        env.user_pool = Arc::new(
            MockUserPool::new()
                .with_respond_to_challenge(|_, _| Ok(SignInResponse::Tokens(test_tokens()))),
        );

        let dispatcher = Arc::new(CollectingDispatcher::new());
        let action = Box::new(VerifySignInChallenge {
            challenge: test_challenge(ChallengeType::SmsMfa, "alice"),
            answer: ConfirmSignInEventData {
                answer: "1233".into(),
                attributes: Default::default(),
                metadata: Default::default(),
            },
            sign_in_method: SignInMethod::ApiBased(AuthFlowType::UserSrp),
        });
        action.execute(dispatcher.clone(), Arc::new(env)).await;

        assert!(matches!(
            dispatcher.events()[0].downcast_ref::<SignInEvent>(),
            Some(SignInEvent::FinalizeSignIn(_))
        ));
    }

    #[tokio::test]
    async fn test_verify_challenge_service_error_throws_in_family() {
        let mut env = mock_environment();
        env.user_pool = Arc::new(
            MockUserPool::new().with_respond_to_challenge(|_, _| Err(ServiceError::CodeMismatch)),
        );

        let dispatcher = Arc::new(CollectingDispatcher::new());
        let action = Box::new(VerifySignInChallenge {
            challenge: test_challenge(ChallengeType::SmsMfa, "alice"),
            answer: ConfirmSignInEventData {
                answer: "0000".into(),
                attributes: Default::default(),
                metadata: Default::default(),
            },
            sign_in_method: SignInMethod::ApiBased(AuthFlowType::UserSrp),
        });
        action.execute(dispatcher.clone(), Arc::new(env)).await;

        assert!(matches!(
            dispatcher.events()[0].downcast_ref::<SignInChallengeEvent>(),
            Some(SignInChallengeEvent::ThrowAuthError(AuthError::Service(
                ServiceError::CodeMismatch
            )))
        ));
    }

    #[tokio::test]
    async fn test_sign_in_complete_requests_session() {
        let dispatcher = Arc::new(CollectingDispatcher::new());
        let action = Box::new(SignInComplete {
            signed_in_data: crate::testing::test_signed_in_data("alice"),
        });
        action
            .execute(dispatcher.clone(), Arc::new(mock_environment()))
            .await;

        assert!(matches!(
            dispatcher.events()[0].downcast_ref::<AuthorizationEvent>(),
            Some(AuthorizationEvent::FetchAuthSession { tokens: Some(_) })
        ));
    }
}
