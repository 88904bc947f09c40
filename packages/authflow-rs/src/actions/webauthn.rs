//! WebAuthn actions: option fetch, platform assertion, backend
//! verification.

use std::sync::Arc;

use async_trait::async_trait;

use crate::action::Action;
use crate::data::{
    AuthFlowType, CredentialAssertion, CredentialOptions, SignInEventData, SignInMethod,
    SignedInData,
};
use crate::dispatch::{DispatchEventExt, EventDispatcher};
use crate::environment::{AuthEnvironment, PresentationError};
use crate::events::WebAuthnEvent;

/// Kick the WebAuthn sub-machine into motion for a requested sign-in.
pub struct StartWebAuthnFlow {
    pub sign_in_data: SignInEventData,
}

#[async_trait]
impl Action for StartWebAuthnFlow {
    fn label(&self) -> &'static str {
        "StartWebAuthnFlow"
    }

    async fn execute(
        self: Box<Self>,
        dispatcher: Arc<dyn EventDispatcher>,
        _environment: Arc<AuthEnvironment>,
    ) {
        dispatcher.dispatch(WebAuthnEvent::FetchCredentialOptions(self.sign_in_data));
    }
}

/// Fetch the credential request options for a username.
pub struct FetchCredentialOptions {
    pub sign_in_data: SignInEventData,
}

#[async_trait]
impl Action for FetchCredentialOptions {
    fn label(&self) -> &'static str {
        "FetchCredentialOptions"
    }

    async fn execute(
        self: Box<Self>,
        dispatcher: Arc<dyn EventDispatcher>,
        environment: Arc<AuthEnvironment>,
    ) {
        match environment
            .webauthn
            .fetch_credential_options(&self.sign_in_data.username)
            .await
        {
            Ok(options) => {
                dispatcher.dispatch(WebAuthnEvent::AssertCredentials(options));
            }
            Err(error) => {
                dispatcher.dispatch(WebAuthnEvent::ThrowError(error.into()));
            }
        }
    }
}

/// Ask the platform authenticator for an assertion.
pub struct AssertCredentials {
    pub options: CredentialOptions,
}

#[async_trait]
impl Action for AssertCredentials {
    fn label(&self) -> &'static str {
        "AssertCredentials"
    }

    async fn execute(
        self: Box<Self>,
        dispatcher: Arc<dyn EventDispatcher>,
        environment: Arc<AuthEnvironment>,
    ) {
        match environment.webauthn.assert_credentials(&self.options).await {
            Ok(assertion) => {
                dispatcher.dispatch(WebAuthnEvent::VerifyCredentialsAndSignIn(assertion));
            }
            Err(PresentationError::Cancelled) => {
                dispatcher.dispatch(WebAuthnEvent::Cancel);
            }
            Err(PresentationError::Service(error)) => {
                dispatcher.dispatch(WebAuthnEvent::ThrowError(error.into()));
            }
        }
    }
}

/// Verify the assertion with the backend and complete the sign-in.
pub struct VerifyWebAuthnCredential {
    pub assertion: CredentialAssertion,
    pub username: String,
}

#[async_trait]
impl Action for VerifyWebAuthnCredential {
    fn label(&self) -> &'static str {
        "VerifyWebAuthnCredential"
    }

    async fn execute(
        self: Box<Self>,
        dispatcher: Arc<dyn EventDispatcher>,
        environment: Arc<AuthEnvironment>,
    ) {
        match environment.webauthn.verify_assertion(&self.assertion).await {
            Ok(tokens) => {
                dispatcher.dispatch(WebAuthnEvent::SignedIn(SignedInData::new(
                    self.username.clone(),
                    self.username,
                    SignInMethod::ApiBased(AuthFlowType::UserAuth),
                    tokens,
                )));
            }
            Err(error) => {
                dispatcher.dispatch(WebAuthnEvent::ThrowError(
                    crate::error::AuthError::WebAuthn(error.to_string()),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AuthError, ServiceError};
    use crate::testing::{mock_environment, test_tokens, CollectingDispatcher, MockWebAuthn};

    fn options() -> CredentialOptions {
        CredentialOptions {
            username: "alice".into(),
            options_json: "{}".into(),
        }
    }

    fn assertion() -> CredentialAssertion {
        CredentialAssertion {
            credential_id: "cred-1".into(),
            assertion_json: "{}".into(),
        }
    }

    #[tokio::test]
    async fn test_assert_credentials_forwards_assertion() {
        let mut env = mock_environment();
        env.webauthn = Arc::new(MockWebAuthn::new().with_assert_credentials(|_| {
            Ok(CredentialAssertion {
                credential_id: "cred-1".into(),
                assertion_json: "{}".into(),
            })
        }));

        let dispatcher = Arc::new(CollectingDispatcher::new());
        let action = Box::new(AssertCredentials { options: options() });
        action.execute(dispatcher.clone(), Arc::new(env)).await;

        assert!(matches!(
            dispatcher.events()[0].downcast_ref::<WebAuthnEvent>(),
            Some(WebAuthnEvent::VerifyCredentialsAndSignIn(_))
        ));
    }

    #[tokio::test]
    async fn test_assert_credentials_cancellation() {
        let mut env = mock_environment();
        env.webauthn = Arc::new(
            MockWebAuthn::new().with_assert_credentials(|_| Err(PresentationError::Cancelled)),
        );

        let dispatcher = Arc::new(CollectingDispatcher::new());
        let action = Box::new(AssertCredentials { options: options() });
        action.execute(dispatcher.clone(), Arc::new(env)).await;

        assert_eq!(
            dispatcher.events()[0].downcast_ref::<WebAuthnEvent>(),
            Some(&WebAuthnEvent::Cancel)
        );
    }

    #[tokio::test]
    async fn test_verify_assertion_signs_in_with_user_auth_method() {
        let mut env = mock_environment();
        env.webauthn =
            Arc::new(MockWebAuthn::new().with_verify_assertion(|_| Ok(test_tokens())));

        let dispatcher = Arc::new(CollectingDispatcher::new());
        let action = Box::new(VerifyWebAuthnCredential {
            assertion: assertion(),
            username: "alice".into(),
        });
        action.execute(dispatcher.clone(), Arc::new(env)).await;

        assert!(matches!(
            dispatcher.events()[0].downcast_ref::<WebAuthnEvent>(),
            Some(WebAuthnEvent::SignedIn(data))
                if data.sign_in_method == SignInMethod::ApiBased(AuthFlowType::UserAuth)
        ));
    }

    #[tokio::test]
    async fn test_verify_assertion_failure_is_webauthn_error() {
        let mut env = mock_environment();
        env.webauthn = Arc::new(
            MockWebAuthn::new().with_verify_assertion(|_| Err(ServiceError::NotAuthorized)),
        );

        let dispatcher = Arc::new(CollectingDispatcher::new());
        let action = Box::new(VerifyWebAuthnCredential {
            assertion: assertion(),
            username: "alice".into(),
        });
        action.execute(dispatcher.clone(), Arc::new(env)).await;

        assert!(matches!(
            dispatcher.events()[0].downcast_ref::<WebAuthnEvent>(),
            Some(WebAuthnEvent::ThrowError(AuthError::WebAuthn(_)))
        ));
    }
}
