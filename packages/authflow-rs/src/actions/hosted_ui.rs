//! Hosted UI actions: presentation and token exchange.

use std::sync::Arc;

use async_trait::async_trait;

use crate::action::Action;
use crate::data::{HostedUiOptions, SignInMethod, SignedInData};
use crate::dispatch::{DispatchEventExt, EventDispatcher};
use crate::environment::{AuthEnvironment, PresentationError};
use crate::error::AuthError;
use crate::events::{HostedUiEvent, SignInEvent};

/// Kick the hosted UI sub-machine into motion for a requested sign-in.
pub struct StartHostedUiFlow {
    pub options: HostedUiOptions,
}

#[async_trait]
impl Action for StartHostedUiFlow {
    fn label(&self) -> &'static str {
        "StartHostedUiFlow"
    }

    async fn execute(
        self: Box<Self>,
        dispatcher: Arc<dyn EventDispatcher>,
        _environment: Arc<AuthEnvironment>,
    ) {
        dispatcher.dispatch(HostedUiEvent::ShowHostedUi(self.options));
    }
}

/// Present the hosted sign-in page and capture the authorization code.
pub struct ShowHostedUi {
    pub options: HostedUiOptions,
}

#[async_trait]
impl Action for ShowHostedUi {
    fn label(&self) -> &'static str {
        "ShowHostedUi"
    }

    async fn execute(
        self: Box<Self>,
        dispatcher: Arc<dyn EventDispatcher>,
        environment: Arc<AuthEnvironment>,
    ) {
        match environment.hosted_ui.present_sign_in(&self.options).await {
            Ok(code) => {
                dispatcher.dispatch(HostedUiEvent::FetchToken(code));
            }
            Err(PresentationError::Cancelled) => {
                dispatcher.dispatch(HostedUiEvent::ThrowError(AuthError::UserCancelled));
            }
            Err(PresentationError::Service(error)) => {
                dispatcher.dispatch(HostedUiEvent::ThrowError(error.into()));
            }
        }
    }
}

/// Exchange the authorization code for tokens and finish the sign-in.
pub struct FetchHostedUiToken {
    pub code: String,
    pub options: HostedUiOptions,
}

#[async_trait]
impl Action for FetchHostedUiToken {
    fn label(&self) -> &'static str {
        "FetchHostedUiToken"
    }

    async fn execute(
        self: Box<Self>,
        dispatcher: Arc<dyn EventDispatcher>,
        environment: Arc<AuthEnvironment>,
    ) {
        match environment.hosted_ui.exchange_code(&self.code).await {
            Ok(hosted) => {
                dispatcher.dispatch(SignInEvent::FinalizeSignIn(SignedInData::new(
                    hosted.username.clone(),
                    hosted.username,
                    SignInMethod::HostedUi(self.options),
                    hosted.tokens,
                )));
            }
            Err(error) => {
                dispatcher.dispatch(HostedUiEvent::ThrowError(error.into()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::testing::{mock_environment, test_tokens, CollectingDispatcher, MockHostedUi};

    fn options() -> HostedUiOptions {
        HostedUiOptions {
            scopes: vec!["openid".into()],
            provider: None,
            private_session: false,
        }
    }

    #[tokio::test]
    async fn test_show_hosted_ui_forwards_code() {
        let mut env = mock_environment();
        env.hosted_ui = Arc::new(MockHostedUi::new().with_present_sign_in(|_| Ok("code-1".into())));

        let dispatcher = Arc::new(CollectingDispatcher::new());
        let action = Box::new(ShowHostedUi { options: options() });
        action.execute(dispatcher.clone(), Arc::new(env)).await;

        assert_eq!(
            dispatcher.events()[0].downcast_ref::<HostedUiEvent>(),
            Some(&HostedUiEvent::FetchToken("code-1".into()))
        );
    }

    #[tokio::test]
    async fn test_show_hosted_ui_cancellation_becomes_user_cancelled() {
        let mut env = mock_environment();
        env.hosted_ui =
            Arc::new(MockHostedUi::new().with_present_sign_in(|_| Err(PresentationError::Cancelled)));

        let dispatcher = Arc::new(CollectingDispatcher::new());
        let action = Box::new(ShowHostedUi { options: options() });
        action.execute(dispatcher.clone(), Arc::new(env)).await;

        assert_eq!(
            dispatcher.events()[0].downcast_ref::<HostedUiEvent>(),
            Some(&HostedUiEvent::ThrowError(AuthError::UserCancelled))
        );
    }

    #[tokio::test]
    async fn test_fetch_token_finalizes_sign_in() {
        let mut env = mock_environment();
        env.hosted_ui = Arc::new(MockHostedUi::new().with_exchange_code(|_| {
            Ok(crate::environment::HostedUiTokens {
                tokens: test_tokens(),
                username: "alice".into(),
            })
        }));

        let dispatcher = Arc::new(CollectingDispatcher::new());
        let action = Box::new(FetchHostedUiToken {
            code: "code-1".into(),
            options: options(),
        });
        action.execute(dispatcher.clone(), Arc::new(env)).await;

        assert!(matches!(
            dispatcher.events()[0].downcast_ref::<SignInEvent>(),
            Some(SignInEvent::FinalizeSignIn(data))
                if data.username == "alice"
                    && matches!(data.sign_in_method, SignInMethod::HostedUi(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_token_failure_throws() {
        let mut env = mock_environment();
        env.hosted_ui = Arc::new(
            MockHostedUi::new().with_exchange_code(|_| Err(ServiceError::InvalidResponse)),
        );

        let dispatcher = Arc::new(CollectingDispatcher::new());
        let action = Box::new(FetchHostedUiToken {
            code: "code-1".into(),
            options: options(),
        });
        action.execute(dispatcher.clone(), Arc::new(env)).await;

        assert!(matches!(
            dispatcher.events()[0].downcast_ref::<HostedUiEvent>(),
            Some(HostedUiEvent::ThrowError(AuthError::Service(
                ServiceError::InvalidResponse
            )))
        ));
    }
}
