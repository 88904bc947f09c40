//! Sign-out actions.
//!
//! The pipeline runs front to back: hosted UI sign-out (when applicable),
//! global sign-out, token revocation, local sign-out. Only the local step
//! is load-bearing; everything before it is best-effort and its failures
//! are carried forward in the events.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::action::Action;
use crate::data::{
    GlobalSignOutError, HostedUiError, RevokeTokenError, SignInMethod, SignOutEventData,
    SignedInData,
};
use crate::dispatch::{DispatchEventExt, EventDispatcher};
use crate::environment::{AuthEnvironment, PresentationError};
use crate::events::{AuthenticationEvent, SignOutEvent};

/// Translate a sign-out request into the first pipeline event.
pub struct InitiateSignOut {
    pub sign_out_data: SignOutEventData,
    pub signed_in_data: SignedInData,
}

#[async_trait]
impl Action for InitiateSignOut {
    fn label(&self) -> &'static str {
        "InitiateSignOut"
    }

    async fn execute(
        self: Box<Self>,
        dispatcher: Arc<dyn EventDispatcher>,
        _environment: Arc<AuthEnvironment>,
    ) {
        let via_hosted_ui = matches!(
            self.signed_in_data.sign_in_method,
            SignInMethod::HostedUi(_)
        );

        let event = if via_hosted_ui {
            SignOutEvent::InvokeHostedUiSignOut {
                sign_out_data: self.sign_out_data,
                signed_in_data: self.signed_in_data,
            }
        } else if self.sign_out_data.global_sign_out {
            SignOutEvent::SignOutGlobally {
                signed_in_data: self.signed_in_data,
                hosted_ui_error: None,
            }
        } else {
            SignOutEvent::RevokeToken {
                signed_in_data: self.signed_in_data,
                hosted_ui_error: None,
                global_sign_out_error: None,
            }
        };
        dispatcher.dispatch(event);
    }
}

/// Present the hosted UI sign-out page, then continue the pipeline.
pub struct ShowHostedUiSignOut {
    pub sign_out_data: SignOutEventData,
    pub signed_in_data: SignedInData,
}

#[async_trait]
impl Action for ShowHostedUiSignOut {
    fn label(&self) -> &'static str {
        "ShowHostedUiSignOut"
    }

    async fn execute(
        self: Box<Self>,
        dispatcher: Arc<dyn EventDispatcher>,
        environment: Arc<AuthEnvironment>,
    ) {
        let private_session = match &self.signed_in_data.sign_in_method {
            SignInMethod::HostedUi(options) => options.private_session,
            SignInMethod::ApiBased(_) => false,
        };

        let hosted_ui_error = match environment
            .hosted_ui
            .present_sign_out(private_session)
            .await
        {
            Ok(()) => None,
            Err(PresentationError::Cancelled) => {
                dispatcher.dispatch(SignOutEvent::UserCancelled);
                return;
            }
            Err(PresentationError::Service(error)) => Some(HostedUiError { error }),
        };

        let event = if self.sign_out_data.global_sign_out {
            SignOutEvent::SignOutGlobally {
                signed_in_data: self.signed_in_data,
                hosted_ui_error,
            }
        } else {
            SignOutEvent::RevokeToken {
                signed_in_data: self.signed_in_data,
                hosted_ui_error,
                global_sign_out_error: None,
            }
        };
        dispatcher.dispatch(event);
    }
}

/// Invalidate tokens on every device.
pub struct SignOutGlobally {
    pub signed_in_data: SignedInData,
    pub hosted_ui_error: Option<HostedUiError>,
}

#[async_trait]
impl Action for SignOutGlobally {
    fn label(&self) -> &'static str {
        "SignOutGlobally"
    }

    async fn execute(
        self: Box<Self>,
        dispatcher: Arc<dyn EventDispatcher>,
        environment: Arc<AuthEnvironment>,
    ) {
        let access_token = self.signed_in_data.tokens.access_token.clone();
        match environment.user_pool.global_sign_out(&access_token).await {
            Ok(()) => {
                dispatcher.dispatch(SignOutEvent::RevokeToken {
                    signed_in_data: self.signed_in_data,
                    hosted_ui_error: self.hosted_ui_error,
                    global_sign_out_error: None,
                });
            }
            Err(error) => {
                dispatcher.dispatch(SignOutEvent::GlobalSignOutError {
                    signed_in_data: self.signed_in_data,
                    global_sign_out_error: GlobalSignOutError {
                        access_token,
                        error,
                    },
                    hosted_ui_error: self.hosted_ui_error,
                });
            }
        }
    }
}

/// Revoke the refresh token.
pub struct RevokeToken {
    pub signed_in_data: SignedInData,
    pub hosted_ui_error: Option<HostedUiError>,
    pub global_sign_out_error: Option<GlobalSignOutError>,
}

#[async_trait]
impl Action for RevokeToken {
    fn label(&self) -> &'static str {
        "RevokeToken"
    }

    async fn execute(
        self: Box<Self>,
        dispatcher: Arc<dyn EventDispatcher>,
        environment: Arc<AuthEnvironment>,
    ) {
        let refresh_token = self.signed_in_data.tokens.refresh_token.clone();
        let revoke_token_error = match environment.user_pool.revoke_token(&refresh_token).await {
            Ok(()) => None,
            Err(error) => Some(RevokeTokenError {
                refresh_token,
                error,
            }),
        };

        dispatcher.dispatch(SignOutEvent::SignOutLocally {
            signed_in_data: Some(self.signed_in_data),
            hosted_ui_error: self.hosted_ui_error,
            global_sign_out_error: self.global_sign_out_error,
            revoke_token_error,
        });
    }
}

/// A failed global sign-out leaves the refresh token unusable for
/// revocation; synthesize the revoke error and skip straight to the local
/// step.
pub struct BuildRevokeTokenError {
    pub signed_in_data: SignedInData,
    pub hosted_ui_error: Option<HostedUiError>,
    pub global_sign_out_error: GlobalSignOutError,
}

#[async_trait]
impl Action for BuildRevokeTokenError {
    fn label(&self) -> &'static str {
        "BuildRevokeTokenError"
    }

    async fn execute(
        self: Box<Self>,
        dispatcher: Arc<dyn EventDispatcher>,
        _environment: Arc<AuthEnvironment>,
    ) {
        let revoke_token_error = RevokeTokenError {
            refresh_token: self.signed_in_data.tokens.refresh_token.clone(),
            error: self.global_sign_out_error.error.clone(),
        };
        dispatcher.dispatch(SignOutEvent::SignOutLocally {
            signed_in_data: Some(self.signed_in_data),
            hosted_ui_error: self.hosted_ui_error,
            global_sign_out_error: Some(self.global_sign_out_error),
            revoke_token_error: Some(revoke_token_error),
        });
    }
}

/// Clear the cached session.
pub struct SignOutLocally {
    pub hosted_ui_error: Option<HostedUiError>,
    pub global_sign_out_error: Option<GlobalSignOutError>,
    pub revoke_token_error: Option<RevokeTokenError>,
}

#[async_trait]
impl Action for SignOutLocally {
    fn label(&self) -> &'static str {
        "SignOutLocally"
    }

    async fn execute(
        self: Box<Self>,
        dispatcher: Arc<dyn EventDispatcher>,
        environment: Arc<AuthEnvironment>,
    ) {
        match environment.credential_store.clear().await {
            Ok(()) => {
                dispatcher.dispatch(SignOutEvent::SignedOutSuccess {
                    hosted_ui_error: self.hosted_ui_error,
                    global_sign_out_error: self.global_sign_out_error,
                    revoke_token_error: self.revoke_token_error,
                });
            }
            Err(error) => {
                warn!(%error, "failed to clear cached session");
                dispatcher.dispatch(SignOutEvent::SignedOutFailure);
            }
        }
    }
}

/// Restore the signed-in session after a user-cancelled sign-out.
pub struct CancelSignOut {
    pub signed_in_data: SignedInData,
}

#[async_trait]
impl Action for CancelSignOut {
    fn label(&self) -> &'static str {
        "CancelSignOut"
    }

    async fn execute(
        self: Box<Self>,
        dispatcher: Arc<dyn EventDispatcher>,
        _environment: Arc<AuthEnvironment>,
    ) {
        dispatcher.dispatch(AuthenticationEvent::SignOutCancelled(self.signed_in_data));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::testing::{
        mock_environment, test_signed_in_data, CollectingDispatcher, MockUserPool,
    };

    #[tokio::test]
    async fn test_initiate_sign_out_global() {
        let dispatcher = Arc::new(CollectingDispatcher::new());
        let action = Box::new(InitiateSignOut {
            sign_out_data: SignOutEventData {
                global_sign_out: true,
            },
            signed_in_data: test_signed_in_data("alice"),
        });
        action
            .execute(dispatcher.clone(), Arc::new(mock_environment()))
            .await;

        assert!(matches!(
            dispatcher.events()[0].downcast_ref::<SignOutEvent>(),
            Some(SignOutEvent::SignOutGlobally { .. })
        ));
    }

    #[tokio::test]
    async fn test_initiate_sign_out_local_only() {
        let dispatcher = Arc::new(CollectingDispatcher::new());
        let action = Box::new(InitiateSignOut {
            sign_out_data: SignOutEventData::default(),
            signed_in_data: test_signed_in_data("alice"),
        });
        action
            .execute(dispatcher.clone(), Arc::new(mock_environment()))
            .await;

        assert!(matches!(
            dispatcher.events()[0].downcast_ref::<SignOutEvent>(),
            Some(SignOutEvent::RevokeToken {
                global_sign_out_error: None,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_global_sign_out_success_moves_to_revoke() {
        let mut env = mock_environment();
        env.user_pool = Arc::new(MockUserPool::new().with_global_sign_out(|_| Ok(())));

        let dispatcher = Arc::new(CollectingDispatcher::new());
        let action = Box::new(SignOutGlobally {
            signed_in_data: test_signed_in_data("alice"),
            hosted_ui_error: None,
        });
        action.execute(dispatcher.clone(), Arc::new(env)).await;

        assert!(matches!(
            dispatcher.events()[0].downcast_ref::<SignOutEvent>(),
            Some(SignOutEvent::RevokeToken { .. })
        ));
    }

    #[tokio::test]
    async fn test_global_sign_out_failure_reports_error() {
        let mut env = mock_environment();
        env.user_pool = Arc::new(
            MockUserPool::new().with_global_sign_out(|_| Err(ServiceError::NotAuthorized)),
        );

        let dispatcher = Arc::new(CollectingDispatcher::new());
        let action = Box::new(SignOutGlobally {
            signed_in_data: test_signed_in_data("alice"),
            hosted_ui_error: None,
        });
        action.execute(dispatcher.clone(), Arc::new(env)).await;

        assert!(matches!(
            dispatcher.events()[0].downcast_ref::<SignOutEvent>(),
            Some(SignOutEvent::GlobalSignOutError {
                global_sign_out_error,
                ..
            }) if global_sign_out_error.error == ServiceError::NotAuthorized
        ));
    }

    #[tokio::test]
    async fn test_revoke_token_failure_rides_into_local_sign_out() {
        let mut env = mock_environment();
        env.user_pool =
            Arc::new(MockUserPool::new().with_revoke_token(|_| Err(ServiceError::NotAuthorized)));

        let dispatcher = Arc::new(CollectingDispatcher::new());
        let action = Box::new(RevokeToken {
            signed_in_data: test_signed_in_data("alice"),
            hosted_ui_error: None,
            global_sign_out_error: None,
        });
        action.execute(dispatcher.clone(), Arc::new(env)).await;

        assert!(matches!(
            dispatcher.events()[0].downcast_ref::<SignOutEvent>(),
            Some(SignOutEvent::SignOutLocally {
                revoke_token_error: Some(_),
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_sign_out_locally_success() {
        let dispatcher = Arc::new(CollectingDispatcher::new());
        let action = Box::new(SignOutLocally {
            hosted_ui_error: None,
            global_sign_out_error: None,
            revoke_token_error: None,
        });
        action
            .execute(dispatcher.clone(), Arc::new(mock_environment()))
            .await;

        assert!(matches!(
            dispatcher.events()[0].downcast_ref::<SignOutEvent>(),
            Some(SignOutEvent::SignedOutSuccess { .. })
        ));
    }

    #[tokio::test]
    async fn test_cancel_sign_out_restores_session() {
        let dispatcher = Arc::new(CollectingDispatcher::new());
        let data = test_signed_in_data("alice");
        let action = Box::new(CancelSignOut {
            signed_in_data: data.clone(),
        });
        action
            .execute(dispatcher.clone(), Arc::new(mock_environment()))
            .await;

        assert_eq!(
            dispatcher.events()[0].downcast_ref::<AuthenticationEvent>(),
            Some(&AuthenticationEvent::SignOutCancelled(data))
        );
    }
}
