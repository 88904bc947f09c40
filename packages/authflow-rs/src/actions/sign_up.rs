//! Sign-up actions.

use std::sync::Arc;

use async_trait::async_trait;

use crate::action::Action;
use crate::data::SignUpEventData;
use crate::dispatch::{DispatchEventExt, EventDispatcher};
use crate::environment::AuthEnvironment;
use crate::events::SignUpEvent;

/// Register a new user with the user pool.
pub struct InitiateSignUp {
    pub sign_up_data: SignUpEventData,
}

#[async_trait]
impl Action for InitiateSignUp {
    fn label(&self) -> &'static str {
        "InitiateSignUp"
    }

    async fn execute(
        self: Box<Self>,
        dispatcher: Arc<dyn EventDispatcher>,
        environment: Arc<AuthEnvironment>,
    ) {
        match environment.user_pool.sign_up(&self.sign_up_data).await {
            Ok(response) => {
                dispatcher.dispatch(SignUpEvent::SignUpInitiated {
                    user_confirmed: response.user_confirmed,
                    code_delivery: response.code_delivery,
                });
            }
            Err(error) => {
                dispatcher.dispatch(SignUpEvent::ThrowAuthError(error.into()));
            }
        }
    }
}

/// Confirm a registration with the delivered code.
pub struct ConfirmSignUp {
    pub username: String,
    pub code: String,
}

#[async_trait]
impl Action for ConfirmSignUp {
    fn label(&self) -> &'static str {
        "ConfirmSignUp"
    }

    async fn execute(
        self: Box<Self>,
        dispatcher: Arc<dyn EventDispatcher>,
        environment: Arc<AuthEnvironment>,
    ) {
        match environment
            .user_pool
            .confirm_sign_up(&self.username, &self.code)
            .await
        {
            Ok(()) => {
                dispatcher.dispatch(SignUpEvent::SignUpConfirmed);
            }
            Err(error) => {
                dispatcher.dispatch(SignUpEvent::ThrowAuthError(error.into()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{CodeDeliveryDetails, DeliveryMedium};
    use crate::environment::SignUpResponse;
    use crate::error::{AuthError, ServiceError};
    use crate::testing::{mock_environment, CollectingDispatcher, MockUserPool};

    fn sign_up_data() -> SignUpEventData {
        SignUpEventData {
            username: "alice".into(),
            password: "hunter2".into(),
            attributes: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_initiate_sign_up_reports_delivery() {
        let mut env = mock_environment();
        env.user_pool = Arc::new(MockUserPool::new().with_sign_up(|_| {
            Ok(SignUpResponse {
                user_sub: "sub-1".into(),
                user_confirmed: false,
                code_delivery: Some(CodeDeliveryDetails {
                    destination: "a***@example.com".into(),
                    medium: DeliveryMedium::Email,
                }),
            })
        }));

        let dispatcher = Arc::new(CollectingDispatcher::new());
        let action = Box::new(InitiateSignUp {
            sign_up_data: sign_up_data(),
        });
        action.execute(dispatcher.clone(), Arc::new(env)).await;

        assert!(matches!(
            dispatcher.events()[0].downcast_ref::<SignUpEvent>(),
            Some(SignUpEvent::SignUpInitiated {
                user_confirmed: false,
                code_delivery: Some(_),
            })
        ));
    }

    #[tokio::test]
    async fn test_confirm_sign_up_code_mismatch() {
        let mut env = mock_environment();
        env.user_pool = Arc::new(
            MockUserPool::new().with_confirm_sign_up(|_, _| Err(ServiceError::CodeMismatch)),
        );

        let dispatcher = Arc::new(CollectingDispatcher::new());
        let action = Box::new(ConfirmSignUp {
            username: "alice".into(),
            code: "0000".into(),
        });
        action.execute(dispatcher.clone(), Arc::new(env)).await;

        assert!(matches!(
            dispatcher.events()[0].downcast_ref::<SignUpEvent>(),
            Some(SignUpEvent::ThrowAuthError(AuthError::Service(
                ServiceError::CodeMismatch
            )))
        ));
    }
}
