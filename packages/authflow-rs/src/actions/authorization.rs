//! Authorization actions: identity resolution and credential vending.

use std::sync::Arc;

use async_trait::async_trait;

use crate::action::Action;
use crate::data::UserPoolTokens;
use crate::dispatch::{DispatchEventExt, EventDispatcher};
use crate::environment::AuthEnvironment;
use crate::events::FetchAuthSessionEvent;

/// Resolve the identity id from the identity pool.
pub struct FetchIdentityId {
    pub tokens: Option<UserPoolTokens>,
}

#[async_trait]
impl Action for FetchIdentityId {
    fn label(&self) -> &'static str {
        "FetchIdentityId"
    }

    async fn execute(
        self: Box<Self>,
        dispatcher: Arc<dyn EventDispatcher>,
        environment: Arc<AuthEnvironment>,
    ) {
        match environment.identity.identity_id(self.tokens.as_ref()).await {
            Ok(identity_id) => {
                dispatcher.dispatch(FetchAuthSessionEvent::FetchedIdentityId(identity_id));
            }
            Err(error) => {
                dispatcher.dispatch(FetchAuthSessionEvent::ThrowError(error.into()));
            }
        }
    }
}

/// Fetch AWS credentials for a resolved identity.
pub struct FetchAwsCredentials {
    pub identity_id: String,
    pub tokens: Option<UserPoolTokens>,
}

#[async_trait]
impl Action for FetchAwsCredentials {
    fn label(&self) -> &'static str {
        "FetchAwsCredentials"
    }

    async fn execute(
        self: Box<Self>,
        dispatcher: Arc<dyn EventDispatcher>,
        environment: Arc<AuthEnvironment>,
    ) {
        match environment
            .identity
            .aws_credentials(&self.identity_id, self.tokens.as_ref())
            .await
        {
            Ok(credentials) => {
                dispatcher.dispatch(FetchAuthSessionEvent::FetchedAwsCredentials(credentials));
            }
            Err(error) => {
                dispatcher.dispatch(FetchAuthSessionEvent::ThrowError(error.into()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AuthError, ServiceError};
    use crate::testing::{
        mock_environment, test_aws_credentials, test_tokens, CollectingDispatcher, MockIdentity,
    };

    #[tokio::test]
    async fn test_fetch_identity_id() {
        let mut env = mock_environment();
        env.identity =
            Arc::new(MockIdentity::new().with_identity_id(|_| Ok("us-east-1:ident".into())));

        let dispatcher = Arc::new(CollectingDispatcher::new());
        let action = Box::new(FetchIdentityId {
            tokens: Some(test_tokens()),
        });
        action.execute(dispatcher.clone(), Arc::new(env)).await;

        assert_eq!(
            dispatcher.events()[0].downcast_ref::<FetchAuthSessionEvent>(),
            Some(&FetchAuthSessionEvent::FetchedIdentityId(
                "us-east-1:ident".into()
            ))
        );
    }

    #[tokio::test]
    async fn test_fetch_aws_credentials_error() {
        let mut env = mock_environment();
        env.identity = Arc::new(
            MockIdentity::new().with_aws_credentials(|_, _| Err(ServiceError::NotAuthorized)),
        );

        let dispatcher = Arc::new(CollectingDispatcher::new());
        let action = Box::new(FetchAwsCredentials {
            identity_id: "us-east-1:ident".into(),
            tokens: None,
        });
        action.execute(dispatcher.clone(), Arc::new(env)).await;

        assert!(matches!(
            dispatcher.events()[0].downcast_ref::<FetchAuthSessionEvent>(),
            Some(FetchAuthSessionEvent::ThrowError(AuthError::Service(
                ServiceError::NotAuthorized
            )))
        ));
    }

    #[tokio::test]
    async fn test_fetch_aws_credentials_success() {
        let mut env = mock_environment();
        env.identity = Arc::new(
            MockIdentity::new().with_aws_credentials(|_, _| Ok(test_aws_credentials())),
        );

        let dispatcher = Arc::new(CollectingDispatcher::new());
        let action = Box::new(FetchAwsCredentials {
            identity_id: "us-east-1:ident".into(),
            tokens: Some(test_tokens()),
        });
        action.execute(dispatcher.clone(), Arc::new(env)).await;

        assert!(matches!(
            dispatcher.events()[0].downcast_ref::<FetchAuthSessionEvent>(),
            Some(FetchAuthSessionEvent::FetchedAwsCredentials(_))
        ));
    }
}
