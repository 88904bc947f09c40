//! Bootstrap action for the authentication family.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::action::Action;
use crate::data::{AuthConfiguration, SignedOutData};
use crate::dispatch::{DispatchEventExt, EventDispatcher};
use crate::environment::AuthEnvironment;
use crate::events::AuthenticationEvent;

/// Load the cached session and report whether the machine starts signed in
/// or signed out.
///
/// Any credential store failure degrades to "signed out": a broken cache
/// must never block configuration.
pub struct InitializeAuthentication {
    pub configuration: AuthConfiguration,
}

#[async_trait]
impl Action for InitializeAuthentication {
    fn label(&self) -> &'static str {
        "InitializeAuthentication"
    }

    async fn execute(
        self: Box<Self>,
        dispatcher: Arc<dyn EventDispatcher>,
        environment: Arc<AuthEnvironment>,
    ) {
        debug!(configuration = ?self.configuration, "initializing authentication");

        match environment.credential_store.load().await {
            Ok(Some(signed_in_data)) => {
                debug!(username = %signed_in_data.username, "restored cached session");
                dispatcher.dispatch(AuthenticationEvent::InitializedSignedIn(signed_in_data));
            }
            Ok(None) => {
                dispatcher.dispatch(AuthenticationEvent::InitializedSignedOut(
                    SignedOutData::default(),
                ));
            }
            Err(error) => {
                warn!(%error, "credential store unavailable, starting signed out");
                dispatcher.dispatch(AuthenticationEvent::InitializedSignedOut(
                    SignedOutData::default(),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        mock_environment, test_configuration, test_signed_in_data, CollectingDispatcher,
        MockCredentialStore,
    };

    #[tokio::test]
    async fn test_initialize_with_cached_session() {
        let cached = test_signed_in_data("alice");
        let mut env = mock_environment();
        env.credential_store = Arc::new(MockCredentialStore::with_session(cached.clone()));

        let dispatcher = Arc::new(CollectingDispatcher::new());
        let action = Box::new(InitializeAuthentication {
            configuration: test_configuration(),
        });
        action.execute(dispatcher.clone(), Arc::new(env)).await;

        let events = dispatcher.events();
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].downcast_ref::<AuthenticationEvent>(),
            Some(&AuthenticationEvent::InitializedSignedIn(cached))
        );
    }

    #[tokio::test]
    async fn test_initialize_without_cached_session() {
        let dispatcher = Arc::new(CollectingDispatcher::new());
        let action = Box::new(InitializeAuthentication {
            configuration: test_configuration(),
        });
        action
            .execute(dispatcher.clone(), Arc::new(mock_environment()))
            .await;

        let events = dispatcher.events();
        assert!(matches!(
            events[0].downcast_ref::<AuthenticationEvent>(),
            Some(AuthenticationEvent::InitializedSignedOut(_))
        ));
    }

    #[tokio::test]
    async fn test_initialize_with_broken_store_starts_signed_out() {
        let mut env = mock_environment();
        env.credential_store = Arc::new(MockCredentialStore::failing());

        let dispatcher = Arc::new(CollectingDispatcher::new());
        let action = Box::new(InitializeAuthentication {
            configuration: test_configuration(),
        });
        action.execute(dispatcher.clone(), Arc::new(env)).await;

        let events = dispatcher.events();
        assert!(matches!(
            events[0].downcast_ref::<AuthenticationEvent>(),
            Some(AuthenticationEvent::InitializedSignedOut(_))
        ));
    }
}
