//! Authorization state family: session establishment and AWS credential
//! fetching.
//!
//! Established sessions come in three shapes depending on configuration:
//! user pool tokens only, identity pool credentials only, or both. The
//! identity pool round trips run in the nested `FetchAuthSessionState`
//! sub-machine; user-pool-only deployments resolve without any action.

use crate::actions::{FetchAwsCredentials, FetchIdentityId};
use crate::core::EventEnvelope;
use crate::data::{AuthConfiguration, SessionCredentials, UserPoolTokens};
use crate::error::AuthError;
use crate::events::{AuthenticationEvent, AuthorizationEvent, FetchAuthSessionEvent};
use crate::resolver::{MachineState, StateMachineResolver, StateResolution};

#[derive(Debug, Clone, PartialEq)]
pub enum FetchAuthSessionState {
    NotStarted,
    FetchingIdentityId(Option<UserPoolTokens>),
    FetchingAwsCredentials(String, Option<UserPoolTokens>),
    Fetched(SessionCredentials),
}

impl MachineState for FetchAuthSessionState {
    fn label(&self) -> &'static str {
        match self {
            FetchAuthSessionState::NotStarted => "FetchAuthSessionState.notStarted",
            FetchAuthSessionState::FetchingIdentityId(_) => {
                "FetchAuthSessionState.fetchingIdentityId"
            }
            FetchAuthSessionState::FetchingAwsCredentials(..) => {
                "FetchAuthSessionState.fetchingAwsCredentials"
            }
            FetchAuthSessionState::Fetched(_) => "FetchAuthSessionState.fetched",
        }
    }
}

pub struct FetchAuthSessionResolver;

impl StateMachineResolver for FetchAuthSessionResolver {
    type StateType = FetchAuthSessionState;

    fn default_state(&self) -> FetchAuthSessionState {
        FetchAuthSessionState::NotStarted
    }

    fn resolve(
        &self,
        old_state: &FetchAuthSessionState,
        event: &EventEnvelope,
    ) -> StateResolution<FetchAuthSessionState> {
        let Some(fetch_event) = event.downcast_ref::<FetchAuthSessionEvent>() else {
            return StateResolution::from(old_state.clone());
        };

        match (old_state, fetch_event) {
            (
                FetchAuthSessionState::FetchingIdentityId(tokens),
                FetchAuthSessionEvent::FetchedIdentityId(identity_id),
            ) => StateResolution::with_action(
                FetchAuthSessionState::FetchingAwsCredentials(
                    identity_id.clone(),
                    tokens.clone(),
                ),
                Box::new(FetchAwsCredentials {
                    identity_id: identity_id.clone(),
                    tokens: tokens.clone(),
                }),
            ),
            (
                FetchAuthSessionState::FetchingAwsCredentials(identity_id, tokens),
                FetchAuthSessionEvent::FetchedAwsCredentials(credentials),
            ) => {
                let credentials = match tokens {
                    Some(tokens) => SessionCredentials::UserPoolAndIdentityPool {
                        tokens: tokens.clone(),
                        identity_id: identity_id.clone(),
                        credentials: credentials.clone(),
                    },
                    None => SessionCredentials::IdentityPoolOnly {
                        identity_id: identity_id.clone(),
                        credentials: credentials.clone(),
                    },
                };
                StateResolution::from(FetchAuthSessionState::Fetched(credentials))
            }
            (_, FetchAuthSessionEvent::Fetched(credentials)) => {
                StateResolution::from(FetchAuthSessionState::Fetched(credentials.clone()))
            }
            _ => StateResolution::from(old_state.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthorizationState {
    NotConfigured,
    Configured(AuthConfiguration),
    FetchingAuthSession(AuthConfiguration, FetchAuthSessionState),
    SessionEstablished(AuthConfiguration, SessionCredentials),
    Error(Option<AuthConfiguration>, AuthError),
}

impl MachineState for AuthorizationState {
    fn label(&self) -> &'static str {
        match self {
            AuthorizationState::NotConfigured => "AuthorizationState.notConfigured",
            AuthorizationState::Configured(_) => "AuthorizationState.configured",
            AuthorizationState::FetchingAuthSession(..) => {
                "AuthorizationState.fetchingAuthSession"
            }
            AuthorizationState::SessionEstablished(..) => {
                "AuthorizationState.sessionEstablished"
            }
            AuthorizationState::Error(..) => "AuthorizationState.error",
        }
    }
}

pub struct AuthorizationResolver;

impl StateMachineResolver for AuthorizationResolver {
    type StateType = AuthorizationState;

    fn default_state(&self) -> AuthorizationState {
        AuthorizationState::NotConfigured
    }

    fn resolve(
        &self,
        old_state: &AuthorizationState,
        event: &EventEnvelope,
    ) -> StateResolution<AuthorizationState> {
        // Configuration arrives on the authentication family; both top-level
        // families configure from the same event.
        if let Some(AuthenticationEvent::Configure(config)) =
            event.downcast_ref::<AuthenticationEvent>()
        {
            if matches!(old_state, AuthorizationState::NotConfigured) {
                return StateResolution::from(AuthorizationState::Configured(config.clone()));
            }
            return StateResolution::from(old_state.clone());
        }

        if let Some(authz_event) = event.downcast_ref::<AuthorizationEvent>() {
            return self.resolve_authorization_event(old_state, authz_event);
        }

        if let Some(fetch_event) = event.downcast_ref::<FetchAuthSessionEvent>() {
            if let AuthorizationState::FetchingAuthSession(config, child) = old_state {
                if let FetchAuthSessionEvent::ThrowError(error) = fetch_event {
                    return StateResolution::from(AuthorizationState::Error(
                        Some(config.clone()),
                        error.clone(),
                    ));
                }

                let resolution = FetchAuthSessionResolver.resolve(child, event);
                return match resolution.new_state {
                    FetchAuthSessionState::Fetched(credentials) => StateResolution {
                        new_state: AuthorizationState::SessionEstablished(
                            config.clone(),
                            credentials,
                        ),
                        actions: resolution.actions,
                    },
                    child_state => StateResolution {
                        new_state: AuthorizationState::FetchingAuthSession(
                            config.clone(),
                            child_state,
                        ),
                        actions: resolution.actions,
                    },
                };
            }
            return StateResolution::from(old_state.clone());
        }

        StateResolution::from(old_state.clone())
    }
}

impl AuthorizationResolver {
    fn resolve_authorization_event(
        &self,
        old_state: &AuthorizationState,
        event: &AuthorizationEvent,
    ) -> StateResolution<AuthorizationState> {
        match (old_state, event) {
            (
                AuthorizationState::Configured(config)
                | AuthorizationState::SessionEstablished(config, _)
                | AuthorizationState::Error(Some(config), _),
                AuthorizationEvent::FetchAuthSession { tokens },
            ) => start_fetch(config, tokens.clone()),
            (
                AuthorizationState::SessionEstablished(config, credentials),
                AuthorizationEvent::RefreshSession,
            ) => start_fetch(config, credentials.tokens().cloned()),
            (
                AuthorizationState::Configured(config)
                | AuthorizationState::FetchingAuthSession(config, _)
                | AuthorizationState::SessionEstablished(config, _),
                AuthorizationEvent::ThrowError(error),
            ) => StateResolution::from(AuthorizationState::Error(
                Some(config.clone()),
                error.clone(),
            )),
            _ => StateResolution::from(old_state.clone()),
        }
    }
}

/// Begin a session fetch appropriate to the configuration shape.
fn start_fetch(
    config: &AuthConfiguration,
    tokens: Option<UserPoolTokens>,
) -> StateResolution<AuthorizationState> {
    if config.identity_pool().is_some() {
        return StateResolution::with_action(
            AuthorizationState::FetchingAuthSession(
                config.clone(),
                FetchAuthSessionState::FetchingIdentityId(tokens.clone()),
            ),
            Box::new(FetchIdentityId { tokens }),
        );
    }

    // User pool only: the tokens are the whole session.
    let credentials = match tokens {
        Some(tokens) => SessionCredentials::UserPoolOnly { tokens },
        None => SessionCredentials::NoCredentials,
    };
    StateResolution::from(AuthorizationState::SessionEstablished(
        config.clone(),
        credentials,
    ))
}
