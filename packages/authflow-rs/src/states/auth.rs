//! Root state family.
//!
//! Once configured, the root carries the authentication and authorization
//! families side by side and feeds every event to both. Each child ignores
//! foreign families by construction, so blind double-delegation is safe;
//! the two resolutions' actions are concatenated in order.

use crate::core::EventEnvelope;
use crate::events::AuthenticationEvent;
use crate::resolver::{MachineState, StateMachineResolver, StateResolution};
use crate::states::authentication::{AuthenticationResolver, AuthenticationState};
use crate::states::session::{AuthorizationResolver, AuthorizationState};

#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    NotConfigured,
    Configured(AuthenticationState, AuthorizationState),
}

impl MachineState for AuthState {
    fn label(&self) -> &'static str {
        match self {
            AuthState::NotConfigured => "AuthState.notConfigured",
            AuthState::Configured(..) => "AuthState.configured",
        }
    }
}

pub struct AuthStateResolver;

impl StateMachineResolver for AuthStateResolver {
    type StateType = AuthState;

    fn default_state(&self) -> AuthState {
        AuthState::NotConfigured
    }

    fn resolve(&self, old_state: &AuthState, event: &EventEnvelope) -> StateResolution<AuthState> {
        match old_state {
            AuthState::NotConfigured => {
                if let Some(AuthenticationEvent::Configure(_)) =
                    event.downcast_ref::<AuthenticationEvent>()
                {
                    let authn = AuthenticationResolver
                        .resolve(&AuthenticationResolver.default_state(), event);
                    let authz = AuthorizationResolver
                        .resolve(&AuthorizationResolver.default_state(), event);

                    let mut actions = authn.actions;
                    actions.extend(authz.actions);
                    return StateResolution::new(
                        AuthState::Configured(authn.new_state, authz.new_state),
                        actions,
                    );
                }
                StateResolution::from(old_state.clone())
            }
            AuthState::Configured(authn_state, authz_state) => {
                let authn = AuthenticationResolver.resolve(authn_state, event);
                let authz = AuthorizationResolver.resolve(authz_state, event);

                let mut actions = authn.actions;
                actions.extend(authz.actions);
                StateResolution::new(
                    AuthState::Configured(authn.new_state, authz.new_state),
                    actions,
                )
            }
        }
    }
}

impl AuthState {
    /// The authentication side, once configured.
    pub fn authentication(&self) -> Option<&AuthenticationState> {
        match self {
            AuthState::Configured(authn, _) => Some(authn),
            AuthState::NotConfigured => None,
        }
    }

    /// The authorization side, once configured.
    pub fn authorization(&self) -> Option<&AuthorizationState> {
        match self {
            AuthState::Configured(_, authz) => Some(authz),
            AuthState::NotConfigured => None,
        }
    }
}
