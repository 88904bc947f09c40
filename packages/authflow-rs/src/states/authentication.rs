//! Authentication state family - the top-level sign-in/sign-out lifecycle.
//!
//! Owns configuration and the signed-in/signed-out distinction. In-flight
//! operations live in child families (`SignInState`, `SignOutState`,
//! `SignUpState`); this resolver delegates to them and graduates their
//! terminal states.

use crate::actions::{InitializeAuthentication, InitiateSignOut, InitiateSignUp, StartHostedUiFlow,
    StartSrpFlow, StartWebAuthnFlow};
use crate::core::EventEnvelope;
use crate::data::{AuthConfiguration, AuthFlowType, SignInEventData, SignInMethod, SignedInData,
    SignedOutData};
use crate::error::{AuthError, SignOutError};
use crate::events::AuthenticationEvent;
use crate::resolver::{MachineState, StateMachineResolver, StateResolution};
use crate::states::sign_in::{SignInResolver, SignInState};
use crate::states::sign_out::{SignOutResolver, SignOutState};
use crate::states::sign_up::{SignUpResolver, SignUpState};
use crate::states::srp::SrpSignInState;
use crate::states::webauthn::WebAuthnSignInState;

#[derive(Debug, Clone, PartialEq)]
pub enum AuthenticationState {
    NotConfigured,
    Configured(AuthConfiguration),
    SigningIn(AuthConfiguration, SignInState),
    SigningUp(AuthConfiguration, SignUpState),
    SigningOut(AuthConfiguration, SignOutState),
    SignedIn(AuthConfiguration, SignedInData),
    SignedOut(AuthConfiguration, SignedOutData),
    Error(Option<AuthConfiguration>, AuthError),
}

impl MachineState for AuthenticationState {
    fn label(&self) -> &'static str {
        match self {
            AuthenticationState::NotConfigured => "AuthenticationState.notConfigured",
            AuthenticationState::Configured(_) => "AuthenticationState.configured",
            AuthenticationState::SigningIn(..) => "AuthenticationState.signingIn",
            AuthenticationState::SigningUp(..) => "AuthenticationState.signingUp",
            AuthenticationState::SigningOut(..) => "AuthenticationState.signingOut",
            AuthenticationState::SignedIn(..) => "AuthenticationState.signedIn",
            AuthenticationState::SignedOut(..) => "AuthenticationState.signedOut",
            AuthenticationState::Error(..) => "AuthenticationState.error",
        }
    }
}

pub struct AuthenticationResolver;

impl StateMachineResolver for AuthenticationResolver {
    type StateType = AuthenticationState;

    fn default_state(&self) -> AuthenticationState {
        AuthenticationState::NotConfigured
    }

    fn resolve(
        &self,
        old_state: &AuthenticationState,
        event: &EventEnvelope,
    ) -> StateResolution<AuthenticationState> {
        match old_state {
            AuthenticationState::NotConfigured => {
                if let Some(AuthenticationEvent::Configure(config)) =
                    event.downcast_ref::<AuthenticationEvent>()
                {
                    return StateResolution::with_action(
                        AuthenticationState::Configured(config.clone()),
                        Box::new(InitializeAuthentication {
                            configuration: config.clone(),
                        }),
                    );
                }
                StateResolution::from(old_state.clone())
            }
            AuthenticationState::Configured(config) => {
                match event.downcast_ref::<AuthenticationEvent>() {
                    Some(AuthenticationEvent::InitializedSignedIn(data)) => StateResolution::from(
                        AuthenticationState::SignedIn(config.clone(), data.clone()),
                    ),
                    Some(AuthenticationEvent::InitializedSignedOut(data)) => StateResolution::from(
                        AuthenticationState::SignedOut(config.clone(), data.clone()),
                    ),
                    Some(AuthenticationEvent::ThrowError(error)) => StateResolution::from(
                        AuthenticationState::Error(Some(config.clone()), error.clone()),
                    ),
                    _ => StateResolution::from(old_state.clone()),
                }
            }
            AuthenticationState::SignedOut(config, _) => {
                match event.downcast_ref::<AuthenticationEvent>() {
                    Some(AuthenticationEvent::SignInRequested(data)) => {
                        start_sign_in(config, data)
                    }
                    Some(AuthenticationEvent::SignUpRequested(data)) => {
                        StateResolution::with_action(
                            AuthenticationState::SigningUp(
                                config.clone(),
                                SignUpState::InitiatingSignUp(data.clone()),
                            ),
                            Box::new(InitiateSignUp {
                                sign_up_data: data.clone(),
                            }),
                        )
                    }
                    Some(AuthenticationEvent::ThrowError(error)) => StateResolution::from(
                        AuthenticationState::Error(Some(config.clone()), error.clone()),
                    ),
                    _ => StateResolution::from(old_state.clone()),
                }
            }
            AuthenticationState::SigningIn(config, child) => {
                match event.downcast_ref::<AuthenticationEvent>() {
                    Some(AuthenticationEvent::CancelSignIn) => {
                        return StateResolution::from(AuthenticationState::SignedOut(
                            config.clone(),
                            SignedOutData::default(),
                        ));
                    }
                    Some(AuthenticationEvent::ThrowError(error)) => {
                        return StateResolution::from(AuthenticationState::Error(
                            Some(config.clone()),
                            error.clone(),
                        ));
                    }
                    _ => {}
                }

                let resolution = SignInResolver.resolve(child, event);
                match resolution.new_state {
                    SignInState::SignedIn(data) => StateResolution {
                        new_state: AuthenticationState::SignedIn(config.clone(), data),
                        actions: resolution.actions,
                    },
                    // A user-cancelled flow returns to the safe prior
                    // state, not to error.
                    SignInState::Error(AuthError::UserCancelled) => StateResolution {
                        new_state: AuthenticationState::SignedOut(
                            config.clone(),
                            SignedOutData::default(),
                        ),
                        actions: resolution.actions,
                    },
                    SignInState::Error(error) => StateResolution {
                        new_state: AuthenticationState::Error(Some(config.clone()), error),
                        actions: resolution.actions,
                    },
                    child_state => StateResolution {
                        new_state: AuthenticationState::SigningIn(config.clone(), child_state),
                        actions: resolution.actions,
                    },
                }
            }
            AuthenticationState::SigningUp(config, child) => {
                if let Some(AuthenticationEvent::CancelSignUp) =
                    event.downcast_ref::<AuthenticationEvent>()
                {
                    return StateResolution::from(AuthenticationState::SignedOut(
                        config.clone(),
                        SignedOutData::default(),
                    ));
                }

                let resolution = SignUpResolver.resolve(child, event);
                match resolution.new_state {
                    // A signed-up user still has to sign in.
                    SignUpState::SignedUp(username) => StateResolution {
                        new_state: AuthenticationState::SignedOut(
                            config.clone(),
                            SignedOutData::with_username(username),
                        ),
                        actions: resolution.actions,
                    },
                    child_state => StateResolution {
                        new_state: AuthenticationState::SigningUp(config.clone(), child_state),
                        actions: resolution.actions,
                    },
                }
            }
            AuthenticationState::SignedIn(config, data) => {
                match event.downcast_ref::<AuthenticationEvent>() {
                    Some(AuthenticationEvent::SignOutRequested(sign_out_data)) => {
                        StateResolution::with_action(
                            AuthenticationState::SigningOut(config.clone(), SignOutState::NotStarted),
                            Box::new(InitiateSignOut {
                                sign_out_data: *sign_out_data,
                                signed_in_data: data.clone(),
                            }),
                        )
                    }
                    Some(AuthenticationEvent::ThrowError(error)) => StateResolution::from(
                        AuthenticationState::Error(Some(config.clone()), error.clone()),
                    ),
                    _ => StateResolution::from(old_state.clone()),
                }
            }
            AuthenticationState::SigningOut(config, child) => {
                if let Some(AuthenticationEvent::SignOutCancelled(data)) =
                    event.downcast_ref::<AuthenticationEvent>()
                {
                    return StateResolution::from(AuthenticationState::SignedIn(
                        config.clone(),
                        data.clone(),
                    ));
                }

                let resolution = SignOutResolver.resolve(child, event);
                match resolution.new_state {
                    SignOutState::SignedOut(data) => StateResolution {
                        new_state: AuthenticationState::SignedOut(config.clone(), data),
                        actions: resolution.actions,
                    },
                    // UserCancelled stays wrapped: the child's CancelSignOut
                    // action restores the session via SignOutCancelled.
                    SignOutState::Error(SignOutError::LocalSignOut) => StateResolution {
                        new_state: AuthenticationState::Error(
                            Some(config.clone()),
                            AuthError::SignOut(SignOutError::LocalSignOut),
                        ),
                        actions: resolution.actions,
                    },
                    child_state => StateResolution {
                        new_state: AuthenticationState::SigningOut(config.clone(), child_state),
                        actions: resolution.actions,
                    },
                }
            }
            AuthenticationState::Error(..) => StateResolution::from(old_state.clone()),
        }
    }
}

/// Pick the flow for a requested sign-in and emit its starter action.
fn start_sign_in(
    config: &AuthConfiguration,
    data: &SignInEventData,
) -> StateResolution<AuthenticationState> {
    match &data.sign_in_method {
        SignInMethod::ApiBased(AuthFlowType::UserAuth) => StateResolution::with_action(
            AuthenticationState::SigningIn(
                config.clone(),
                SignInState::SigningInWithWebAuthn(WebAuthnSignInState::NotStarted, data.clone()),
            ),
            Box::new(StartWebAuthnFlow {
                sign_in_data: data.clone(),
            }),
        ),
        SignInMethod::ApiBased(_) => StateResolution::with_action(
            AuthenticationState::SigningIn(
                config.clone(),
                SignInState::SigningInWithSrp(SrpSignInState::NotStarted, data.clone()),
            ),
            Box::new(StartSrpFlow {
                sign_in_data: data.clone(),
            }),
        ),
        SignInMethod::HostedUi(options) => StateResolution::with_action(
            AuthenticationState::SigningIn(
                config.clone(),
                SignInState::SigningInViaHostedUi(
                    crate::states::hosted_ui::HostedUiSignInState::NotStarted,
                    options.clone(),
                ),
            ),
            Box::new(StartHostedUiFlow {
                options: options.clone(),
            }),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SignOutEventData;
    use crate::events::SignOutEvent;
    use crate::testing::{test_configuration, test_signed_in_data};

    fn config() -> AuthConfiguration {
        test_configuration()
    }

    fn signed_out() -> AuthenticationState {
        AuthenticationState::SignedOut(config(), SignedOutData::default())
    }

    fn srp_request() -> SignInEventData {
        SignInEventData {
            username: "alice".into(),
            password: Some("hunter2".into()),
            sign_in_method: SignInMethod::ApiBased(AuthFlowType::UserSrp),
        }
    }

    #[test]
    fn test_configure_schedules_bootstrap() {
        let resolver = AuthenticationResolver;
        let event = EventEnvelope::new(AuthenticationEvent::Configure(config()));

        let resolution = resolver.resolve(&AuthenticationState::NotConfigured, &event);

        assert_eq!(resolution.new_state, AuthenticationState::Configured(config()));
        assert_eq!(resolution.actions[0].label(), "InitializeAuthentication");
    }

    #[test]
    fn test_initialized_signed_out() {
        let resolver = AuthenticationResolver;
        let event = EventEnvelope::new(AuthenticationEvent::InitializedSignedOut(
            SignedOutData::default(),
        ));

        let resolution = resolver.resolve(&AuthenticationState::Configured(config()), &event);
        assert_eq!(resolution.new_state, signed_out());
    }

    #[test]
    fn test_srp_sign_in_request_shape() {
        let resolver = AuthenticationResolver;
        let data = srp_request();
        let event = EventEnvelope::new(AuthenticationEvent::SignInRequested(data.clone()));

        let resolution = resolver.resolve(&signed_out(), &event);

        assert_eq!(
            resolution.new_state,
            AuthenticationState::SigningIn(
                config(),
                SignInState::SigningInWithSrp(SrpSignInState::NotStarted, data),
            )
        );
        assert_eq!(resolution.actions.len(), 1);
        assert_eq!(resolution.actions[0].label(), "StartSrpFlow");
    }

    #[test]
    fn test_cancel_sign_in_returns_to_signed_out() {
        let resolver = AuthenticationResolver;
        let state = AuthenticationState::SigningIn(
            config(),
            SignInState::SigningInWithSrp(SrpSignInState::NotStarted, srp_request()),
        );
        let event = EventEnvelope::new(AuthenticationEvent::CancelSignIn);

        let resolution = resolver.resolve(&state, &event);
        assert_eq!(resolution.new_state, signed_out());
        assert!(resolution.actions.is_empty());
    }

    #[test]
    fn test_cancel_sign_up_returns_to_signed_out_without_username() {
        let resolver = AuthenticationResolver;
        let state = AuthenticationState::SigningUp(
            config(),
            SignUpState::InitiatingSignUp(crate::data::SignUpEventData {
                username: "alice".into(),
                password: "hunter2".into(),
                attributes: Default::default(),
            }),
        );
        let event = EventEnvelope::new(AuthenticationEvent::CancelSignUp);

        let resolution = resolver.resolve(&state, &event);
        assert_eq!(
            resolution.new_state,
            AuthenticationState::SignedOut(config(), SignedOutData::default())
        );
    }

    #[test]
    fn test_sign_out_requested_from_signed_in() {
        let resolver = AuthenticationResolver;
        let data = test_signed_in_data("alice");
        let state = AuthenticationState::SignedIn(config(), data);
        let event = EventEnvelope::new(AuthenticationEvent::SignOutRequested(
            SignOutEventData::default(),
        ));

        let resolution = resolver.resolve(&state, &event);
        assert_eq!(
            resolution.new_state,
            AuthenticationState::SigningOut(config(), SignOutState::NotStarted)
        );
        assert_eq!(resolution.actions[0].label(), "InitiateSignOut");
    }

    #[test]
    fn test_sign_out_completion_graduates() {
        let resolver = AuthenticationResolver;
        let state = AuthenticationState::SigningOut(
            config(),
            SignOutState::SigningOutLocally(Some(test_signed_in_data("alice"))),
        );
        let event = EventEnvelope::new(SignOutEvent::SignedOutSuccess {
            hosted_ui_error: None,
            global_sign_out_error: None,
            revoke_token_error: None,
        });

        let resolution = resolver.resolve(&state, &event);
        assert_eq!(
            resolution.new_state,
            AuthenticationState::SignedOut(config(), SignedOutData::with_username("alice"))
        );
    }

    #[test]
    fn test_sign_out_cancelled_restores_session() {
        let resolver = AuthenticationResolver;
        let data = test_signed_in_data("alice");
        let state = AuthenticationState::SigningOut(
            config(),
            SignOutState::Error(SignOutError::UserCancelled),
        );
        let event = EventEnvelope::new(AuthenticationEvent::SignOutCancelled(data.clone()));

        let resolution = resolver.resolve(&state, &event);
        assert_eq!(
            resolution.new_state,
            AuthenticationState::SignedIn(config(), data)
        );
    }

    #[test]
    fn test_sign_in_request_ignored_while_signed_in() {
        let resolver = AuthenticationResolver;
        let state = AuthenticationState::SignedIn(config(), test_signed_in_data("alice"));
        let event = EventEnvelope::new(AuthenticationEvent::SignInRequested(srp_request()));

        let resolution = resolver.resolve(&state, &event);
        assert_eq!(resolution.new_state, state);
        assert!(resolution.actions.is_empty());
    }

    #[test]
    fn test_error_state_is_terminal() {
        let resolver = AuthenticationResolver;
        let state = AuthenticationState::Error(Some(config()), AuthError::SessionExpired);
        let event = EventEnvelope::new(AuthenticationEvent::SignInRequested(srp_request()));

        let resolution = resolver.resolve(&state, &event);
        assert_eq!(resolution.new_state, state);
    }
}
