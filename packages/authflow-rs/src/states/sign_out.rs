//! Sign-out state family.
//!
//! The pipeline: hosted UI sign-out when the session came from the hosted
//! UI, then global sign-out when requested, then token revocation, then the
//! local sign-out that actually ends the session. Earlier steps are
//! best-effort; their failures accumulate in the final `SignedOutData`.

use crate::actions::{
    BuildRevokeTokenError, CancelSignOut, RevokeToken, ShowHostedUiSignOut, SignOutGlobally,
    SignOutLocally,
};
use crate::core::EventEnvelope;
use crate::data::{SignedInData, SignedOutData};
use crate::error::SignOutError;
use crate::events::SignOutEvent;
use crate::resolver::{MachineState, StateMachineResolver, StateResolution};

#[derive(Debug, Clone, PartialEq)]
pub enum SignOutState {
    NotStarted,
    SigningOutGlobally,
    RevokingToken,
    SigningOutLocally(Option<SignedInData>),
    SigningOutHostedUi(SignedInData),
    BuildingRevokeTokenError,
    SignedOut(SignedOutData),
    Error(SignOutError),
}

impl MachineState for SignOutState {
    fn label(&self) -> &'static str {
        match self {
            SignOutState::NotStarted => "SignOutState.notStarted",
            SignOutState::SigningOutGlobally => "SignOutState.signingOutGlobally",
            SignOutState::RevokingToken => "SignOutState.revokingToken",
            SignOutState::SigningOutLocally(_) => "SignOutState.signingOutLocally",
            SignOutState::SigningOutHostedUi(_) => "SignOutState.signingOutHostedUi",
            SignOutState::BuildingRevokeTokenError => "SignOutState.buildingRevokeTokenError",
            SignOutState::SignedOut(_) => "SignOutState.signedOut",
            SignOutState::Error(_) => "SignOutState.error",
        }
    }
}

pub struct SignOutResolver;

impl StateMachineResolver for SignOutResolver {
    type StateType = SignOutState;

    fn default_state(&self) -> SignOutState {
        SignOutState::NotStarted
    }

    fn resolve(
        &self,
        old_state: &SignOutState,
        event: &EventEnvelope,
    ) -> StateResolution<SignOutState> {
        let Some(sign_out_event) = event.downcast_ref::<SignOutEvent>() else {
            return StateResolution::from(old_state.clone());
        };

        match old_state {
            SignOutState::NotStarted => self.resolve_not_started(sign_out_event, old_state),
            SignOutState::SigningOutHostedUi(signed_in_data) => {
                self.resolve_hosted_ui(sign_out_event, signed_in_data, old_state)
            }
            SignOutState::SigningOutGlobally => {
                self.resolve_signing_out_globally(sign_out_event, old_state)
            }
            SignOutState::RevokingToken | SignOutState::BuildingRevokeTokenError => {
                self.resolve_awaiting_local(sign_out_event, old_state)
            }
            SignOutState::SigningOutLocally(signed_in_data) => {
                self.resolve_signing_out_locally(sign_out_event, signed_in_data, old_state)
            }
            SignOutState::SignedOut(_) | SignOutState::Error(_) => {
                StateResolution::from(old_state.clone())
            }
        }
    }
}

impl SignOutResolver {
    fn resolve_not_started(
        &self,
        event: &SignOutEvent,
        old_state: &SignOutState,
    ) -> StateResolution<SignOutState> {
        match event {
            SignOutEvent::SignOutGlobally {
                signed_in_data,
                hosted_ui_error,
            } => StateResolution::with_action(
                SignOutState::SigningOutGlobally,
                Box::new(SignOutGlobally {
                    signed_in_data: signed_in_data.clone(),
                    hosted_ui_error: hosted_ui_error.clone(),
                }),
            ),
            SignOutEvent::RevokeToken {
                signed_in_data,
                hosted_ui_error,
                global_sign_out_error,
            } => StateResolution::with_action(
                SignOutState::RevokingToken,
                Box::new(RevokeToken {
                    signed_in_data: signed_in_data.clone(),
                    hosted_ui_error: hosted_ui_error.clone(),
                    global_sign_out_error: global_sign_out_error.clone(),
                }),
            ),
            SignOutEvent::InvokeHostedUiSignOut {
                sign_out_data,
                signed_in_data,
            } => StateResolution::with_action(
                SignOutState::SigningOutHostedUi(signed_in_data.clone()),
                Box::new(ShowHostedUiSignOut {
                    sign_out_data: *sign_out_data,
                    signed_in_data: signed_in_data.clone(),
                }),
            ),
            SignOutEvent::SignOutGuest => StateResolution::with_action(
                SignOutState::SigningOutLocally(None),
                Box::new(SignOutLocally {
                    hosted_ui_error: None,
                    global_sign_out_error: None,
                    revoke_token_error: None,
                }),
            ),
            _ => StateResolution::from(old_state.clone()),
        }
    }

    fn resolve_hosted_ui(
        &self,
        event: &SignOutEvent,
        signed_in_data: &SignedInData,
        old_state: &SignOutState,
    ) -> StateResolution<SignOutState> {
        match event {
            SignOutEvent::SignOutGlobally {
                signed_in_data,
                hosted_ui_error,
            } => StateResolution::with_action(
                SignOutState::SigningOutGlobally,
                Box::new(SignOutGlobally {
                    signed_in_data: signed_in_data.clone(),
                    hosted_ui_error: hosted_ui_error.clone(),
                }),
            ),
            SignOutEvent::RevokeToken {
                signed_in_data,
                hosted_ui_error,
                global_sign_out_error,
            } => StateResolution::with_action(
                SignOutState::RevokingToken,
                Box::new(RevokeToken {
                    signed_in_data: signed_in_data.clone(),
                    hosted_ui_error: hosted_ui_error.clone(),
                    global_sign_out_error: global_sign_out_error.clone(),
                }),
            ),
            SignOutEvent::UserCancelled => StateResolution::with_action(
                SignOutState::Error(SignOutError::UserCancelled),
                Box::new(CancelSignOut {
                    signed_in_data: signed_in_data.clone(),
                }),
            ),
            _ => StateResolution::from(old_state.clone()),
        }
    }

    fn resolve_signing_out_globally(
        &self,
        event: &SignOutEvent,
        old_state: &SignOutState,
    ) -> StateResolution<SignOutState> {
        match event {
            SignOutEvent::RevokeToken {
                signed_in_data,
                hosted_ui_error,
                global_sign_out_error,
            } => StateResolution::with_action(
                SignOutState::RevokingToken,
                Box::new(RevokeToken {
                    signed_in_data: signed_in_data.clone(),
                    hosted_ui_error: hosted_ui_error.clone(),
                    global_sign_out_error: global_sign_out_error.clone(),
                }),
            ),
            SignOutEvent::GlobalSignOutError {
                signed_in_data,
                global_sign_out_error,
                hosted_ui_error,
            } => StateResolution::with_action(
                SignOutState::BuildingRevokeTokenError,
                Box::new(BuildRevokeTokenError {
                    signed_in_data: signed_in_data.clone(),
                    hosted_ui_error: hosted_ui_error.clone(),
                    global_sign_out_error: global_sign_out_error.clone(),
                }),
            ),
            _ => StateResolution::from(old_state.clone()),
        }
    }

    fn resolve_awaiting_local(
        &self,
        event: &SignOutEvent,
        old_state: &SignOutState,
    ) -> StateResolution<SignOutState> {
        match event {
            SignOutEvent::SignOutLocally {
                signed_in_data,
                hosted_ui_error,
                global_sign_out_error,
                revoke_token_error,
            } => StateResolution::with_action(
                SignOutState::SigningOutLocally(signed_in_data.clone()),
                Box::new(SignOutLocally {
                    hosted_ui_error: hosted_ui_error.clone(),
                    global_sign_out_error: global_sign_out_error.clone(),
                    revoke_token_error: revoke_token_error.clone(),
                }),
            ),
            _ => StateResolution::from(old_state.clone()),
        }
    }

    fn resolve_signing_out_locally(
        &self,
        event: &SignOutEvent,
        signed_in_data: &Option<SignedInData>,
        old_state: &SignOutState,
    ) -> StateResolution<SignOutState> {
        match event {
            SignOutEvent::SignedOutSuccess {
                hosted_ui_error,
                global_sign_out_error,
                revoke_token_error,
            } => {
                let signed_out_data = SignedOutData {
                    last_known_username: signed_in_data.as_ref().map(|d| d.username.clone()),
                    hosted_ui_error: hosted_ui_error.clone(),
                    global_sign_out_error: global_sign_out_error.clone(),
                    revoke_token_error: revoke_token_error.clone(),
                };
                StateResolution::from(SignOutState::SignedOut(signed_out_data))
            }
            SignOutEvent::SignedOutFailure => {
                StateResolution::from(SignOutState::Error(SignOutError::LocalSignOut))
            }
            _ => StateResolution::from(old_state.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{GlobalSignOutError, RevokeTokenError, SignOutEventData};
    use crate::error::ServiceError;
    use crate::testing::test_signed_in_data;

    #[test]
    fn test_global_sign_out_pipeline() {
        let resolver = SignOutResolver;
        let data = test_signed_in_data("alice");

        let r1 = resolver.resolve(
            &SignOutState::NotStarted,
            &EventEnvelope::new(SignOutEvent::SignOutGlobally {
                signed_in_data: data.clone(),
                hosted_ui_error: None,
            }),
        );
        assert_eq!(r1.new_state, SignOutState::SigningOutGlobally);
        assert_eq!(r1.actions[0].label(), "SignOutGlobally");

        let r2 = resolver.resolve(
            &r1.new_state,
            &EventEnvelope::new(SignOutEvent::RevokeToken {
                signed_in_data: data.clone(),
                hosted_ui_error: None,
                global_sign_out_error: None,
            }),
        );
        assert_eq!(r2.new_state, SignOutState::RevokingToken);
        assert_eq!(r2.actions[0].label(), "RevokeToken");

        let r3 = resolver.resolve(
            &r2.new_state,
            &EventEnvelope::new(SignOutEvent::SignOutLocally {
                signed_in_data: Some(data.clone()),
                hosted_ui_error: None,
                global_sign_out_error: None,
                revoke_token_error: None,
            }),
        );
        assert_eq!(
            r3.new_state,
            SignOutState::SigningOutLocally(Some(data.clone()))
        );
        assert_eq!(r3.actions[0].label(), "SignOutLocally");

        let r4 = resolver.resolve(
            &r3.new_state,
            &EventEnvelope::new(SignOutEvent::SignedOutSuccess {
                hosted_ui_error: None,
                global_sign_out_error: None,
                revoke_token_error: None,
            }),
        );
        assert_eq!(
            r4.new_state,
            SignOutState::SignedOut(SignedOutData::with_username("alice"))
        );
        assert!(r4.actions.is_empty());
    }

    #[test]
    fn test_global_error_builds_revoke_error() {
        let resolver = SignOutResolver;
        let data = test_signed_in_data("alice");

        let resolution = resolver.resolve(
            &SignOutState::SigningOutGlobally,
            &EventEnvelope::new(SignOutEvent::GlobalSignOutError {
                signed_in_data: data.clone(),
                global_sign_out_error: GlobalSignOutError {
                    access_token: data.tokens.access_token.clone(),
                    error: ServiceError::NotAuthorized,
                },
                hosted_ui_error: None,
            }),
        );

        assert_eq!(resolution.new_state, SignOutState::BuildingRevokeTokenError);
        assert_eq!(resolution.actions[0].label(), "BuildRevokeTokenError");
    }

    #[test]
    fn test_errors_accumulate_in_signed_out_data() {
        let resolver = SignOutResolver;
        let data = test_signed_in_data("alice");
        let revoke_error = RevokeTokenError {
            refresh_token: "refresh".into(),
            error: ServiceError::NotAuthorized,
        };

        let resolution = resolver.resolve(
            &SignOutState::SigningOutLocally(Some(data)),
            &EventEnvelope::new(SignOutEvent::SignedOutSuccess {
                hosted_ui_error: None,
                global_sign_out_error: None,
                revoke_token_error: Some(revoke_error.clone()),
            }),
        );

        match resolution.new_state {
            SignOutState::SignedOut(signed_out) => {
                assert!(!signed_out.is_clean());
                assert_eq!(signed_out.revoke_token_error, Some(revoke_error));
                assert_eq!(signed_out.last_known_username.as_deref(), Some("alice"));
            }
            other => panic!("expected SignedOut, got {:?}", other),
        }
    }

    #[test]
    fn test_guest_sign_out_skips_token_steps() {
        let resolver = SignOutResolver;

        let resolution = resolver.resolve(
            &SignOutState::NotStarted,
            &EventEnvelope::new(SignOutEvent::SignOutGuest),
        );

        assert_eq!(resolution.new_state, SignOutState::SigningOutLocally(None));
        assert_eq!(resolution.actions[0].label(), "SignOutLocally");
    }

    #[test]
    fn test_hosted_ui_cancel_restores_session() {
        let resolver = SignOutResolver;
        let data = test_signed_in_data("alice");

        let resolution = resolver.resolve(
            &SignOutState::SigningOutHostedUi(data),
            &EventEnvelope::new(SignOutEvent::UserCancelled),
        );

        assert_eq!(
            resolution.new_state,
            SignOutState::Error(SignOutError::UserCancelled)
        );
        assert_eq!(resolution.actions[0].label(), "CancelSignOut");
    }

    #[test]
    fn test_local_failure_is_terminal() {
        let resolver = SignOutResolver;

        let resolution = resolver.resolve(
            &SignOutState::SigningOutLocally(None),
            &EventEnvelope::new(SignOutEvent::SignedOutFailure),
        );

        assert_eq!(
            resolution.new_state,
            SignOutState::Error(SignOutError::LocalSignOut)
        );
    }

    #[test]
    fn test_terminal_states_are_inert() {
        let resolver = SignOutResolver;
        let signed_out = SignOutState::SignedOut(SignedOutData::default());

        let resolution = resolver.resolve(
            &signed_out,
            &EventEnvelope::new(SignOutEvent::SignOutGuest),
        );
        assert_eq!(resolution.new_state, signed_out);
        assert!(resolution.actions.is_empty());
    }
}
