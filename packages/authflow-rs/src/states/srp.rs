//! SRP sign-in sub-machine.
//!
//! Two round trips: send SRP_A, then answer the password verifier with the
//! proof. The flow either completes with tokens, escalates to an auxiliary
//! challenge (handled one level up), or fails.

use crate::actions::{InitiateAuthSrp, VerifyPasswordSrp};
use crate::core::EventEnvelope;
use crate::data::{SignInEventData, SignedInData, SrpStateData};
use crate::error::AuthError;
use crate::events::{SignInEvent, SrpSignInEvent};
use crate::resolver::{MachineState, StateMachineResolver, StateResolution};

#[derive(Debug, Clone, PartialEq)]
pub enum SrpSignInState {
    NotStarted,
    InitiatingSrpA(SignInEventData),
    RespondingPasswordVerifier(SrpStateData),
    SignedIn(SignedInData),
    Error(AuthError),
}

impl MachineState for SrpSignInState {
    fn label(&self) -> &'static str {
        match self {
            SrpSignInState::NotStarted => "SrpSignInState.notStarted",
            SrpSignInState::InitiatingSrpA(_) => "SrpSignInState.initiatingSrpA",
            SrpSignInState::RespondingPasswordVerifier(_) => {
                "SrpSignInState.respondingPasswordVerifier"
            }
            SrpSignInState::SignedIn(_) => "SrpSignInState.signedIn",
            SrpSignInState::Error(_) => "SrpSignInState.error",
        }
    }
}

pub struct SrpSignInResolver;

impl StateMachineResolver for SrpSignInResolver {
    type StateType = SrpSignInState;

    fn default_state(&self) -> SrpSignInState {
        SrpSignInState::NotStarted
    }

    fn resolve(
        &self,
        old_state: &SrpSignInState,
        event: &EventEnvelope,
    ) -> StateResolution<SrpSignInState> {
        if let Some(srp_event) = event.downcast_ref::<SrpSignInEvent>() {
            return self.resolve_srp_event(old_state, srp_event);
        }

        // Completion arrives on the shared sign-in family.
        if let Some(SignInEvent::FinalizeSignIn(data)) = event.downcast_ref::<SignInEvent>() {
            if matches!(old_state, SrpSignInState::RespondingPasswordVerifier(_)) {
                return StateResolution::from(SrpSignInState::SignedIn(data.clone()));
            }
        }

        StateResolution::from(old_state.clone())
    }
}

impl SrpSignInResolver {
    fn resolve_srp_event(
        &self,
        old_state: &SrpSignInState,
        event: &SrpSignInEvent,
    ) -> StateResolution<SrpSignInState> {
        match (old_state, event) {
            (SrpSignInState::NotStarted, SrpSignInEvent::InitiateSrp(data)) => {
                StateResolution::with_action(
                    SrpSignInState::InitiatingSrpA(data.clone()),
                    Box::new(InitiateAuthSrp {
                        sign_in_data: data.clone(),
                    }),
                )
            }
            (
                SrpSignInState::InitiatingSrpA(_),
                SrpSignInEvent::RespondPasswordVerifier(srp_state),
            ) => StateResolution::with_action(
                SrpSignInState::RespondingPasswordVerifier(srp_state.clone()),
                Box::new(VerifyPasswordSrp {
                    srp_state: srp_state.clone(),
                }),
            ),
            (
                SrpSignInState::NotStarted
                | SrpSignInState::InitiatingSrpA(_)
                | SrpSignInState::RespondingPasswordVerifier(_),
                SrpSignInEvent::ThrowAuthError(error),
            ) => StateResolution::from(SrpSignInState::Error(error.clone())),
            _ => StateResolution::from(old_state.clone()),
        }
    }
}
