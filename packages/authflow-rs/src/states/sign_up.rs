//! Sign-up state family.

use crate::actions::{ConfirmSignUp, InitiateSignUp};
use crate::core::EventEnvelope;
use crate::data::{CodeDeliveryDetails, SignUpEventData};
use crate::error::AuthError;
use crate::events::SignUpEvent;
use crate::resolver::{MachineState, StateMachineResolver, StateResolution};

#[derive(Debug, Clone, PartialEq)]
pub enum SignUpState {
    NotStarted,
    InitiatingSignUp(SignUpEventData),
    AwaitingUserConfirmation(SignUpEventData, Option<CodeDeliveryDetails>),
    ConfirmingSignUp(SignUpEventData),
    SignedUp(String),
    Error(AuthError),
}

impl MachineState for SignUpState {
    fn label(&self) -> &'static str {
        match self {
            SignUpState::NotStarted => "SignUpState.notStarted",
            SignUpState::InitiatingSignUp(_) => "SignUpState.initiatingSignUp",
            SignUpState::AwaitingUserConfirmation(..) => "SignUpState.awaitingUserConfirmation",
            SignUpState::ConfirmingSignUp(_) => "SignUpState.confirmingSignUp",
            SignUpState::SignedUp(_) => "SignUpState.signedUp",
            SignUpState::Error(_) => "SignUpState.error",
        }
    }
}

pub struct SignUpResolver;

impl StateMachineResolver for SignUpResolver {
    type StateType = SignUpState;

    fn default_state(&self) -> SignUpState {
        SignUpState::NotStarted
    }

    fn resolve(
        &self,
        old_state: &SignUpState,
        event: &EventEnvelope,
    ) -> StateResolution<SignUpState> {
        let Some(sign_up_event) = event.downcast_ref::<SignUpEvent>() else {
            return StateResolution::from(old_state.clone());
        };

        match (old_state, sign_up_event) {
            (SignUpState::NotStarted | SignUpState::Error(_), SignUpEvent::InitiateSignUp(data)) => {
                StateResolution::with_action(
                    SignUpState::InitiatingSignUp(data.clone()),
                    Box::new(InitiateSignUp {
                        sign_up_data: data.clone(),
                    }),
                )
            }
            (
                SignUpState::InitiatingSignUp(data),
                SignUpEvent::SignUpInitiated {
                    user_confirmed,
                    code_delivery,
                },
            ) => {
                if *user_confirmed {
                    StateResolution::from(SignUpState::SignedUp(data.username.clone()))
                } else {
                    StateResolution::from(SignUpState::AwaitingUserConfirmation(
                        data.clone(),
                        code_delivery.clone(),
                    ))
                }
            }
            (
                SignUpState::AwaitingUserConfirmation(data, _),
                SignUpEvent::ConfirmSignUp { code },
            ) => StateResolution::with_action(
                SignUpState::ConfirmingSignUp(data.clone()),
                Box::new(ConfirmSignUp {
                    username: data.username.clone(),
                    code: code.clone(),
                }),
            ),
            (SignUpState::ConfirmingSignUp(data), SignUpEvent::SignUpConfirmed) => {
                StateResolution::from(SignUpState::SignedUp(data.username.clone()))
            }
            (
                SignUpState::InitiatingSignUp(_)
                | SignUpState::AwaitingUserConfirmation(..)
                | SignUpState::ConfirmingSignUp(_),
                SignUpEvent::ThrowAuthError(error),
            ) => StateResolution::from(SignUpState::Error(error.clone())),
            _ => StateResolution::from(old_state.clone()),
        }
    }
}
