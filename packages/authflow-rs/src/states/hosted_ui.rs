//! Hosted UI sign-in sub-machine.
//!
//! Present the page, capture the authorization code, exchange it for
//! tokens. Failures anywhere abandon the whole sign-in via a `CancelSignIn`
//! action - there is no mid-flow retry in a browser-delegated flow.

use crate::actions::{CancelSignIn, FetchHostedUiToken, ShowHostedUi};
use crate::core::EventEnvelope;
use crate::data::{HostedUiOptions, SignedInData};
use crate::error::AuthError;
use crate::events::{HostedUiEvent, SignInEvent};
use crate::resolver::{MachineState, StateMachineResolver, StateResolution};

#[derive(Debug, Clone, PartialEq)]
pub enum HostedUiSignInState {
    NotStarted,
    ShowingUi(HostedUiOptions),
    FetchingToken(String, HostedUiOptions),
    Done(SignedInData),
    Error(AuthError),
}

impl MachineState for HostedUiSignInState {
    fn label(&self) -> &'static str {
        match self {
            HostedUiSignInState::NotStarted => "HostedUiSignInState.notStarted",
            HostedUiSignInState::ShowingUi(_) => "HostedUiSignInState.showingUi",
            HostedUiSignInState::FetchingToken(..) => "HostedUiSignInState.fetchingToken",
            HostedUiSignInState::Done(_) => "HostedUiSignInState.done",
            HostedUiSignInState::Error(_) => "HostedUiSignInState.error",
        }
    }
}

pub struct HostedUiResolver;

impl StateMachineResolver for HostedUiResolver {
    type StateType = HostedUiSignInState;

    fn default_state(&self) -> HostedUiSignInState {
        HostedUiSignInState::NotStarted
    }

    fn resolve(
        &self,
        old_state: &HostedUiSignInState,
        event: &EventEnvelope,
    ) -> StateResolution<HostedUiSignInState> {
        if let Some(hosted_event) = event.downcast_ref::<HostedUiEvent>() {
            return match (old_state, hosted_event) {
                (HostedUiSignInState::NotStarted, HostedUiEvent::ShowHostedUi(options)) => {
                    StateResolution::with_action(
                        HostedUiSignInState::ShowingUi(options.clone()),
                        Box::new(ShowHostedUi {
                            options: options.clone(),
                        }),
                    )
                }
                (HostedUiSignInState::ShowingUi(options), HostedUiEvent::FetchToken(code)) => {
                    StateResolution::with_action(
                        HostedUiSignInState::FetchingToken(code.clone(), options.clone()),
                        Box::new(FetchHostedUiToken {
                            code: code.clone(),
                            options: options.clone(),
                        }),
                    )
                }
                (
                    HostedUiSignInState::ShowingUi(_) | HostedUiSignInState::FetchingToken(..),
                    HostedUiEvent::ThrowError(error),
                ) => StateResolution::with_action(
                    HostedUiSignInState::Error(error.clone()),
                    Box::new(CancelSignIn),
                ),
                _ => StateResolution::from(old_state.clone()),
            };
        }

        if let Some(SignInEvent::FinalizeSignIn(data)) = event.downcast_ref::<SignInEvent>() {
            if matches!(old_state, HostedUiSignInState::FetchingToken(..)) {
                return StateResolution::from(HostedUiSignInState::Done(data.clone()));
            }
        }

        StateResolution::from(old_state.clone())
    }
}
