//! Challenge sub-machine.
//!
//! Holds an auxiliary verification step (SMS code, custom challenge) between
//! receipt and completion. Verification is retryable: from `Verifying` via
//! an explicit retry event, and from `Error` by answering again.

use crate::actions::{SignInComplete, VerifySignInChallenge};
use crate::core::EventEnvelope;
use crate::data::{ConfirmSignInEventData, RespondToAuthChallenge, SignInMethod, SignInStep};
use crate::error::AuthError;
use crate::events::{SignInChallengeEvent, SignInEvent};
use crate::resolver::{MachineState, StateMachineResolver, StateResolution};

#[derive(Debug, Clone, PartialEq)]
pub enum SignInChallengeState {
    NotStarted,
    WaitingForAnswer(RespondToAuthChallenge, SignInMethod, SignInStep),
    Verifying {
        challenge: RespondToAuthChallenge,
        method: SignInMethod,
        answer: String,
        step: SignInStep,
    },
    Verified,
    Error {
        challenge: RespondToAuthChallenge,
        method: SignInMethod,
        error: AuthError,
        step: SignInStep,
    },
}

impl MachineState for SignInChallengeState {
    fn label(&self) -> &'static str {
        match self {
            SignInChallengeState::NotStarted => "SignInChallengeState.notStarted",
            SignInChallengeState::WaitingForAnswer(..) => "SignInChallengeState.waitingForAnswer",
            SignInChallengeState::Verifying { .. } => "SignInChallengeState.verifying",
            SignInChallengeState::Verified => "SignInChallengeState.verified",
            SignInChallengeState::Error { .. } => "SignInChallengeState.error",
        }
    }
}

pub struct SignInChallengeResolver;

impl StateMachineResolver for SignInChallengeResolver {
    type StateType = SignInChallengeState;

    fn default_state(&self) -> SignInChallengeState {
        SignInChallengeState::NotStarted
    }

    fn resolve(
        &self,
        old_state: &SignInChallengeState,
        event: &EventEnvelope,
    ) -> StateResolution<SignInChallengeState> {
        if let Some(challenge_event) = event.downcast_ref::<SignInChallengeEvent>() {
            return self.resolve_challenge_event(old_state, challenge_event);
        }

        // Completion arrives on the shared sign-in family.
        if let Some(SignInEvent::FinalizeSignIn(data)) = event.downcast_ref::<SignInEvent>() {
            if matches!(old_state, SignInChallengeState::Verifying { .. }) {
                return StateResolution::with_action(
                    SignInChallengeState::Verified,
                    Box::new(SignInComplete {
                        signed_in_data: data.clone(),
                    }),
                );
            }
        }

        StateResolution::from(old_state.clone())
    }
}

impl SignInChallengeResolver {
    fn resolve_challenge_event(
        &self,
        old_state: &SignInChallengeState,
        event: &SignInChallengeEvent,
    ) -> StateResolution<SignInChallengeState> {
        match (old_state, event) {
            (
                SignInChallengeState::NotStarted,
                SignInChallengeEvent::WaitForAnswer(challenge, method, step),
            ) => StateResolution::from(SignInChallengeState::WaitingForAnswer(
                challenge.clone(),
                method.clone(),
                *step,
            )),
            (
                SignInChallengeState::WaitingForAnswer(challenge, method, step),
                SignInChallengeEvent::VerifyChallengeAnswer(answer),
            ) => verify(challenge, method, answer, *step),
            (
                SignInChallengeState::Verifying {
                    challenge, method, ..
                },
                SignInChallengeEvent::RetryVerifyChallengeAnswer(answer, step),
            ) => verify(challenge, method, answer, *step),
            (
                SignInChallengeState::Verifying {
                    challenge,
                    method,
                    step,
                    ..
                },
                SignInChallengeEvent::ThrowAuthError(error),
            ) => StateResolution::from(SignInChallengeState::Error {
                challenge: challenge.clone(),
                method: method.clone(),
                error: error.clone(),
                step: *step,
            }),
            // A fresh answer is allowed straight from the error state.
            (
                SignInChallengeState::Error {
                    challenge,
                    method,
                    step,
                    ..
                },
                SignInChallengeEvent::VerifyChallengeAnswer(answer),
            ) => verify(challenge, method, answer, *step),
            _ => StateResolution::from(old_state.clone()),
        }
    }
}

fn verify(
    challenge: &RespondToAuthChallenge,
    method: &SignInMethod,
    answer: &ConfirmSignInEventData,
    step: SignInStep,
) -> StateResolution<SignInChallengeState> {
    StateResolution::with_action(
        SignInChallengeState::Verifying {
            challenge: challenge.clone(),
            method: method.clone(),
            answer: answer.answer.clone(),
            step,
        },
        Box::new(VerifySignInChallenge {
            challenge: challenge.clone(),
            answer: answer.clone(),
            sign_in_method: method.clone(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{AuthFlowType, ChallengeType};
    use crate::error::ServiceError;
    use crate::testing::{test_challenge, test_signed_in_data};

    fn method() -> SignInMethod {
        SignInMethod::ApiBased(AuthFlowType::UserSrp)
    }

    fn answer(text: &str) -> ConfirmSignInEventData {
        ConfirmSignInEventData {
            answer: text.into(),
            attributes: Default::default(),
            metadata: Default::default(),
        }
    }

    fn waiting() -> SignInChallengeState {
        SignInChallengeState::WaitingForAnswer(
            test_challenge(ChallengeType::SmsMfa, "alice"),
            method(),
            SignInStep::ConfirmSignInWithSmsCode,
        )
    }

    fn verifying(ans: &str) -> SignInChallengeState {
        SignInChallengeState::Verifying {
            challenge: test_challenge(ChallengeType::SmsMfa, "alice"),
            method: method(),
            answer: ans.into(),
            step: SignInStep::ConfirmSignInWithSmsCode,
        }
    }

    #[test]
    fn test_wait_for_answer() {
        let resolver = SignInChallengeResolver;
        let event = EventEnvelope::new(SignInChallengeEvent::WaitForAnswer(
            test_challenge(ChallengeType::SmsMfa, "alice"),
            method(),
            SignInStep::ConfirmSignInWithSmsCode,
        ));

        let resolution = resolver.resolve(&SignInChallengeState::NotStarted, &event);

        assert_eq!(resolution.new_state, waiting());
        assert!(resolution.actions.is_empty());
    }

    #[test]
    fn test_verify_challenge_answer() {
        let resolver = SignInChallengeResolver;
        let event =
            EventEnvelope::new(SignInChallengeEvent::VerifyChallengeAnswer(answer("1233")));

        let resolution = resolver.resolve(&waiting(), &event);

        assert_eq!(resolution.new_state, verifying("1233"));
        assert_eq!(resolution.actions.len(), 1);
        assert_eq!(resolution.actions[0].label(), "VerifySignInChallenge");
    }

    #[test]
    fn test_retry_replaces_answer_and_reverifies() {
        let resolver = SignInChallengeResolver;
        let event = EventEnvelope::new(SignInChallengeEvent::RetryVerifyChallengeAnswer(
            answer("4567"),
            SignInStep::ConfirmSignInWithSmsCode,
        ));

        let resolution = resolver.resolve(&verifying("1233"), &event);

        assert_eq!(resolution.new_state, verifying("4567"));
        assert_eq!(resolution.actions.len(), 1);
        assert_eq!(resolution.actions[0].label(), "VerifySignInChallenge");
    }

    #[test]
    fn test_finalize_verifies_and_completes() {
        let resolver = SignInChallengeResolver;
        let event = EventEnvelope::new(SignInEvent::FinalizeSignIn(test_signed_in_data("alice")));

        let resolution = resolver.resolve(&verifying("1233"), &event);

        assert_eq!(resolution.new_state, SignInChallengeState::Verified);
        assert_eq!(resolution.actions[0].label(), "SignInComplete");
    }

    #[test]
    fn test_error_then_reanswer() {
        let resolver = SignInChallengeResolver;

        let error_event = EventEnvelope::new(SignInChallengeEvent::ThrowAuthError(
            ServiceError::CodeMismatch.into(),
        ));
        let errored = resolver.resolve(&verifying("0000"), &error_event);
        assert!(matches!(
            errored.new_state,
            SignInChallengeState::Error { .. }
        ));

        let retry_event =
            EventEnvelope::new(SignInChallengeEvent::VerifyChallengeAnswer(answer("1233")));
        let retried = resolver.resolve(&errored.new_state, &retry_event);
        assert_eq!(retried.new_state, verifying("1233"));
        assert_eq!(retried.actions.len(), 1);
    }

    #[test]
    fn test_unmatched_event_is_identity() {
        let resolver = SignInChallengeResolver;
        let event = EventEnvelope::new(SignInChallengeEvent::VerifyChallengeAnswer(answer("1")));

        let resolution = resolver.resolve(&SignInChallengeState::Verified, &event);
        assert_eq!(resolution.new_state, SignInChallengeState::Verified);
        assert!(resolution.actions.is_empty());
    }
}
