//! WebAuthn sign-in sub-machine.
//!
//! Options fetch, platform assertion, backend verification. The error arm
//! is checked before the per-state switch so failure handling is uniform
//! across all in-flight variants.

use crate::actions::{AssertCredentials, CancelSignIn, FetchCredentialOptions,
    VerifyWebAuthnCredential};
use crate::core::EventEnvelope;
use crate::data::{CredentialAssertion, CredentialOptions, SignInEventData, SignedInData};
use crate::error::AuthError;
use crate::events::WebAuthnEvent;
use crate::resolver::{MachineState, StateMachineResolver, StateResolution};

#[derive(Debug, Clone, PartialEq)]
pub enum WebAuthnSignInState {
    NotStarted,
    FetchingCredentialOptions(SignInEventData),
    AssertingCredentials(CredentialOptions),
    VerifyingCredentialsAndSigningIn(CredentialAssertion),
    SignedIn(SignedInData),
    Cancelled,
    Error(AuthError),
}

impl WebAuthnSignInState {
    fn is_terminal(&self) -> bool {
        matches!(
            self,
            WebAuthnSignInState::SignedIn(_)
                | WebAuthnSignInState::Cancelled
                | WebAuthnSignInState::Error(_)
        )
    }
}

impl MachineState for WebAuthnSignInState {
    fn label(&self) -> &'static str {
        match self {
            WebAuthnSignInState::NotStarted => "WebAuthnSignInState.notStarted",
            WebAuthnSignInState::FetchingCredentialOptions(_) => {
                "WebAuthnSignInState.fetchingCredentialOptions"
            }
            WebAuthnSignInState::AssertingCredentials(_) => {
                "WebAuthnSignInState.assertingCredentials"
            }
            WebAuthnSignInState::VerifyingCredentialsAndSigningIn(_) => {
                "WebAuthnSignInState.verifyingCredentialsAndSigningIn"
            }
            WebAuthnSignInState::SignedIn(_) => "WebAuthnSignInState.signedIn",
            WebAuthnSignInState::Cancelled => "WebAuthnSignInState.cancelled",
            WebAuthnSignInState::Error(_) => "WebAuthnSignInState.error",
        }
    }
}

pub struct WebAuthnResolver;

impl StateMachineResolver for WebAuthnResolver {
    type StateType = WebAuthnSignInState;

    fn default_state(&self) -> WebAuthnSignInState {
        WebAuthnSignInState::NotStarted
    }

    fn resolve(
        &self,
        old_state: &WebAuthnSignInState,
        event: &EventEnvelope,
    ) -> StateResolution<WebAuthnSignInState> {
        let Some(webauthn_event) = event.downcast_ref::<WebAuthnEvent>() else {
            return StateResolution::from(old_state.clone());
        };

        // Errors first: every non-terminal variant fails the same way.
        if let WebAuthnEvent::ThrowError(error) = webauthn_event {
            if old_state.is_terminal() {
                return StateResolution::from(old_state.clone());
            }
            return StateResolution::with_action(
                WebAuthnSignInState::Error(error.clone()),
                Box::new(CancelSignIn),
            );
        }

        match (old_state, webauthn_event) {
            (WebAuthnSignInState::NotStarted, WebAuthnEvent::FetchCredentialOptions(data)) => {
                StateResolution::with_action(
                    WebAuthnSignInState::FetchingCredentialOptions(data.clone()),
                    Box::new(FetchCredentialOptions {
                        sign_in_data: data.clone(),
                    }),
                )
            }
            (
                WebAuthnSignInState::FetchingCredentialOptions(_),
                WebAuthnEvent::AssertCredentials(options),
            ) => StateResolution::with_action(
                WebAuthnSignInState::AssertingCredentials(options.clone()),
                Box::new(AssertCredentials {
                    options: options.clone(),
                }),
            ),
            (
                WebAuthnSignInState::AssertingCredentials(options),
                WebAuthnEvent::VerifyCredentialsAndSignIn(assertion),
            ) => StateResolution::with_action(
                WebAuthnSignInState::VerifyingCredentialsAndSigningIn(assertion.clone()),
                Box::new(VerifyWebAuthnCredential {
                    assertion: assertion.clone(),
                    username: options.username.clone(),
                }),
            ),
            (WebAuthnSignInState::AssertingCredentials(_), WebAuthnEvent::Cancel) => {
                StateResolution::with_action(
                    WebAuthnSignInState::Cancelled,
                    Box::new(CancelSignIn),
                )
            }
            (
                WebAuthnSignInState::VerifyingCredentialsAndSigningIn(_),
                WebAuthnEvent::SignedIn(data),
            ) => StateResolution::from(WebAuthnSignInState::SignedIn(data.clone())),
            _ => StateResolution::from(old_state.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{AuthFlowType, SignInMethod};
    use crate::testing::test_signed_in_data;

    fn sign_in_data() -> SignInEventData {
        SignInEventData {
            username: "alice".into(),
            password: None,
            sign_in_method: SignInMethod::ApiBased(AuthFlowType::UserAuth),
        }
    }

    fn credential_options() -> CredentialOptions {
        CredentialOptions {
            username: "alice".into(),
            options_json: "{}".into(),
        }
    }

    fn assertion() -> CredentialAssertion {
        CredentialAssertion {
            credential_id: "cred-1".into(),
            assertion_json: "{}".into(),
        }
    }

    #[test]
    fn test_happy_path_transitions() {
        let resolver = WebAuthnResolver;

        let r1 = resolver.resolve(
            &WebAuthnSignInState::NotStarted,
            &EventEnvelope::new(WebAuthnEvent::FetchCredentialOptions(sign_in_data())),
        );
        assert!(matches!(
            r1.new_state,
            WebAuthnSignInState::FetchingCredentialOptions(_)
        ));
        assert_eq!(r1.actions[0].label(), "FetchCredentialOptions");

        let r2 = resolver.resolve(
            &r1.new_state,
            &EventEnvelope::new(WebAuthnEvent::AssertCredentials(credential_options())),
        );
        assert!(matches!(
            r2.new_state,
            WebAuthnSignInState::AssertingCredentials(_)
        ));
        assert_eq!(r2.actions[0].label(), "AssertCredentials");

        let r3 = resolver.resolve(
            &r2.new_state,
            &EventEnvelope::new(WebAuthnEvent::VerifyCredentialsAndSignIn(assertion())),
        );
        assert!(matches!(
            r3.new_state,
            WebAuthnSignInState::VerifyingCredentialsAndSigningIn(_)
        ));
        assert_eq!(r3.actions[0].label(), "VerifyWebAuthnCredential");

        let data = test_signed_in_data("alice");
        let r4 = resolver.resolve(
            &r3.new_state,
            &EventEnvelope::new(WebAuthnEvent::SignedIn(data.clone())),
        );
        assert_eq!(r4.new_state, WebAuthnSignInState::SignedIn(data));
        assert!(r4.actions.is_empty());
    }

    #[test]
    fn test_throw_error_from_every_non_terminal_state() {
        let resolver = WebAuthnResolver;
        let event = EventEnvelope::new(WebAuthnEvent::ThrowError(AuthError::WebAuthn(
            "assertion rejected".into(),
        )));

        for state in [
            WebAuthnSignInState::NotStarted,
            WebAuthnSignInState::FetchingCredentialOptions(sign_in_data()),
            WebAuthnSignInState::AssertingCredentials(credential_options()),
            WebAuthnSignInState::VerifyingCredentialsAndSigningIn(assertion()),
        ] {
            let resolution = resolver.resolve(&state, &event);
            assert!(matches!(
                resolution.new_state,
                WebAuthnSignInState::Error(_)
            ));
        }
    }

    #[test]
    fn test_throw_error_does_not_disturb_terminal_states() {
        let resolver = WebAuthnResolver;
        let event = EventEnvelope::new(WebAuthnEvent::ThrowError(AuthError::UserCancelled));

        let cancelled = resolver.resolve(&WebAuthnSignInState::Cancelled, &event);
        assert_eq!(cancelled.new_state, WebAuthnSignInState::Cancelled);
        assert!(cancelled.actions.is_empty());
    }

    #[test]
    fn test_cancel_only_from_asserting() {
        let resolver = WebAuthnResolver;
        let event = EventEnvelope::new(WebAuthnEvent::Cancel);

        let asserting = WebAuthnSignInState::AssertingCredentials(credential_options());
        let resolution = resolver.resolve(&asserting, &event);
        assert_eq!(resolution.new_state, WebAuthnSignInState::Cancelled);
        assert_eq!(resolution.actions[0].label(), "CancelSignIn");

        let fetching = WebAuthnSignInState::FetchingCredentialOptions(sign_in_data());
        let resolution = resolver.resolve(&fetching, &event);
        assert_eq!(resolution.new_state, fetching);
    }
}
