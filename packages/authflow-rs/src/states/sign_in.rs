//! Sign-in state family.
//!
//! Composite over the four flows: SRP, hosted UI, WebAuthn, and challenge
//! resolution. The resolver delegates to the active flow's resolver and
//! lifts the child's resolution back into its own shape; terminal child
//! states graduate into `SignedIn`/`Error` here, explicitly, after
//! delegation.
//!
//! Two events cut across flows and are handled before delegation:
//! - `ReceivedChallenge` moves any in-flight flow into challenge
//!   resolution, remembering the method that was signing in.
//! - `ThrowAuthError` on the shared family fails the whole sign-in.

use crate::actions::{InitializeResolveChallenge, SignInComplete};
use crate::core::EventEnvelope;
use crate::data::{HostedUiOptions, SignInEventData, SignInMethod, SignedInData};
use crate::error::AuthError;
use crate::events::SignInEvent;
use crate::resolver::{MachineState, StateMachineResolver, StateResolution};
use crate::states::challenge::{SignInChallengeResolver, SignInChallengeState};
use crate::states::hosted_ui::{HostedUiResolver, HostedUiSignInState};
use crate::states::srp::{SrpSignInResolver, SrpSignInState};
use crate::states::webauthn::{WebAuthnResolver, WebAuthnSignInState};

#[derive(Debug, Clone, PartialEq)]
pub enum SignInState {
    NotStarted,
    SigningInWithSrp(SrpSignInState, SignInEventData),
    SigningInViaHostedUi(HostedUiSignInState, HostedUiOptions),
    SigningInWithWebAuthn(WebAuthnSignInState, SignInEventData),
    ResolvingChallenge(SignInChallengeState, SignInMethod),
    SignedIn(SignedInData),
    Error(AuthError),
}

impl MachineState for SignInState {
    fn label(&self) -> &'static str {
        match self {
            SignInState::NotStarted => "SignInState.notStarted",
            SignInState::SigningInWithSrp(..) => "SignInState.signingInWithSrp",
            SignInState::SigningInViaHostedUi(..) => "SignInState.signingInViaHostedUi",
            SignInState::SigningInWithWebAuthn(..) => "SignInState.signingInWithWebAuthn",
            SignInState::ResolvingChallenge(..) => "SignInState.resolvingChallenge",
            SignInState::SignedIn(_) => "SignInState.signedIn",
            SignInState::Error(_) => "SignInState.error",
        }
    }
}

impl SignInState {
    /// The method the in-flight flow is signing in with, if any.
    fn active_method(&self) -> Option<SignInMethod> {
        match self {
            SignInState::SigningInWithSrp(_, data) => Some(data.sign_in_method.clone()),
            SignInState::SigningInViaHostedUi(_, options) => {
                Some(SignInMethod::HostedUi(options.clone()))
            }
            SignInState::SigningInWithWebAuthn(_, data) => Some(data.sign_in_method.clone()),
            SignInState::ResolvingChallenge(_, method) => Some(method.clone()),
            _ => None,
        }
    }
}

pub struct SignInResolver;

impl StateMachineResolver for SignInResolver {
    type StateType = SignInState;

    fn default_state(&self) -> SignInState {
        SignInState::NotStarted
    }

    fn resolve(&self, old_state: &SignInState, event: &EventEnvelope) -> StateResolution<SignInState> {
        if let Some(sign_in_event) = event.downcast_ref::<SignInEvent>() {
            match sign_in_event {
                SignInEvent::ReceivedChallenge(challenge) => {
                    if let Some(method) = old_state.active_method() {
                        return StateResolution::with_action(
                            SignInState::ResolvingChallenge(
                                SignInChallengeState::NotStarted,
                                method.clone(),
                            ),
                            Box::new(InitializeResolveChallenge {
                                challenge: challenge.clone(),
                                sign_in_method: method,
                            }),
                        );
                    }
                    return StateResolution::from(old_state.clone());
                }
                SignInEvent::ThrowAuthError(error) => {
                    if old_state.active_method().is_some() {
                        return StateResolution::from(SignInState::Error(error.clone()));
                    }
                    return StateResolution::from(old_state.clone());
                }
                // FinalizeSignIn flows through delegation below so the
                // completing child reaches its own terminal state first.
                SignInEvent::FinalizeSignIn(_) => {}
            }
        }

        match old_state {
            SignInState::SigningInWithSrp(child, data) => {
                let resolution = SrpSignInResolver.resolve(child, event);
                match resolution.new_state {
                    SrpSignInState::SignedIn(signed_in) => graduate(signed_in, resolution.actions),
                    SrpSignInState::Error(error) => StateResolution {
                        new_state: SignInState::Error(error),
                        actions: resolution.actions,
                    },
                    child_state => StateResolution {
                        new_state: SignInState::SigningInWithSrp(child_state, data.clone()),
                        actions: resolution.actions,
                    },
                }
            }
            SignInState::SigningInViaHostedUi(child, options) => {
                let resolution = HostedUiResolver.resolve(child, event);
                match resolution.new_state {
                    HostedUiSignInState::Done(signed_in) => graduate(signed_in, resolution.actions),
                    HostedUiSignInState::Error(error) => StateResolution {
                        new_state: SignInState::Error(error),
                        actions: resolution.actions,
                    },
                    child_state => StateResolution {
                        new_state: SignInState::SigningInViaHostedUi(child_state, options.clone()),
                        actions: resolution.actions,
                    },
                }
            }
            SignInState::SigningInWithWebAuthn(child, data) => {
                let resolution = WebAuthnResolver.resolve(child, event);
                match resolution.new_state {
                    WebAuthnSignInState::SignedIn(signed_in) => {
                        graduate(signed_in, resolution.actions)
                    }
                    WebAuthnSignInState::Error(error) => StateResolution {
                        new_state: SignInState::Error(error),
                        actions: resolution.actions,
                    },
                    // Cancelled stays wrapped; the child's CancelSignIn
                    // action routes the authentication family back to
                    // signed out.
                    child_state => StateResolution {
                        new_state: SignInState::SigningInWithWebAuthn(child_state, data.clone()),
                        actions: resolution.actions,
                    },
                }
            }
            SignInState::ResolvingChallenge(child, method) => {
                let resolution = SignInChallengeResolver.resolve(child, event);
                if resolution.new_state == SignInChallengeState::Verified {
                    // The challenge resolver emitted SignInComplete; the
                    // session payload rides on the finalize event.
                    if let Some(SignInEvent::FinalizeSignIn(signed_in)) =
                        event.downcast_ref::<SignInEvent>()
                    {
                        return StateResolution {
                            new_state: SignInState::SignedIn(signed_in.clone()),
                            actions: resolution.actions,
                        };
                    }
                }
                StateResolution {
                    new_state: SignInState::ResolvingChallenge(
                        resolution.new_state,
                        method.clone(),
                    ),
                    actions: resolution.actions,
                }
            }
            SignInState::NotStarted | SignInState::SignedIn(_) | SignInState::Error(_) => {
                StateResolution::from(old_state.clone())
            }
        }
    }
}

/// A flow finished with a session: record it and schedule completion.
fn graduate(
    signed_in: SignedInData,
    mut actions: Vec<Box<dyn crate::action::Action>>,
) -> StateResolution<SignInState> {
    actions.push(Box::new(SignInComplete {
        signed_in_data: signed_in.clone(),
    }));
    StateResolution {
        new_state: SignInState::SignedIn(signed_in),
        actions,
    }
}
