//! Actions scheduled by the resolvers.
//!
//! One file per flow. Every action follows the same contract: do one unit
//! of work against the environment, then dispatch the outcome - success,
//! follow-up, or error - as events. Nothing here touches machine state.

mod authentication;
mod authorization;
mod hosted_ui;
mod sign_in;
mod sign_out;
mod sign_up;
mod webauthn;

pub use authentication::InitializeAuthentication;
pub use authorization::{FetchAwsCredentials, FetchIdentityId};
pub use hosted_ui::{FetchHostedUiToken, ShowHostedUi, StartHostedUiFlow};
pub use sign_in::{
    CancelSignIn, InitializeResolveChallenge, InitiateAuthSrp, SignInComplete, StartSrpFlow,
    VerifyPasswordSrp, VerifySignInChallenge,
};
pub use sign_out::{
    BuildRevokeTokenError, CancelSignOut, InitiateSignOut, RevokeToken, ShowHostedUiSignOut,
    SignOutGlobally, SignOutLocally,
};
pub use sign_up::{ConfirmSignUp, InitiateSignUp};
pub use webauthn::{
    AssertCredentials, FetchCredentialOptions, StartWebAuthnFlow, VerifyWebAuthnCredential,
};
