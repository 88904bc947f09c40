//! State families and their resolvers.
//!
//! The hierarchy, root to leaf:
//!
//! ```text
//! AuthState
//! ├── AuthenticationState
//! │   ├── SignInState
//! │   │   ├── SrpSignInState
//! │   │   ├── SignInChallengeState
//! │   │   ├── HostedUiSignInState
//! │   │   └── WebAuthnSignInState
//! │   ├── SignOutState
//! │   └── SignUpState
//! └── AuthorizationState
//!     └── FetchAuthSessionState
//! ```
//!
//! Each family is a tagged union plus a resolver. Parents carry children as
//! payload and delegate events downward; terminal child states graduate into
//! the matching parent variant.

mod auth;
mod authentication;
mod challenge;
mod hosted_ui;
mod session;
mod sign_in;
mod sign_out;
mod sign_up;
mod srp;
mod webauthn;

pub use auth::{AuthState, AuthStateResolver};
pub use authentication::{AuthenticationResolver, AuthenticationState};
pub use challenge::{SignInChallengeResolver, SignInChallengeState};
pub use hosted_ui::{HostedUiResolver, HostedUiSignInState};
pub use session::{
    AuthorizationResolver, AuthorizationState, FetchAuthSessionResolver, FetchAuthSessionState,
};
pub use sign_in::{SignInResolver, SignInState};
pub use sign_out::{SignOutResolver, SignOutState};
pub use sign_up::{SignUpResolver, SignUpState};
pub use srp::{SrpSignInResolver, SrpSignInState};
pub use webauthn::{WebAuthnResolver, WebAuthnSignInState};
