//! Sign-out family.
//!
//! The pipeline is global sign-out → token revocation → local sign-out,
//! with hosted UI sign-out in front when the session came from the hosted
//! UI. Failures of the early steps ride along in the events so the final
//! `SignedOutData` can report them.

use crate::data::{
    GlobalSignOutError, HostedUiError, RevokeTokenError, SignOutEventData, SignedInData,
};

/// Events recognized by the sign-out state family.
#[derive(Debug, Clone, PartialEq)]
pub enum SignOutEvent {
    /// Invalidate tokens on every device.
    SignOutGlobally {
        signed_in_data: SignedInData,
        hosted_ui_error: Option<HostedUiError>,
    },

    /// Revoke the refresh token.
    RevokeToken {
        signed_in_data: SignedInData,
        hosted_ui_error: Option<HostedUiError>,
        global_sign_out_error: Option<GlobalSignOutError>,
    },

    /// Global sign-out failed; record it and still revoke the token.
    GlobalSignOutError {
        signed_in_data: SignedInData,
        global_sign_out_error: GlobalSignOutError,
        hosted_ui_error: Option<HostedUiError>,
    },

    /// Present the hosted UI sign-out page before touching tokens.
    InvokeHostedUiSignOut {
        sign_out_data: SignOutEventData,
        signed_in_data: SignedInData,
    },

    /// Sign out a guest session: nothing to revoke, just clear locally.
    SignOutGuest,

    /// Clear the local session, carrying whatever already went wrong.
    SignOutLocally {
        signed_in_data: Option<SignedInData>,
        hosted_ui_error: Option<HostedUiError>,
        global_sign_out_error: Option<GlobalSignOutError>,
        revoke_token_error: Option<RevokeTokenError>,
    },

    /// The local session is gone; the pipeline is complete.
    SignedOutSuccess {
        hosted_ui_error: Option<HostedUiError>,
        global_sign_out_error: Option<GlobalSignOutError>,
        revoke_token_error: Option<RevokeTokenError>,
    },

    /// Clearing the local session failed.
    SignedOutFailure,

    /// The user dismissed the hosted UI sign-out page.
    UserCancelled,
}
