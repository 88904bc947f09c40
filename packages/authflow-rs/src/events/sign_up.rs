//! Sign-up family.

use crate::data::{CodeDeliveryDetails, SignUpEventData};
use crate::error::AuthError;

/// Events recognized by the sign-up state family.
#[derive(Debug, Clone, PartialEq)]
pub enum SignUpEvent {
    /// Begin a registration.
    InitiateSignUp(SignUpEventData),

    /// The backend accepted the registration.
    SignUpInitiated {
        user_confirmed: bool,
        code_delivery: Option<CodeDeliveryDetails>,
    },

    /// The caller supplied the delivered confirmation code.
    ConfirmSignUp { code: String },

    /// The registration is confirmed.
    SignUpConfirmed,

    /// A sign-up step failed.
    ThrowAuthError(AuthError),
}
