//! Authorization families: session establishment and credential fetching.

use crate::data::{AwsCredentials, SessionCredentials, UserPoolTokens};
use crate::error::AuthError;

/// Events recognized by the authorization state family.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthorizationEvent {
    /// Establish a session. Tokens are present after a user pool sign-in,
    /// absent for a guest session.
    FetchAuthSession { tokens: Option<UserPoolTokens> },

    /// Re-establish an existing session's credentials.
    RefreshSession,

    /// A session fetch failed.
    ThrowError(AuthError),
}

/// Events recognized by the fetch-auth-session sub-machine.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchAuthSessionEvent {
    /// The identity pool resolved an identity id.
    FetchedIdentityId(String),

    /// The identity pool vended AWS credentials.
    FetchedAwsCredentials(AwsCredentials),

    /// The session was assembled without an identity pool round trip.
    Fetched(SessionCredentials),

    /// A fetch step failed.
    ThrowError(AuthError),
}
