//! Domain data carried inside states and events.
//!
//! These types are plain values: cloneable, comparable, serializable. They
//! are threaded through states without mutation - a state transition always
//! replaces the whole state value, payloads included.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, ServiceError};

// =============================================================================
// Configuration
// =============================================================================

/// Resolved backend configuration.
///
/// Set once at configure time and carried inside most states afterwards.
/// Mirrors the three deployment shapes: user pool only, identity pool only,
/// or both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthConfiguration {
    UserPools(UserPoolConfig),
    IdentityPools(IdentityPoolConfig),
    UserPoolsAndIdentityPools(UserPoolConfig, IdentityPoolConfig),
}

impl AuthConfiguration {
    /// Parse a configuration from its JSON document form.
    pub fn from_json(json: &str) -> Result<Self, AuthError> {
        serde_json::from_str(json)
            .map_err(|e| AuthError::Configuration(format!("invalid configuration json: {e}")))
    }

    /// The user pool section, if this configuration has one.
    pub fn user_pool(&self) -> Option<&UserPoolConfig> {
        match self {
            AuthConfiguration::UserPools(up) => Some(up),
            AuthConfiguration::UserPoolsAndIdentityPools(up, _) => Some(up),
            AuthConfiguration::IdentityPools(_) => None,
        }
    }

    /// The identity pool section, if this configuration has one.
    pub fn identity_pool(&self) -> Option<&IdentityPoolConfig> {
        match self {
            AuthConfiguration::IdentityPools(ip) => Some(ip),
            AuthConfiguration::UserPoolsAndIdentityPools(_, ip) => Some(ip),
            AuthConfiguration::UserPools(_) => None,
        }
    }
}

/// User pool parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPoolConfig {
    pub pool_id: String,
    pub client_id: String,
    pub region: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub hosted_ui_domain: Option<String>,
}

/// Identity pool parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityPoolConfig {
    pub pool_id: String,
    pub region: String,
}

// =============================================================================
// Sign-in inputs
// =============================================================================

/// How a sign-in is being performed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignInMethod {
    /// Direct API flow against the user pool.
    ApiBased(AuthFlowType),
    /// Browser-delegated OAuth/OIDC flow.
    HostedUi(HostedUiOptions),
}

/// The user pool auth flow driving an API-based sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthFlowType {
    UserSrp,
    UserPassword,
    Custom,
    UserAuth,
}

/// Parameters of a hosted UI sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostedUiOptions {
    pub scopes: Vec<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub private_session: bool,
}

/// Caller-supplied data for one sign-in attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignInEventData {
    pub username: String,
    pub password: Option<String>,
    pub sign_in_method: SignInMethod,
}

/// Caller-supplied answer to an in-flight challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmSignInEventData {
    pub answer: String,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

// =============================================================================
// Sessions
// =============================================================================

/// Tokens issued by the user pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPoolTokens {
    pub id_token: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

/// Everything known about an established sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedInData {
    pub user_id: String,
    pub username: String,
    pub signed_in_date: DateTime<Utc>,
    pub sign_in_method: SignInMethod,
    pub tokens: UserPoolTokens,
}

impl SignedInData {
    pub fn new(
        user_id: impl Into<String>,
        username: impl Into<String>,
        sign_in_method: SignInMethod,
        tokens: UserPoolTokens,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
            signed_in_date: Utc::now(),
            sign_in_method,
            tokens,
        }
    }
}

/// Residue of a completed (or partially failed) sign-out.
///
/// The sign-out pipeline is best-effort past the first step: a failed global
/// sign-out or token revocation does not stop the local sign-out, it is
/// recorded here instead.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignedOutData {
    pub last_known_username: Option<String>,
    pub hosted_ui_error: Option<HostedUiError>,
    pub global_sign_out_error: Option<GlobalSignOutError>,
    pub revoke_token_error: Option<RevokeTokenError>,
}

impl SignedOutData {
    pub fn with_username(username: impl Into<String>) -> Self {
        Self {
            last_known_username: Some(username.into()),
            ..Default::default()
        }
    }

    /// True if every step of the pipeline succeeded.
    pub fn is_clean(&self) -> bool {
        self.hosted_ui_error.is_none()
            && self.global_sign_out_error.is_none()
            && self.revoke_token_error.is_none()
    }
}

/// A hosted UI sign-out step that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedUiError {
    pub error: ServiceError,
}

/// A global sign-out call that failed, with the access token it targeted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalSignOutError {
    pub access_token: String,
    pub error: ServiceError,
}

/// A token revocation call that failed, with the refresh token it targeted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevokeTokenError {
    pub refresh_token: String,
    pub error: ServiceError,
}

// =============================================================================
// Challenges
// =============================================================================

/// The kind of additional verification the backend demanded mid-sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChallengeType {
    SmsMfa,
    EmailOtp,
    SoftwareTokenMfa,
    CustomChallenge,
    NewPasswordRequired,
    DeviceSrpAuth,
}

/// A challenge as handed back by the backend, with the session to answer it
/// against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RespondToAuthChallenge {
    pub challenge: ChallengeType,
    pub username: String,
    pub session: Option<String>,
    pub parameters: HashMap<String, String>,
}

/// Where in the overall sign-in a challenge sits. Carried through the
/// challenge sub-machine so retries keep their place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignInStep {
    ConfirmSignInWithSmsCode,
    ConfirmSignInWithEmailCode,
    ConfirmSignInWithTotpCode,
    ConfirmSignInWithCustomChallenge,
    ConfirmSignInWithNewPassword,
}

impl SignInStep {
    /// The step a freshly received challenge maps to.
    pub fn for_challenge(challenge: ChallengeType) -> Self {
        match challenge {
            ChallengeType::SmsMfa => SignInStep::ConfirmSignInWithSmsCode,
            ChallengeType::EmailOtp => SignInStep::ConfirmSignInWithEmailCode,
            ChallengeType::SoftwareTokenMfa => SignInStep::ConfirmSignInWithTotpCode,
            ChallengeType::CustomChallenge | ChallengeType::DeviceSrpAuth => {
                SignInStep::ConfirmSignInWithCustomChallenge
            }
            ChallengeType::NewPasswordRequired => SignInStep::ConfirmSignInWithNewPassword,
        }
    }
}

// =============================================================================
// SRP
// =============================================================================

/// State accumulated between the two SRP round trips.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrpStateData {
    pub username: String,
    pub password: String,
    pub client_timestamp: DateTime<Utc>,
    pub challenge: RespondToAuthChallenge,
}

// =============================================================================
// WebAuthn
// =============================================================================

/// Credential request options fetched from the backend, opaque to the
/// machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialOptions {
    pub username: String,
    pub options_json: String,
}

/// A platform authenticator assertion, opaque to the machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialAssertion {
    pub credential_id: String,
    pub assertion_json: String,
}

// =============================================================================
// Sign-up
// =============================================================================

/// Caller-supplied data for one sign-up attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignUpEventData {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

/// Where a confirmation code was delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeDeliveryDetails {
    pub destination: String,
    pub medium: DeliveryMedium,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryMedium {
    Email,
    Sms,
}

// =============================================================================
// Sign-out inputs
// =============================================================================

/// Caller-supplied data for one sign-out request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SignOutEventData {
    /// Invalidate tokens on every device, not just this one.
    pub global_sign_out: bool,
}

// =============================================================================
// Credentials (authorization family)
// =============================================================================

/// AWS credentials vended by the identity pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expiration: DateTime<Utc>,
}

/// The credential set backing an established session.
///
/// Which variant applies depends on the configuration shape: user pool only
/// deployments have tokens, identity pool only deployments have AWS
/// credentials, combined deployments have both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCredentials {
    UserPoolOnly {
        tokens: UserPoolTokens,
    },
    IdentityPoolOnly {
        identity_id: String,
        credentials: AwsCredentials,
    },
    UserPoolAndIdentityPool {
        tokens: UserPoolTokens,
        identity_id: String,
        credentials: AwsCredentials,
    },
    NoCredentials,
}

impl SessionCredentials {
    /// The user pool tokens inside this credential set, if any.
    pub fn tokens(&self) -> Option<&UserPoolTokens> {
        match self {
            SessionCredentials::UserPoolOnly { tokens } => Some(tokens),
            SessionCredentials::UserPoolAndIdentityPool { tokens, .. } => Some(tokens),
            _ => None,
        }
    }
}
