//! Session Authentication
//!
//! The login flow lives outside this service. What reaches the API is its
//! output: an HS256-signed session token whose `sub` claim is the user id.
//! The token is read from `Authorization: Bearer <token>` or, for browser
//! requests, from the `pactbot_session` cookie. The user id becomes the
//! [`OwnerId`] every record operation is scoped to.

use std::sync::Arc;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use pactbot_core::OwnerId;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};

/// Name of the session cookie set by the login flow.
pub const SESSION_COOKIE: &str = "pactbot_session";

const INSECURE_DEFAULT_SECRET: &str = "INSECURE_DEFAULT_SECRET_CHANGE_IN_PRODUCTION";

// ============================================================================
// CLOCK ABSTRACTION
// ============================================================================

/// Source of "now" for token expiry checks, injectable for tests.
pub trait SessionClock: Send + Sync {
    /// Current time as Unix epoch seconds.
    fn now_epoch_secs(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SessionClock for SystemClock {
    fn now_epoch_secs(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Clock frozen at a fixed instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl SessionClock for FixedClock {
    fn now_epoch_secs(&self) -> i64 {
        self.0
    }
}

// ============================================================================
// SESSION SECRET
// ============================================================================

/// Session signing secret. Never printed.
#[derive(Clone)]
pub struct SessionSecret(SecretString);

impl SessionSecret {
    /// Wrap `secret`. Blank values fall back to the insecure default, which
    /// [`AuthConfig::validate_for_production`] refuses in production.
    pub fn new(secret: impl Into<String>) -> Self {
        let secret = secret.into();
        let secret = if secret.trim().is_empty() {
            INSECURE_DEFAULT_SECRET.to_string()
        } else {
            secret
        };
        Self(SecretString::from(secret))
    }

    /// Expose the secret value for signing and verification only.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    pub fn len(&self) -> usize {
        self.0.expose_secret().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }

    pub fn is_insecure_default(&self) -> bool {
        self.0.expose_secret() == INSECURE_DEFAULT_SECRET
    }
}

impl std::fmt::Debug for SessionSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionSecret([REDACTED, {} chars])", self.len())
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Session authentication configuration.
#[derive(Clone)]
pub struct AuthConfig {
    pub secret: SessionSecret,

    /// Lifetime of tokens issued by [`generate_session_token`] (default: 7 days)
    pub session_ttl_secs: i64,

    /// Tolerated clock drift when checking expiry (default: 60)
    pub clock_skew_secs: i64,

    /// Deployment environment name; "production"/"prod" enable strict checks.
    pub environment: String,

    pub clock: Arc<dyn SessionClock>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &self.secret)
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("clock_skew_secs", &self.clock_skew_secs)
            .field("environment", &self.environment)
            .field("clock", &"<SessionClock>")
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: SessionSecret::new(INSECURE_DEFAULT_SECRET),
            session_ttl_secs: 7 * 24 * 3600,
            clock_skew_secs: 60,
            environment: "development".to_string(),
            clock: Arc::new(SystemClock),
        }
    }
}

impl AuthConfig {
    /// Create authentication configuration from environment variables.
    ///
    /// - `PACTBOT_SESSION_SECRET`: Token signing secret
    /// - `PACTBOT_SESSION_TTL_SECS`: Issued token lifetime (default: 604800)
    /// - `PACTBOT_ENVIRONMENT`: Deployment environment (default: development)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            secret: std::env::var("PACTBOT_SESSION_SECRET")
                .map(SessionSecret::new)
                .unwrap_or(defaults.secret),
            session_ttl_secs: std::env::var("PACTBOT_SESSION_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.session_ttl_secs),
            clock_skew_secs: defaults.clock_skew_secs,
            environment: std::env::var("PACTBOT_ENVIRONMENT")
                .map(|s| s.to_lowercase())
                .unwrap_or(defaults.environment),
            clock: defaults.clock,
        }
    }

    /// Config with a fixed secret and the system clock, for tests and tooling.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            secret: SessionSecret::new(secret),
            ..Self::default()
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production" || self.environment == "prod"
    }

    /// Refuse insecure secrets in production; warn about them elsewhere.
    ///
    /// Called once at startup.
    pub fn validate_for_production(&self) -> ApiResult<()> {
        if self.secret.is_insecure_default() {
            if self.is_production() {
                return Err(ApiError::internal_error(
                    "Cannot start in production with the default session secret. \
                     Set PACTBOT_SESSION_SECRET.",
                ));
            }
            tracing::warn!(
                "Using the insecure default session secret. Set PACTBOT_SESSION_SECRET \
                 before deploying."
            );
        } else if self.secret.len() < 32 {
            if self.is_production() {
                return Err(ApiError::internal_error(format!(
                    "Session secret is too short for production use ({} chars, need 32).",
                    self.secret.len()
                )));
            }
            tracing::warn!(
                length = self.secret.len(),
                "Session secret is shorter than 32 characters"
            );
        }
        Ok(())
    }
}

// ============================================================================
// SESSION CLAIMS
// ============================================================================

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    pub fn new(user_id: impl Into<String>, ttl_secs: i64, clock: &dyn SessionClock) -> Self {
        let now = clock.now_epoch_secs();
        Self {
            sub: user_id.into(),
            iat: now,
            exp: now + ttl_secs,
        }
    }
}

// ============================================================================
// AUTHENTICATION CONTEXT
// ============================================================================

/// The authenticated caller, injected into request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    /// Owner of every record this request touches.
    pub owner: OwnerId,
}

impl From<Claims> for AuthContext {
    fn from(claims: Claims) -> Self {
        Self {
            owner: OwnerId::new(claims.sub),
        }
    }
}

// ============================================================================
// TOKENS
// ============================================================================

/// Issue a session token for `claims`.
pub fn encode_session_token(config: &AuthConfig, claims: &Claims) -> ApiResult<String> {
    let key = EncodingKey::from_secret(config.secret.expose().as_bytes());
    encode(&Header::new(Algorithm::HS256), claims, &key)
        .map_err(|e| ApiError::internal_error(format!("Failed to issue session token: {}", e)))
}

/// Issue a session token for `user_id` using the configured lifetime.
pub fn generate_session_token(config: &AuthConfig, user_id: &str) -> ApiResult<String> {
    let claims = Claims::new(user_id, config.session_ttl_secs, &*config.clock);
    encode_session_token(config, &claims)
}

/// Verify a session token and return its claims.
///
/// Signature checking is left to `jsonwebtoken`; expiry is checked against
/// the configured clock.
pub fn validate_session_token(config: &AuthConfig, token: &str) -> ApiResult<Claims> {
    let key = DecodingKey::from_secret(config.secret.expose().as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.required_spec_claims = std::collections::HashSet::from(["exp".to_string()]);

    let claims = decode::<Claims>(token, &key, &validation)
        .map_err(|e| {
            tracing::debug!(error = %e, "Rejected session token");
            ApiError::unauthorized("Invalid session token")
        })?
        .claims;

    let now = config.clock.now_epoch_secs();
    if claims.exp < now - config.clock_skew_secs {
        return Err(ApiError::unauthorized("Session has expired"));
    }
    if claims.sub.trim().is_empty() {
        return Err(ApiError::unauthorized("Session token has no subject"));
    }

    Ok(claims)
}

/// Find the session cookie in a `Cookie` header value.
pub fn session_cookie(cookie_header: &str) -> Option<&str> {
    cookie_header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim_matches('"'))
        .filter(|value| !value.is_empty())
}

/// Authenticate a request from its `Authorization` and `Cookie` headers.
///
/// A bearer token takes precedence over the cookie.
pub fn authenticate(
    config: &AuthConfig,
    auth_header: Option<&str>,
    cookie_header: Option<&str>,
) -> ApiResult<AuthContext> {
    if let Some(auth_value) = auth_header {
        let token = auth_value
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::unauthorized("Authorization header must use Bearer scheme"))?;
        return validate_session_token(config, token.trim()).map(AuthContext::from);
    }

    if let Some(token) = cookie_header.and_then(session_cookie) {
        return validate_session_token(config, token).map(AuthContext::from);
    }

    Err(ApiError::unauthorized(
        "Authentication required: provide a session cookie or Authorization header",
    ))
}
