//! JWT utilities for token generation and validation
//!
//! Provides session token creation and validation using the HS256 algorithm.
//! Access tokens live for 24 hours, refresh tokens for 30 days. A token carries
//! a snapshot of the user's public profile; anything that must reflect the
//! current account state (re-issuing access tokens) re-reads the store.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::auth::error::AuthError;
use crate::core::db::models::PublicProfile;
use crate::core::db::store::CredentialStore;

/// Default access token lifetime (24 hours)
const ACCESS_TOKEN_EXPIRATION_HOURS: i64 = 24;

/// Default refresh token lifetime (30 days)
const REFRESH_TOKEN_EXPIRATION_DAYS: i64 = 30;

/// Longest lifetime accepted from configuration (one year)
const MAX_TOKEN_TTL_DAYS: i64 = 365;

/// Default token issuer
const DEFAULT_ISSUER: &str = "bengkel";

// ============================================================================
// Token Lifetime
// ============================================================================

/// Lifetime of an issued token.
///
/// Built from a `chrono::Duration`, a number of seconds, or a human-readable
/// period such as `"30 days"`, `"30d"`, `"24h"` or `"15 minutes"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenTtl(Duration);

impl TokenTtl {
    pub fn seconds(secs: i64) -> Self {
        Self(Duration::seconds(secs))
    }

    pub fn hours(hours: i64) -> Self {
        Self(Duration::hours(hours))
    }

    pub fn days(days: i64) -> Self {
        Self(Duration::days(days))
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }

    pub fn num_seconds(&self) -> i64 {
        self.0.num_seconds()
    }
}

impl From<Duration> for TokenTtl {
    fn from(duration: Duration) -> Self {
        Self(duration)
    }
}

impl std::str::FromStr for TokenTtl {
    type Err = JwtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || JwtError::InvalidTtl(s.to_string());
        let trimmed = s.trim();

        let split = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let (amount, unit) = trimmed.split_at(split);
        let amount: i64 = amount.parse().map_err(|_| invalid())?;

        let duration = match unit.trim().to_lowercase().as_str() {
            "" | "s" | "sec" | "secs" | "second" | "seconds" => Duration::try_seconds(amount),
            "m" | "min" | "mins" | "minute" | "minutes" => Duration::try_minutes(amount),
            "h" | "hr" | "hrs" | "hour" | "hours" => Duration::try_hours(amount),
            "d" | "day" | "days" => Duration::try_days(amount),
            "w" | "week" | "weeks" => Duration::try_weeks(amount),
            _ => return Err(invalid()),
        }
        .ok_or_else(invalid)?;

        if duration <= Duration::zero() || duration > Duration::days(MAX_TOKEN_TTL_DAYS) {
            return Err(invalid());
        }

        Ok(Self(duration))
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// JWT configuration
#[derive(Clone)]
pub struct JwtConfig {
    /// Secret key for signing tokens
    pub secret: String,
    /// Access token lifetime
    pub access_ttl: TokenTtl,
    /// Refresh token lifetime
    pub refresh_ttl: TokenTtl,
    /// Token issuer
    pub issuer: String,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("issuer", &self.issuer)
            .finish()
    }
}

impl JwtConfig {
    /// Create a new JWT configuration
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            access_ttl: TokenTtl::hours(ACCESS_TOKEN_EXPIRATION_HOURS),
            refresh_ttl: TokenTtl::days(REFRESH_TOKEN_EXPIRATION_DAYS),
            issuer: DEFAULT_ISSUER.to_string(),
        }
    }

    /// Create config from any key lookup (`JWT_SECRET`, `JWT_ACCESS_TTL`,
    /// `JWT_REFRESH_TTL`, `JWT_ISSUER`)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, JwtError> {
        let secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or(JwtError::MissingSecret)?;
        let mut config = Self::new(secret);

        if let Some(ttl) = lookup("JWT_ACCESS_TTL") {
            config.access_ttl = ttl.parse()?;
        }
        if let Some(ttl) = lookup("JWT_REFRESH_TTL") {
            config.refresh_ttl = ttl.parse()?;
        }
        if let Some(issuer) = lookup("JWT_ISSUER") {
            config.issuer = issuer;
        }

        Ok(config)
    }

    /// Set access token lifetime
    pub fn access_ttl(mut self, ttl: impl Into<TokenTtl>) -> Self {
        self.access_ttl = ttl.into();
        self
    }

    /// Set refresh token lifetime
    pub fn refresh_ttl(mut self, ttl: impl Into<TokenTtl>) -> Self {
        self.refresh_ttl = ttl.into();
        self
    }

    /// Set issuer
    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }
}

// ============================================================================
// Errors and Claims
// ============================================================================

/// JWT errors
///
/// Verification failures are deliberately opaque: an expired token, a bad
/// signature and a wrong token type all surface as `Invalid`.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT_SECRET environment variable not set")]
    MissingSecret,

    #[error("Invalid token lifetime: {0}")]
    InvalidTtl(String),

    #[error("Token encoding failed: {0}")]
    EncodingError(String),

    #[error("Invalid token")]
    Invalid,
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        tracing::debug!("Token rejected: {}", err);
        JwtError::Invalid
    }
}

/// Token type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenType::Access => write!(f, "access"),
            TokenType::Refresh => write!(f, "refresh"),
        }
    }
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Snapshot of the user's public profile at issuance time
    #[serde(flatten)]
    pub profile: PublicProfile,
    /// Token type (access or refresh)
    pub token_type: TokenType,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issuer
    pub iss: String,
    /// JWT ID (unique identifier for this token)
    pub jti: String,
}

impl Claims {
    pub fn is_access_token(&self) -> bool {
        self.token_type == TokenType::Access
    }

    pub fn is_refresh_token(&self) -> bool {
        self.token_type == TokenType::Refresh
    }

    pub fn identifier(&self) -> &str {
        &self.profile.identifier
    }
}

/// A signed token and its absolute expiry (Unix timestamp)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: i64,
}

/// Token pair (access + refresh) issued at login
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

// ============================================================================
// JWT Service
// ============================================================================

/// JWT service for token operations
#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    /// Create a new JWT service
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Refresh token lifetime (used for the cookie max-age)
    pub fn refresh_ttl(&self) -> TokenTtl {
        self.config.refresh_ttl
    }

    /// Sign `profile` into a token that expires `ttl` from now
    pub fn issue(
        &self,
        profile: &PublicProfile,
        ttl: TokenTtl,
        token_type: TokenType,
    ) -> Result<IssuedToken, JwtError> {
        let now = Utc::now();
        let exp = now
            .checked_add_signed(ttl.as_duration())
            .ok_or_else(|| JwtError::EncodingError(format!("expiry out of range: {ttl:?}")))?;

        let claims = Claims {
            profile: profile.clone(),
            token_type,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.config.issuer.clone(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingError(e.to_string()))?;

        Ok(IssuedToken {
            token,
            expires_at: exp.timestamp(),
        })
    }

    /// Issue an access token with the configured lifetime
    pub fn issue_access(&self, profile: &PublicProfile) -> Result<IssuedToken, JwtError> {
        self.issue(profile, self.config.access_ttl, TokenType::Access)
    }

    /// Issue a refresh token with the configured lifetime
    pub fn issue_refresh(&self, profile: &PublicProfile) -> Result<IssuedToken, JwtError> {
        self.issue(profile, self.config.refresh_ttl, TokenType::Refresh)
    }

    /// Issue both access and refresh tokens
    pub fn issue_pair(&self, profile: &PublicProfile) -> Result<TokenPair, JwtError> {
        Ok(TokenPair {
            access: self.issue_access(profile)?,
            refresh: self.issue_refresh(profile)?,
        })
    }

    /// Validate and decode a token of any type
    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.config.issuer]);
        // Set leeway to 0 for strict expiration checking
        validation.leeway = 0;

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)?;

        Ok(token_data.claims)
    }

    /// Validate an access token specifically
    pub fn verify_access(&self, token: &str) -> Result<Claims, JwtError> {
        let claims = self.verify(token)?;
        if !claims.is_access_token() {
            return Err(JwtError::Invalid);
        }
        Ok(claims)
    }

    /// Validate a refresh token specifically
    pub fn verify_refresh(&self, token: &str) -> Result<Claims, JwtError> {
        let claims = self.verify(token)?;
        if !claims.is_refresh_token() {
            return Err(JwtError::Invalid);
        }
        Ok(claims)
    }

    /// Issue a new access token from a refresh token.
    ///
    /// The embedded profile is only used to locate the account; the new token
    /// is built from the record currently in the store. Returns `Ok(None)` when
    /// the refresh token is not valid or the account no longer exists, meaning
    /// the client has to log in again.
    pub async fn reissue_access_token<S: CredentialStore>(
        &self,
        store: &S,
        refresh_token: &str,
    ) -> Result<Option<IssuedToken>, AuthError> {
        let claims = match self.verify_refresh(refresh_token) {
            Ok(claims) => claims,
            Err(_) => return Ok(None),
        };

        let Some(user) = store.find_by_identifier(claims.identifier()).await? else {
            return Ok(None);
        };

        let token = self.issue_access(&PublicProfile::from(user))?;
        Ok(Some(token))
    }
}
