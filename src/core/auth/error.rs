//! Authentication error taxonomy
//!
//! Every controller outcome that is not a success maps onto one of these
//! variants. The HTTP status for each is fixed in `api.rs`:
//! validation → 422, authentication → 401, everything unexpected → 500.

use crate::core::auth::jwt::JwtError;
use crate::core::auth::password::PasswordError;
use crate::core::db::store::StoreError;
use crate::core::validation::ValidationError;

/// Authentication service error types
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Identifier \"{0}\" already exists. Please try another one.")]
    DuplicateIdentifier(String),

    #[error("User does not exist.")]
    UserNotFound,

    #[error("Invalid credentials.")]
    InvalidCredentials,

    #[error("User already logged in.")]
    AlreadyLoggedIn,

    #[error("Invalid refresh token!")]
    InvalidRefreshToken,

    #[error("Invalid access token.")]
    InvalidAccessToken,

    #[error("Insufficient role for this operation.")]
    Forbidden,

    #[error("{0}")]
    Internal(String),
}

impl AuthError {
    /// Whether the error stems from bad credentials or tokens
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            AuthError::UserNotFound
                | AuthError::InvalidCredentials
                | AuthError::AlreadyLoggedIn
                | AuthError::InvalidRefreshToken
                | AuthError::InvalidAccessToken
        )
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateIdentifier(identifier) => AuthError::DuplicateIdentifier(identifier),
            _ => AuthError::Internal(err.to_string()),
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Invalid => AuthError::InvalidAccessToken,
            _ => AuthError::Internal(err.to_string()),
        }
    }
}

impl From<PasswordError> for AuthError {
    fn from(err: PasswordError) -> Self {
        AuthError::Internal(err.to_string())
    }
}
