//! Request extractors for authenticated routes
//!
//! `AuthenticatedUser` resolves the `Authorization: Bearer <access token>`
//! header into the account's current stored profile. Handlers that need a
//! privileged caller follow up with [`AuthenticatedUser::require_privileged`].

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use std::sync::Arc;

use crate::core::auth::api::AuthApiState;
use crate::core::auth::error::AuthError;
use crate::core::db::models::PublicProfile;
use crate::core::db::store::CredentialStore;

/// The caller behind a valid access token
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub PublicProfile);

impl AuthenticatedUser {
    pub fn into_profile(self) -> PublicProfile {
        self.0
    }

    /// Reject callers without a privileged role
    pub fn require_privileged(&self) -> Result<(), AuthError> {
        if self.0.role.is_privileged() {
            return Ok(());
        }
        tracing::warn!(
            identifier = %self.0.identifier,
            role = %self.0.role,
            "AUTH -> ROLE = insufficient role"
        );
        Err(AuthError::Forbidden)
    }
}

impl<S: CredentialStore> FromRequestParts<Arc<AuthApiState<S>>> for AuthenticatedUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AuthApiState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)?;
        let profile = state.auth_service.current_user(token).await?;
        Ok(AuthenticatedUser(profile))
    }
}

/// Extract Bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .ok_or(AuthError::InvalidAccessToken)?;

    if token.is_empty() {
        return Err(AuthError::InvalidAccessToken);
    }

    Ok(token)
}
