//! Authentication service
//!
//! Provides business logic for user registration, login, logout, and token refresh.
//! Coordinates between the credential store, password hasher, session policy and
//! JWT service. HTTP concerns (cookies, status codes) live in `api.rs`.

use crate::core::auth::error::AuthError;
use crate::core::auth::jwt::{IssuedToken, JwtService, TokenPair};
use crate::core::auth::password::PasswordHasher;
use crate::core::auth::session::SessionPolicy;
use crate::core::db::models::{NewUser, PublicProfile};
use crate::core::db::store::CredentialStore;
use crate::core::validation::{Credentials, LogoutTarget, Registration, validate_refresh_cookie};

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub profile: PublicProfile,
    pub tokens: TokenPair,
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService<S> {
    store: S,
    jwt_service: JwtService,
    hasher: PasswordHasher,
    sessions: SessionPolicy<S>,
}

impl<S: CredentialStore> AuthService<S> {
    /// Create a new authentication service
    pub fn new(store: S, jwt_service: JwtService, hasher: PasswordHasher) -> Self {
        Self {
            sessions: SessionPolicy::new(store.clone()),
            store,
            jwt_service,
            hasher,
        }
    }

    pub fn jwt(&self) -> &JwtService {
        &self.jwt_service
    }

    /// Register a new account with the default role, offline
    pub async fn register(&self, registration: Registration) -> Result<PublicProfile, AuthError> {
        if self
            .store
            .find_by_identifier(&registration.identifier)
            .await?
            .is_some()
        {
            return Err(AuthError::DuplicateIdentifier(registration.identifier));
        }

        let password_hash = self.hasher.hash(&registration.password)?;

        // A concurrent registration that slipped past the lookup still hits
        // the store's uniqueness check and surfaces as DuplicateIdentifier.
        let user = self
            .store
            .create(NewUser::with_default_role(
                registration.identifier,
                password_hash,
                registration.name,
            ))
            .await?;

        Ok(user.into())
    }

    /// Login an existing, currently offline user
    pub async fn login(&self, credentials: Credentials) -> Result<LoginOutcome, AuthError> {
        let user = self
            .store
            .find_by_identifier(&credentials.identifier)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !self.hasher.verify(&credentials.password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        let profile = PublicProfile::from(user);
        let tokens = self.jwt_service.issue_pair(&profile)?;

        // Claiming the session is the last step: nothing after it can fail
        self.sessions.begin(&profile.identifier).await?;

        Ok(LoginOutcome { profile, tokens })
    }

    /// Issue a new access token from the refresh cookie value
    pub async fn refresh(&self, refresh_cookie: Option<&str>) -> Result<IssuedToken, AuthError> {
        let token = validate_refresh_cookie(refresh_cookie)?.ok_or(AuthError::InvalidRefreshToken)?;

        self.jwt_service
            .reissue_access_token(&self.store, token)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)
    }

    /// End the session for an account (idempotent)
    pub async fn logout(&self, target: LogoutTarget) -> Result<(), AuthError> {
        self.sessions.end(&target.identifier).await
    }

    /// Resolve the current stored profile behind an access token
    pub async fn current_user(&self, access_token: &str) -> Result<PublicProfile, AuthError> {
        let claims = self.jwt_service.verify_access(access_token)?;

        let user = self
            .store
            .find_by_identifier(claims.identifier())
            .await?
            .ok_or(AuthError::InvalidAccessToken)?;

        Ok(user.into())
    }

    /// All accounts, without credentials
    pub async fn list_users(&self) -> Result<Vec<PublicProfile>, AuthError> {
        let users = self.store.list().await?;
        Ok(users.into_iter().map(PublicProfile::from).collect())
    }
}
