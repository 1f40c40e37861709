//! Single-active-session policy
//!
//! An account may hold one session at a time. The online flag in the store is
//! the lock: login claims it with an atomic `false → true` transition, logout
//! releases it unconditionally.

use crate::core::auth::error::AuthError;
use crate::core::db::store::CredentialStore;

/// Enforces one concurrent session per account
#[derive(Clone)]
pub struct SessionPolicy<S> {
    store: S,
}

impl<S: CredentialStore> SessionPolicy<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Claim the session slot for `identifier`.
    ///
    /// Fails with `AlreadyLoggedIn` when the account is already online,
    /// including when a concurrent login claimed it first.
    pub async fn begin(&self, identifier: &str) -> Result<(), AuthError> {
        if self.store.try_mark_online(identifier).await? {
            Ok(())
        } else {
            Err(AuthError::AlreadyLoggedIn)
        }
    }

    /// Release the session slot. Succeeds for unknown or offline accounts too.
    pub async fn end(&self, identifier: &str) -> Result<(), AuthError> {
        self.store.set_online(identifier, false).await?;
        Ok(())
    }
}
