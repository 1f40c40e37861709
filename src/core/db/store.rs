//! Credential store abstraction
//!
//! The auth controller only talks to user records through this trait, so the
//! PostgreSQL repository and the in-process store are interchangeable.

use std::future::Future;

use crate::core::db::models::{NewUser, User};

/// Errors surfaced by a credential store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Identifier \"{0}\" already exists")]
    DuplicateIdentifier(String),

    #[error("Stored record is corrupt: {0}")]
    Corrupt(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Persistence operations needed by the auth/session core.
///
/// All operations are asynchronous and fallible. None of them retries.
pub trait CredentialStore: Clone + Send + Sync + 'static {
    /// Look up a user by natural key
    fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> impl Future<Output = Result<Option<User>, StoreError>> + Send;

    /// Insert a new user, failing with `DuplicateIdentifier` if the key is taken
    fn create(&self, user: NewUser) -> impl Future<Output = Result<User, StoreError>> + Send;

    /// Unconditionally set the online flag. Unknown identifiers are a no-op.
    fn set_online(
        &self,
        identifier: &str,
        online: bool,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Atomically flip the online flag from `false` to `true`.
    ///
    /// Returns `true` only for the caller that performed the transition.
    fn try_mark_online(&self, identifier: &str)
    -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// All users, newest first
    fn list(&self) -> impl Future<Output = Result<Vec<User>, StoreError>> + Send;
}
