//! In-process credential store
//!
//! Used when no `DATABASE_URL` is configured and throughout the test suite.
//! Records live in a `DashMap`; the online transition runs under the entry's
//! shard lock so it is atomic with respect to concurrent logins.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::core::db::models::{NewUser, User};
use crate::core::db::store::{CredentialStore, StoreError};

/// Credential store backed by a concurrent hash map
#[derive(Clone, Default)]
pub struct MemoryUserStore {
    users: Arc<DashMap<String, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Direct record edits for tests; accounts change only through the auth API
#[cfg(test)]
impl MemoryUserStore {
    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn set_role(&self, identifier: &str, role: crate::core::db::models::Role) -> bool {
        match self.users.get_mut(identifier) {
            Some(mut user) => {
                user.role = role;
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, identifier: &str) -> Option<User> {
        self.users.remove(identifier).map(|(_, user)| user)
    }
}

impl CredentialStore for MemoryUserStore {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(identifier).map(|entry| entry.clone()))
    }

    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        match self.users.entry(new_user.identifier.clone()) {
            Entry::Occupied(_) => Err(StoreError::DuplicateIdentifier(new_user.identifier)),
            Entry::Vacant(slot) => {
                let user = User {
                    identifier: new_user.identifier,
                    password_hash: new_user.password_hash,
                    name: new_user.name,
                    role: new_user.role,
                    is_online: false,
                    created_at: Utc::now(),
                };
                slot.insert(user.clone());
                Ok(user)
            }
        }
    }

    async fn set_online(&self, identifier: &str, online: bool) -> Result<(), StoreError> {
        if let Some(mut user) = self.users.get_mut(identifier) {
            user.is_online = online;
        }
        Ok(())
    }

    async fn try_mark_online(&self, identifier: &str) -> Result<bool, StoreError> {
        match self.users.get_mut(identifier) {
            Some(mut user) if !user.is_online => {
                user.is_online = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self.users.iter().map(|entry| entry.clone()).collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }
}
