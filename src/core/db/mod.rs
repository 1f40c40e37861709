//! Database module
//!
//! This module provides database connectivity, the user model and the
//! credential store implementations.

pub mod models;
pub mod pool;
pub mod repositories;
pub mod store;

// Re-export commonly used items
pub use models::*;
pub use pool::{DbConfig, DbError, connect};
pub use repositories::{MemoryUserStore, UserRepository};
pub use store::{CredentialStore, StoreError};
