//! Credential store implementations
//!
//! `UserRepository` persists users in PostgreSQL; `MemoryUserStore` keeps them
//! in process memory for development and tests.

pub mod memory;
pub mod user;

pub use memory::MemoryUserStore;
pub use user::UserRepository;
