//! Authentication module
//!
//! This module provides authentication functionality including:
//! - bcrypt password hashing
//! - JWT access/refresh token issuing and verification
//! - Single-active-session enforcement
//! - REST API endpoints for auth operations

pub mod api;
pub mod error;
pub mod extract;
pub mod jwt;
pub mod password;
pub mod service;
pub mod session;

pub use api::{AuthApiState, auth_api_router};
pub use error::AuthError;
pub use extract::AuthenticatedUser;
pub use jwt::{Claims, IssuedToken, JwtConfig, JwtError, JwtService, TokenPair, TokenTtl, TokenType};
pub use password::{PasswordError, PasswordHasher};
pub use service::{AuthService, LoginOutcome};
pub use session::SessionPolicy;
