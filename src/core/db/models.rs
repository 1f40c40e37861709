//! Database models for the workshop auth service
//!
//! This module defines the user entity stored by the credential store and the
//! public projection of it that is safe to hand out in tokens and presence
//! broadcasts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Role
// ============================================================================

/// Roles a workshop account can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Privileged role (workshop head / administrator)
    Admin,
    /// Front-desk advisor who owns customer units
    ServiceAdvisor,
    /// Default role given to every self-registered account
    #[default]
    Technician,
}

impl Role {
    /// Whether this role may access administrative endpoints
    pub fn is_privileged(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::ServiceAdvisor => write!(f, "service_advisor"),
            Role::Technician => write!(f, "technician"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "service_advisor" => Ok(Role::ServiceAdvisor),
            "technician" => Ok(Role::Technician),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

// ============================================================================
// User Model
// ============================================================================

/// User entity representing a registered workshop account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Natural key (national ID number)
    pub identifier: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: Option<String>,
    pub role: Role,
    pub is_online: bool,
    pub created_at: DateTime<Utc>,
}

/// User data for creation (password must already be hashed)
#[derive(Debug, Clone)]
pub struct NewUser {
    pub identifier: String,
    pub password_hash: String,
    pub name: Option<String>,
    pub role: Role,
}

impl NewUser {
    /// New account with the default role and the online flag cleared
    pub fn with_default_role(
        identifier: impl Into<String>,
        password_hash: impl Into<String>,
        name: Option<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            password_hash: password_hash.into(),
            name,
            role: Role::default(),
        }
    }
}

/// User without sensitive data (token payload, presence profile, API responses)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    #[serde(alias = "nik")]
    pub identifier: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub is_online: bool,
}

impl From<User> for PublicProfile {
    fn from(user: User) -> Self {
        Self {
            identifier: user.identifier,
            name: user.name,
            role: user.role,
            is_online: user.is_online,
        }
    }
}

impl From<&User> for PublicProfile {
    fn from(user: &User) -> Self {
        Self {
            identifier: user.identifier.clone(),
            name: user.name.clone(),
            role: user.role,
            is_online: user.is_online,
        }
    }
}
