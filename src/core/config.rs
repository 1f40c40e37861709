//! Application configuration from environment variables.
//!
//! Load configuration using `Config::from_env()` after calling `dotenvy::dotenv()`.

use std::time::Duration;

use crate::core::auth::jwt::{JwtConfig, JwtError};
use crate::core::auth::password::DEFAULT_BCRYPT_COST;
use crate::core::db::pool::{DEFAULT_ACQUIRE_TIMEOUT, DEFAULT_MAX_CONNECTIONS, DbConfig};

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5000;

/// Default bind address
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default origin of the single-page client
pub const DEFAULT_CLIENT_BASE_URL: &str = "http://127.0.0.1:5173";

/// Origin of the client's production preview build
pub const DEFAULT_EXTRA_ORIGINS: &str = "http://127.0.0.1:4173";

/// Signing secret used by debug builds when `JWT_SECRET` is unset
const DEV_JWT_SECRET: &str = "bengkel-development-secret-do-not-use-in-production";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },

    #[error(transparent)]
    Jwt(#[from] JwtError),
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL settings, present when `DATABASE_URL` is set; without it
    /// accounts live in memory
    pub database: Option<DbConfig>,

    /// Token signing configuration
    pub jwt: JwtConfig,

    /// Port the HTTP server listens on
    pub port: u16,

    /// Address the HTTP server binds to
    pub host: String,

    /// Origin allowed by CORS (with credentials)
    pub client_base_url: String,

    /// Further allowed origins, from comma-separated `CORS_EXTRA_ORIGINS`
    pub extra_origins: Vec<String>,

    /// bcrypt cost factor
    pub bcrypt_cost: u32,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Call `dotenvy::dotenv()` before this to load from `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let jwt = match JwtConfig::from_lookup(&lookup) {
            Err(JwtError::MissingSecret) if cfg!(debug_assertions) => {
                tracing::warn!("JWT_SECRET not set, signing tokens with the development secret");
                JwtConfig::from_lookup(|key| match key {
                    "JWT_SECRET" => Some(DEV_JWT_SECRET.to_string()),
                    _ => lookup(key),
                })?
            }
            other => other?,
        };

        let database = match lookup("DATABASE_URL").filter(|url| !url.is_empty()) {
            Some(url) => Some(DbConfig {
                url,
                max_connections: parse_or(
                    "DATABASE_MAX_CONNECTIONS",
                    &lookup,
                    DEFAULT_MAX_CONNECTIONS,
                )?,
                acquire_timeout: Duration::from_secs(parse_or(
                    "DATABASE_ACQUIRE_TIMEOUT_SECS",
                    &lookup,
                    DEFAULT_ACQUIRE_TIMEOUT.as_secs(),
                )?),
            }),
            None => None,
        };

        let extra_origins = lookup("CORS_EXTRA_ORIGINS")
            .unwrap_or_else(|| DEFAULT_EXTRA_ORIGINS.to_string())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(String::from)
            .collect();

        Ok(Self {
            database,
            jwt,
            port: parse_or("PORT", &lookup, DEFAULT_PORT)?,
            host: lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            client_base_url: lookup("CLIENT_BASE_URL")
                .unwrap_or_else(|| DEFAULT_CLIENT_BASE_URL.to_string()),
            extra_origins,
            bcrypt_cost: parse_or("BCRYPT_COST", &lookup, DEFAULT_BCRYPT_COST)?,
        })
    }

    /// Check if database is configured
    pub fn has_database(&self) -> bool {
        self.database.is_some()
    }

    /// Every origin CORS accepts, the client first
    pub fn allowed_origins(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.client_base_url.as_str())
            .chain(self.extra_origins.iter().map(String::as_str))
    }

    /// `host:port` to bind the listener to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: std::str::FromStr>(
    var: &'static str,
    lookup: &impl Fn(&str) -> Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var, value }),
    }
}
