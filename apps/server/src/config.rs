//! Server configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.
//! Business settings that staff can change at runtime (tax rate, business
//! profile) live in the `settings` table instead.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP port
    pub port: u16,

    /// SQLite database file
    pub database_path: String,

    /// Pool size
    pub db_max_connections: u32,

    /// Redis connection string. Password reset is disabled without it.
    pub redis_url: Option<String>,

    /// HS256 secret for staff and customer tokens
    pub jwt_secret: String,

    /// Staff token lifetime in seconds
    pub staff_token_lifetime_secs: i64,

    /// Customer token lifetime in seconds
    pub customer_token_lifetime_secs: i64,

    /// Bound on every call to an external collaborator (gateway, notifier, Redis)
    pub io_timeout: Duration,

    /// Bound on a whole HTTP request
    pub request_timeout: Duration,

    /// How long a password-reset code stays valid
    pub reset_code_ttl_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: 3001,
            database_path: "kleen.db".to_string(),
            db_max_connections: 5,
            redis_url: None,
            // In production, this MUST be set via environment variable
            jwt_secret: "kleen-dev-secret-change-in-production".to_string(),
            staff_token_lifetime_secs: 86_400,       // 24 hours
            customer_token_lifetime_secs: 2_592_000, // 30 days
            io_timeout: Duration::from_millis(10_000),
            request_timeout: Duration::from_millis(30_000),
            reset_code_ttl_secs: 900, // 15 minutes
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = ServerConfig::default();

        let config = ServerConfig {
            port: parse_var("PORT", defaults.port)?,
            database_path: env::var("DATABASE_PATH").unwrap_or(defaults.database_path),
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", defaults.db_max_connections)?,
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.trim().is_empty()),
            jwt_secret: env::var("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            staff_token_lifetime_secs: parse_var(
                "STAFF_TOKEN_LIFETIME_SECS",
                defaults.staff_token_lifetime_secs,
            )?,
            customer_token_lifetime_secs: parse_var(
                "CUSTOMER_TOKEN_LIFETIME_SECS",
                defaults.customer_token_lifetime_secs,
            )?,
            io_timeout: Duration::from_millis(parse_var("IO_TIMEOUT_MS", 10_000u64)?),
            request_timeout: Duration::from_millis(parse_var("REQUEST_TIMEOUT_MS", 30_000u64)?),
            reset_code_ttl_secs: parse_var("RESET_CODE_TTL_SECS", defaults.reset_code_ttl_secs)?,
        };

        if config.jwt_secret.len() < 16 {
            return Err(ConfigError::InvalidValue("JWT_SECRET".to_string()));
        }
        if config.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()));
        }

        Ok(config)
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name.to_string())),
        Err(_) => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 3001);
        assert_eq!(config.staff_token_lifetime_secs, 24 * 3600);
        assert_eq!(config.customer_token_lifetime_secs, 30 * 24 * 3600);
        assert!(config.redis_url.is_none());
    }

    #[test]
    fn test_parse_var_falls_back_when_unset() {
        let value: u16 = parse_var("KLEEN_TEST_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }
}
