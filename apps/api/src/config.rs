//! # API Configuration
//!
//! Configuration management for the HTTP service.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     FOLIO_PORT=9000                                                    │
//! │     FOLIO_JWT_SECRET=...                                               │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     --config <path>, or                                                │
//! │     ~/.config/folio/api.toml (Linux)                                   │
//! │     ~/Library/Application Support/com.folio.folio/api.toml (macOS)     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [server]
//! bind_addr = "0.0.0.0"
//! port = 8080
//!
//! [database]
//! path = "/var/lib/folio/folio.db"
//! max_connections = 5
//!
//! [auth]
//! jwt_secret = "at-least-sixteen-characters"
//! token_lifetime_secs = 3600
//!
//! [fulfillment]
//! queue_capacity = 256
//! admin_recipient = "admin"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Development-only signing secret. `validate()` warns when it is in use.
pub const DEV_JWT_SECRET: &str = "folio-dev-secret-change-in-production";

const MIN_JWT_SECRET_LEN: usize = 16;

// =============================================================================
// Errors
// =============================================================================

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            bind_addr: default_bind_addr(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    /// Returns the full bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Defaults to the platform data directory.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> PathBuf {
    directories::ProjectDirs::from("com", "folio", "folio")
        .map(|dirs| dirs.data_dir().join("folio.db"))
        .unwrap_or_else(|| PathBuf::from("./folio.db"))
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    /// HS256 signing secret shared with whoever issues buyer/admin tokens.
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,

    /// Lifetime of tokens issued by this service's helpers.
    #[serde(default = "default_token_lifetime")]
    pub token_lifetime_secs: i64,
}

fn default_jwt_secret() -> String {
    DEV_JWT_SECRET.to_string()
}

fn default_token_lifetime() -> i64 {
    3600
}

impl Default for AuthSettings {
    fn default() -> Self {
        AuthSettings {
            jwt_secret: default_jwt_secret(),
            token_lifetime_secs: default_token_lifetime(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FulfillmentSettings {
    /// Bound of the notifier queue. Events beyond it are dropped.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Recipient id for admin "new order" notifications.
    #[serde(default = "default_admin_recipient")]
    pub admin_recipient: String,
}

fn default_queue_capacity() -> usize {
    256
}

fn default_admin_recipient() -> String {
    "admin".to_string()
}

impl Default for FulfillmentSettings {
    fn default() -> Self {
        FulfillmentSettings {
            queue_capacity: default_queue_capacity(),
            admin_recipient: default_admin_recipient(),
        }
    }
}

// =============================================================================
// API Configuration
// =============================================================================

/// Complete service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub auth: AuthSettings,

    #[serde(default)]
    pub fulfillment: FulfillmentSettings,
}

impl ApiConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`config_path`, else the platform config dir)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::Invalid(format!(
                "auth.jwt_secret must be at least {} characters",
                MIN_JWT_SECRET_LEN
            )));
        }
        if self.auth.jwt_secret == DEV_JWT_SECRET {
            warn!("Using the development JWT secret; set FOLIO_JWT_SECRET in production");
        }
        if self.auth.token_lifetime_secs <= 0 {
            return Err(ConfigError::Invalid(
                "auth.token_lifetime_secs must be greater than 0".into(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }
        if self.fulfillment.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "fulfillment.queue_capacity must be greater than 0".into(),
            ));
        }
        if self.fulfillment.admin_recipient.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "fulfillment.admin_recipient must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Applies `FOLIO_*` overrides read through `var`.
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(addr) = var("FOLIO_BIND_ADDR") {
            self.server.bind_addr = addr;
        }

        if let Some(port) = var("FOLIO_PORT") {
            debug!(port = %port, "Overriding port from environment");
            self.server.port = parse_override("FOLIO_PORT", &port)?;
        }

        if let Some(path) = var("FOLIO_DATABASE_PATH") {
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = var("FOLIO_DB_MAX_CONNECTIONS") {
            self.database.max_connections = parse_override("FOLIO_DB_MAX_CONNECTIONS", &max)?;
        }

        if let Some(secret) = var("FOLIO_JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }

        if let Some(capacity) = var("FOLIO_QUEUE_CAPACITY") {
            self.fulfillment.queue_capacity = parse_override("FOLIO_QUEUE_CAPACITY", &capacity)?;
        }

        if let Some(recipient) = var("FOLIO_ADMIN_RECIPIENT") {
            self.fulfillment.admin_recipient = recipient;
        }

        Ok(())
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "folio", "folio")
            .map(|dirs| dirs.config_dir().join("api.toml"))
    }
}

fn parse_override<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.fulfillment.queue_capacity, 256);
        assert_eq!(config.fulfillment.admin_recipient, "admin");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_sections() {
        let config: ApiConfig = toml::from_str(
            r#"
            [server]
            port = 9001

            [database]
            path = "/tmp/folio-test.db"

            [fulfillment]
            queue_capacity = 8
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9001);
        assert_eq!(config.server.bind_addr, "0.0.0.0");
        assert_eq!(config.database.path, PathBuf::from("/tmp/folio-test.db"));
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.fulfillment.queue_capacity, 8);
    }

    #[test]
    fn test_env_overrides() {
        let vars = env(&[
            ("FOLIO_PORT", "9100"),
            ("FOLIO_JWT_SECRET", "an-override-secret-value"),
            ("FOLIO_ADMIN_RECIPIENT", "ops"),
        ]);
        let mut config = ApiConfig::default();
        config.apply_overrides(|k| vars.get(k).cloned()).unwrap();

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.auth.jwt_secret, "an-override-secret-value");
        assert_eq!(config.fulfillment.admin_recipient, "ops");
        assert_eq!(config.server.bind_address(), "0.0.0.0:9100");
    }

    #[test]
    fn test_bad_env_value_is_reported() {
        let vars = env(&[("FOLIO_QUEUE_CAPACITY", "lots")]);
        let mut config = ApiConfig::default();
        let err = config.apply_overrides(|k| vars.get(k).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "FOLIO_QUEUE_CAPACITY"));
    }

    #[test]
    fn test_validation() {
        let mut config = ApiConfig::default();
        config.auth.jwt_secret = "short".to_string();
        assert!(config.validate().is_err());

        let mut config = ApiConfig::default();
        config.fulfillment.queue_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_serialization() {
        let toml_str = toml::to_string_pretty(&ApiConfig::default()).unwrap();
        assert!(toml_str.contains("[server]"));
        assert!(toml_str.contains("[fulfillment]"));
    }
}
