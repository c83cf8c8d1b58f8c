//! SSO Configuration Management
//!
//! Handles configuration from a TOML file and environment variables,
//! with sensible defaults for local development.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Deployment environment (local, dev, prod)
    pub env: String,

    /// Path to the SQLite database file
    pub storage_path: String,

    /// Lifetime of issued tokens in seconds
    pub token_ttl_secs: u64,

    /// Server configuration
    pub server: ServerConfig,

    /// Password hashing cost
    pub password: PasswordSettings,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            env: "local".to_string(),
            storage_path: "./storage/sso.db".to_string(),
            token_ttl_secs: 3600, // 1 hour
            server: ServerConfig::default(),
            password: PasswordSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Resolve and load configuration.
    ///
    /// The file path comes from the argument, then `CONFIG_PATH`. Without a
    /// path the defaults are used. Environment variables override either way.
    pub fn load(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.or_else(|| std::env::var("CONFIG_PATH").ok().map(PathBuf::from));

        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        let config = config.with_env_override()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        Self::from_toml_str(&content).map_err(|message| ConfigError::ParseError { path, message })
    }

    fn from_toml_str(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Apply environment variables on top of this configuration
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        if let Ok(env) = std::env::var("SSO_ENV") {
            self.env = env;
        }
        if let Ok(path) = std::env::var("SSO_STORAGE_PATH") {
            self.storage_path = path;
        }
        if let Ok(ttl) = std::env::var("SSO_TOKEN_TTL_SECS") {
            self.token_ttl_secs = parse_env("SSO_TOKEN_TTL_SECS", ttl)?;
        }

        // Server
        if let Ok(host) = std::env::var("API_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("API_PORT") {
            self.server.port = parse_env("API_PORT", port)?;
        }
        if let Ok(timeout) = std::env::var("SSO_REQUEST_TIMEOUT_SECS") {
            self.server.request_timeout_secs = parse_env("SSO_REQUEST_TIMEOUT_SECS", timeout)?;
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(self)
    }

    /// Check values that have no usable default
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_path.trim().is_empty() {
            return Err(ConfigError::MissingRequired("storage_path".to_string()));
        }
        if self.token_ttl_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "token_ttl_secs".to_string(),
                value: "0".to_string(),
            });
        }
        if self.server.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "server.request_timeout_secs".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    /// Token lifetime as a duration
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 44044,
            request_timeout_secs: 10,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Argon2id cost parameters
///
/// Fixed for the process lifetime; every new hash uses these values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordSettings {
    /// Memory cost in KB
    pub memory_cost: u32,

    /// Iterations
    pub time_cost: u32,

    /// Lanes
    pub parallelism: u32,
}

impl Default for PasswordSettings {
    fn default() -> Self {
        Self {
            memory_cost: 65536, // 64 MB
            time_cost: 3,
            parallelism: 4,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,

    /// Include file/line in logs
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            include_location: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
