//! SSO Core - Domain models, repository contract, and storage backends
//!
//! This crate defines the abstractions the authentication service depends on:
//! - User and application models
//! - Repository traits (user saver/provider, admin provider, app provider)
//! - Repository error taxonomy
//! - Configuration management
//! - SQLite and in-memory repository implementations

pub mod config;
pub mod memory;
pub mod sqlite;

pub use config::{AppConfig, ConfigError, LoggingConfig, PasswordSettings, ServerConfig};
pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Repository error types
///
/// `AlreadyExists` and `NotFound` are typed conditions produced by the
/// backend itself; callers never inspect the message of `Database`.
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Record already exists")]
    AlreadyExists,

    #[error("Record not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),
}

pub type Result<T> = std::result::Result<T, RepositoryError>;

// ============================================================================
// Domain Models
// ============================================================================

/// Registered user identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    /// Repository-assigned identifier
    pub id: i64,

    /// Email address (unique, case-sensitive as stored)
    pub email: String,

    /// Password hash bytes, never the plaintext
    #[serde(skip_serializing)]
    pub pass_hash: Vec<u8>,

    /// Administrator flag
    pub is_admin: bool,
}

/// Client application (tenant) that tokens are issued for
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Application {
    pub id: i32,
    pub name: String,

    /// Shared secret used to sign tokens for this application
    #[serde(skip_serializing)]
    pub secret: String,
}

impl Application {
    pub fn new(id: i32, name: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            secret: secret.into(),
        }
    }
}

// ============================================================================
// Repository Contract
// ============================================================================

/// Persists new users
#[async_trait]
pub trait UserSaver: Send + Sync {
    /// Insert a user and return its id.
    ///
    /// Fails with [`RepositoryError::AlreadyExists`] when the email is taken.
    async fn save_user(&self, email: &str, pass_hash: &[u8]) -> Result<i64>;
}

/// Looks users up by email
#[async_trait]
pub trait UserProvider: Send + Sync {
    /// Fails with [`RepositoryError::NotFound`] when no user has this email.
    async fn user(&self, email: &str) -> Result<User>;
}

/// Answers privilege queries
#[async_trait]
pub trait AdminProvider: Send + Sync {
    /// Fails with [`RepositoryError::NotFound`] when no user has this id.
    async fn is_admin(&self, user_id: i64) -> Result<bool>;
}

/// Looks applications up by id
#[async_trait]
pub trait AppProvider: Send + Sync {
    /// Fails with [`RepositoryError::NotFound`] when no application has this id.
    async fn app(&self, app_id: i32) -> Result<Application>;
}

/// Storage liveness, reported by the readiness probe
#[async_trait]
pub trait StorageHealth: Send + Sync {
    /// `true` when the backend answers a trivial query
    async fn ping(&self) -> bool;
}

/// Everything the authentication service needs from storage
pub trait Repository: UserSaver + UserProvider + AdminProvider + AppProvider {}

impl<T> Repository for T where T: UserSaver + UserProvider + AdminProvider + AppProvider {}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_serialization_hides_hash() {
        let user = User {
            id: 7,
            email: "a@x.com".to_string(),
            pass_hash: b"$argon2id$secret".to_vec(),
            is_admin: false,
        };

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["email"], "a@x.com");
        assert!(json.get("pass_hash").is_none());
    }

    #[test]
    fn test_application_serialization_hides_secret() {
        let app = Application::new(1, "web", "top-secret");
        let json = serde_json::to_value(&app).unwrap();
        assert_eq!(json["name"], "web");
        assert!(json.get("secret").is_none());
    }

    #[test]
    fn test_repository_error_display() {
        assert_eq!(RepositoryError::AlreadyExists.to_string(), "Record already exists");
        assert_eq!(RepositoryError::NotFound.to_string(), "Record not found");
        assert_eq!(
            RepositoryError::Database("disk I/O error".to_string()).to_string(),
            "Database error: disk I/O error"
        );
    }
}
