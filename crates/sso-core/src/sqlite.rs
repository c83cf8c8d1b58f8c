//! SQLite repository
//!
//! Implements the repository contract on top of SQLx and a SQLite file.
//! Uniqueness is enforced by the schema; a violation is surfaced as
//! [`RepositoryError::AlreadyExists`] from the driver's typed error kind.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::path::Path;

use crate::{
    AdminProvider, AppProvider, Application, RepositoryError, Result, StorageHealth, User,
    UserProvider, UserSaver,
};

/// SQLite-backed store
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database file at `path`
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| RepositoryError::Database(format!("SQLite connection failed: {e}")))?;

        tracing::debug!(path = %path.as_ref().display(), "SQLite pool opened");
        Ok(Self { pool })
    }

    /// Get the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Apply the embedded schema migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(format!("Migration failed: {e}")))?;

        tracing::info!("Database migrations applied");
        Ok(())
    }

    /// Provision an application. Operator use only; the auth service never
    /// creates applications.
    pub async fn create_app(&self, name: &str, secret: &str) -> Result<Application> {
        let result = sqlx::query("INSERT INTO apps (name, secret) VALUES (?, ?)")
            .bind(name)
            .bind(secret)
            .execute(&self.pool)
            .await
            .map_err(map_write_error)?;

        let id = i32::try_from(result.last_insert_rowid()).map_err(|_| {
            RepositoryError::Database(format!(
                "Application id out of range: {}",
                result.last_insert_rowid()
            ))
        })?;

        Ok(Application::new(id, name, secret))
    }

    /// List provisioned applications ordered by id
    pub async fn list_apps(&self) -> Result<Vec<Application>> {
        let rows = sqlx::query_as::<_, AppRow>("SELECT id, name, secret FROM apps ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(map_read_error)?;

        Ok(rows.into_iter().map(Application::from).collect())
    }
}

/// User row from database
#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    email: String,
    pass_hash: Vec<u8>,
    is_admin: bool,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            pass_hash: row.pass_hash,
            is_admin: row.is_admin,
        }
    }
}

/// Application row from database
#[derive(Debug, FromRow)]
struct AppRow {
    id: i32,
    name: String,
    secret: String,
}

impl From<AppRow> for Application {
    fn from(row: AppRow) -> Self {
        Application {
            id: row.id,
            name: row.name,
            secret: row.secret,
        }
    }
}

fn map_write_error(err: sqlx::Error) -> RepositoryError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => RepositoryError::AlreadyExists,
        _ => RepositoryError::Database(err.to_string()),
    }
}

fn map_read_error(err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::RowNotFound => RepositoryError::NotFound,
        other => RepositoryError::Database(other.to_string()),
    }
}

#[async_trait]
impl UserSaver for SqliteStore {
    async fn save_user(&self, email: &str, pass_hash: &[u8]) -> Result<i64> {
        let result = sqlx::query("INSERT INTO users (email, pass_hash) VALUES (?, ?)")
            .bind(email)
            .bind(pass_hash)
            .execute(&self.pool)
            .await
            .map_err(map_write_error)?;

        Ok(result.last_insert_rowid())
    }
}

#[async_trait]
impl UserProvider for SqliteStore {
    async fn user(&self, email: &str) -> Result<User> {
        sqlx::query_as::<_, UserRow>(
            "SELECT id, email, pass_hash, is_admin FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map(User::from)
        .map_err(map_read_error)
    }
}

#[async_trait]
impl AdminProvider for SqliteStore {
    async fn is_admin(&self, user_id: i64) -> Result<bool> {
        sqlx::query_scalar::<_, bool>("SELECT is_admin FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_read_error)
    }
}

#[async_trait]
impl AppProvider for SqliteStore {
    async fn app(&self, app_id: i32) -> Result<Application> {
        sqlx::query_as::<_, AppRow>("SELECT id, name, secret FROM apps WHERE id = ?")
            .bind(app_id)
            .fetch_one(&self.pool)
            .await
            .map(Application::from)
            .map_err(map_read_error)
    }
}

#[async_trait]
impl StorageHealth for SqliteStore {
    async fn ping(&self) -> bool {
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "SQLite ping failed");
                false
            }
        }
    }
}
