//! In-memory repository
//!
//! Used by tests and local development. Ids are assigned sequentially from 1,
//! matching what the SQLite store produces on a fresh database.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::{
    AdminProvider, AppProvider, Application, RepositoryError, Result, StorageHealth, User,
    UserProvider, UserSaver,
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    by_email: HashMap<String, usize>,
    apps: HashMap<i32, Application>,
}

/// In-memory store guarded by a single async lock
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style application seeding
    pub fn with_app(mut self, app: Application) -> Self {
        self.tables.get_mut().apps.insert(app.id, app);
        self
    }

    /// Provision an application, replacing any existing one with the same id
    pub async fn insert_app(&self, app: Application) {
        self.tables.write().await.apps.insert(app.id, app);
    }

    /// Set a user's administrator flag
    pub async fn set_admin(&self, user_id: i64, is_admin: bool) -> Result<()> {
        let mut tables = self.tables.write().await;
        let user = index_of(user_id)
            .and_then(|idx| tables.users.get_mut(idx))
            .ok_or(RepositoryError::NotFound)?;
        user.is_admin = is_admin;
        Ok(())
    }

    /// Number of stored users
    pub async fn user_count(&self) -> usize {
        self.tables.read().await.users.len()
    }
}

fn index_of(user_id: i64) -> Option<usize> {
    usize::try_from(user_id).ok()?.checked_sub(1)
}

#[async_trait]
impl UserSaver for InMemoryStore {
    async fn save_user(&self, email: &str, pass_hash: &[u8]) -> Result<i64> {
        let mut tables = self.tables.write().await;
        if tables.by_email.contains_key(email) {
            return Err(RepositoryError::AlreadyExists);
        }

        let id = tables.users.len() as i64 + 1;
        tables.users.push(User {
            id,
            email: email.to_string(),
            pass_hash: pass_hash.to_vec(),
            is_admin: false,
        });
        let idx = tables.users.len() - 1;
        tables.by_email.insert(email.to_string(), idx);

        Ok(id)
    }
}

#[async_trait]
impl UserProvider for InMemoryStore {
    async fn user(&self, email: &str) -> Result<User> {
        let tables = self.tables.read().await;
        tables
            .by_email
            .get(email)
            .and_then(|&idx| tables.users.get(idx))
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }
}

#[async_trait]
impl AdminProvider for InMemoryStore {
    async fn is_admin(&self, user_id: i64) -> Result<bool> {
        let tables = self.tables.read().await;
        index_of(user_id)
            .and_then(|idx| tables.users.get(idx))
            .map(|user| user.is_admin)
            .ok_or(RepositoryError::NotFound)
    }
}

#[async_trait]
impl AppProvider for InMemoryStore {
    async fn app(&self, app_id: i32) -> Result<Application> {
        self.tables
            .read()
            .await
            .apps
            .get(&app_id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }
}

#[async_trait]
impl StorageHealth for InMemoryStore {
    async fn ping(&self) -> bool {
        true
    }
}
