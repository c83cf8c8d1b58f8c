//! Authentication service layer
//!
//! Implements registration, login, and admin checks on top of three injected
//! handles: a credential hasher, a repository, and a token issuer. The
//! service is stateless per call and cheap to clone.
//!
//! Every failure is mapped to exactly one [`AuthError`] and returned at once;
//! nothing is retried. Operations are plain futures, so a caller-side timeout
//! or dropped request cancels them at the next await point.

use super::jwt::TokenIssuer;
use super::password::CredentialHasher;
use sso_core::{Repository, RepositoryError};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{error, info, warn, Instrument, Span};

/// Caller-visible outcomes of the authentication service
#[derive(Debug, Error)]
pub enum AuthError {
    /// Register: the email is already registered
    #[error("user already exists")]
    AlreadyExists,

    /// Login: unknown email or wrong password, deliberately indistinguishable
    #[error("wrong credentials")]
    WrongCredentials,

    /// IsAdmin: no user with this id
    #[error("invalid identity")]
    NotFoundIdentity,

    /// Any storage, hashing, or signing failure. The cause is logged and
    /// kept as the error source, never shown in the message.
    #[error("internal error")]
    Internal(#[source] anyhow::Error),
}

/// Password verified for unknown emails so both login failures cost the same
const DECOY_PASSWORD: &str = "decoy-password-never-matches";

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    hasher: Arc<dyn CredentialHasher>,
    repository: Arc<dyn Repository>,
    tokens: TokenIssuer,
    span: Span,
    decoy_hash: Arc<OnceCell<Vec<u8>>>,
}

impl AuthService {
    /// Create a new authentication service
    ///
    /// `span` is the logging handle every operation span is parented to.
    pub fn new(
        hasher: Arc<dyn CredentialHasher>,
        repository: Arc<dyn Repository>,
        tokens: TokenIssuer,
        span: Span,
    ) -> Self {
        Self {
            hasher,
            repository,
            tokens,
            span,
            decoy_hash: Arc::new(OnceCell::new()),
        }
    }

    /// Register a new user and return its id
    pub async fn register(&self, email: &str, password: &str) -> Result<i64, AuthError> {
        let span = tracing::info_span!(parent: &self.span, "register", email = %email);

        async move {
            info!("registering new user");

            let pass_hash = self.hash_password(password).await?;

            match self.repository.save_user(email, &pass_hash).await {
                Ok(user_id) => {
                    info!(user_id, "user registered");
                    Ok(user_id)
                }
                Err(RepositoryError::AlreadyExists) => {
                    warn!("user already exists");
                    Err(AuthError::AlreadyExists)
                }
                Err(e) => Err(internal("failed to save user", e)),
            }
        }
        .instrument(span)
        .await
    }

    /// Check credentials and issue a token scoped to `app_id`
    ///
    /// The password is verified before the application is looked up; a
    /// wrong password never touches the application table.
    pub async fn login(&self, email: &str, password: &str, app_id: i32) -> Result<String, AuthError> {
        let span = tracing::info_span!(parent: &self.span, "login", email = %email, app_id);

        async move {
            info!("attempting to login user");

            let user = match self.repository.user(email).await {
                Ok(user) => user,
                Err(RepositoryError::NotFound) => {
                    warn!("user not found");
                    self.verify_decoy(password).await?;
                    return Err(AuthError::WrongCredentials);
                }
                Err(e) => return Err(internal("failed to get user", e)),
            };

            if !self.verify_password(&user.pass_hash, password).await? {
                warn!(user_id = user.id, "invalid credentials");
                return Err(AuthError::WrongCredentials);
            }

            let app = match self.repository.app(app_id).await {
                Ok(app) => app,
                Err(RepositoryError::NotFound) => {
                    warn!("application not found");
                    return Err(AuthError::Internal(anyhow::anyhow!(
                        "application {app_id} not found"
                    )));
                }
                Err(e) => return Err(internal("failed to get application", e)),
            };

            let token = self
                .tokens
                .issue(&user, &app)
                .map_err(|e| internal("failed to generate token", e))?;

            info!(user_id = user.id, "user logged in successfully");
            Ok(token)
        }
        .instrument(span)
        .await
    }

    /// Report whether `user_id` is an administrator
    pub async fn is_admin(&self, user_id: i64) -> Result<bool, AuthError> {
        let span = tracing::info_span!(parent: &self.span, "is_admin", user_id);

        async move {
            info!("checking if user is admin");

            match self.repository.is_admin(user_id).await {
                Ok(is_admin) => {
                    info!(is_admin, "checked if user is admin");
                    Ok(is_admin)
                }
                Err(RepositoryError::NotFound) => {
                    warn!("user not found");
                    Err(AuthError::NotFoundIdentity)
                }
                Err(e) => Err(internal("failed to check admin flag", e)),
            }
        }
        .instrument(span)
        .await
    }

    async fn hash_password(&self, password: &str) -> Result<Vec<u8>, AuthError> {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_owned();

        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| internal("password hashing task failed", e))?
            .map_err(|e| internal("failed to hash password", e))
    }

    /// Run one verification against a fixed hash, hashed once per service
    async fn verify_decoy(&self, password: &str) -> Result<(), AuthError> {
        let decoy = self
            .decoy_hash
            .get_or_try_init(|| self.hash_password(DECOY_PASSWORD))
            .await?;
        self.verify_password(decoy, password).await?;
        Ok(())
    }

    async fn verify_password(&self, pass_hash: &[u8], password: &str) -> Result<bool, AuthError> {
        let hasher = Arc::clone(&self.hasher);
        let pass_hash = pass_hash.to_vec();
        let password = password.to_owned();

        tokio::task::spawn_blocking(move || hasher.verify(&pass_hash, &password))
            .await
            .map_err(|e| internal("password verification task failed", e))?
            .map_err(|e| internal("failed to verify password", e))
    }
}

fn internal<E>(context: &'static str, err: E) -> AuthError
where
    E: Into<anyhow::Error>,
{
    let err = err.into();
    error!(error = ?err, "{context}");
    AuthError::Internal(err.context(context))
}
