//! SSO API Server
//!
//! HTTP authentication server backed by SQLite.
//!
//! Author: hephaex@gmail.com

use anyhow::Context;
use clap::Parser;
use sso_api::auth::{Argon2Hasher, AuthService, PasswordConfig, TokenIssuer};
use sso_api::{create_router, state::AppState, telemetry};
use sso_core::{AppConfig, SqliteStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "sso-api", version, about = "Multi-tenant authentication server")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "CONFIG_PATH")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = AppConfig::load(args.config).context("failed to load configuration")?;

    telemetry::init(&config.logging)?;

    tracing::info!(env = %config.env, "Starting SSO API");

    // Open storage
    ensure_parent_dir(Path::new(&config.storage_path))?;
    let store = SqliteStore::connect(&config.storage_path).await?;
    store.migrate().await?;
    let store = Arc::new(store);
    tracing::info!(path = %config.storage_path, "Storage ready");

    // Wire the authentication service
    let hasher = Argon2Hasher::new(&PasswordConfig::from(&config.password))?;
    let tokens = TokenIssuer::new(config.token_ttl());
    tracing::info!(ttl_secs = tokens.ttl().as_secs(), "Token issuer configured");
    let auth = AuthService::new(
        Arc::new(hasher),
        store.clone(),
        tokens,
        tracing::info_span!("sso", env = %config.env),
    );

    let addr = config.server.bind_address();
    let state = Arc::new(AppState::new(config, auth, store));
    let app = create_router(state.clone());

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("SSO API Server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);
    tracing::info!("OpenAPI document at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn ensure_parent_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM, flipping readiness off first
async fn shutdown_signal(state: Arc<AppState>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    state.set_ready(false);
    tracing::info!("Graceful shutdown initiated");
}
