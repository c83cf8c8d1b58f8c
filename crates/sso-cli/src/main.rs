//! SSO CLI - operator commands against the SQLite store
//!
//! Usage:
//!   sso migrate --storage <path>
//!   sso apps add --storage <path> --name <name> --secret <secret>
//!   sso apps list --storage <path>

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use sso_core::{RepositoryError, SqliteStore};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sso")]
#[command(about = "SSO storage administration")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct StorageArgs {
    /// Path to the SQLite database file
    #[arg(long, env = "SSO_STORAGE_PATH")]
    storage: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database if missing and apply migrations
    Migrate {
        #[command(flatten)]
        storage: StorageArgs,
    },
    /// Manage client applications
    Apps {
        #[command(subcommand)]
        action: AppsAction,
    },
}

#[derive(Subcommand)]
enum AppsAction {
    /// Provision an application and print its id
    Add {
        #[command(flatten)]
        storage: StorageArgs,
        /// Unique application name
        #[arg(long)]
        name: String,
        /// Token signing secret
        #[arg(long)]
        secret: String,
    },
    /// List applications (secrets are not shown)
    List {
        #[command(flatten)]
        storage: StorageArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sso_cli=info,sso_core=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Migrate { storage } => {
            let store = open(&storage).await?;
            store.migrate().await?;
            println!("Migrations applied to {}", storage.storage.display());
        }
        Commands::Apps { action } => match action {
            AppsAction::Add {
                storage,
                name,
                secret,
            } => {
                if name.is_empty() || secret.is_empty() {
                    anyhow::bail!("name and secret must not be empty");
                }
                let store = open(&storage).await?;
                store.migrate().await?;
                let app = match store.create_app(&name, &secret).await {
                    Err(RepositoryError::AlreadyExists) => {
                        anyhow::bail!("an application with this name or secret already exists")
                    }
                    other => other?,
                };
                tracing::info!(app_id = app.id, name = %app.name, "application provisioned");
                println!("{}", app.id);
            }
            AppsAction::List { storage } => {
                let store = open(&storage).await?;
                let apps = store.list_apps().await?;
                if apps.is_empty() {
                    println!("No applications");
                }
                for app in apps {
                    println!("{}\t{}", app.id, app.name);
                }
            }
        },
    }

    Ok(())
}

async fn open(args: &StorageArgs) -> anyhow::Result<SqliteStore> {
    if let Some(parent) = args.storage.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    SqliteStore::connect(&args.storage)
        .await
        .with_context(|| format!("failed to open {}", args.storage.display()))
}
