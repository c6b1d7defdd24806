//! apiseed server binary

use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use apiseed::api::{create_router, AppState};
use apiseed::config::{LogFormat, Settings};
use apiseed::migrations::Migrator;
use apiseed::storage::{create_storage, StorageBackend};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Manage the schema revision
    Migrate {
        #[command(subcommand)]
        action: Option<MigrateAction>,
    },
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum MigrateAction {
    /// Apply every pending migration (default)
    Upgrade,
    /// Revert migrations newer than the given version
    Downgrade { version: u32 },
    /// Show the current revision and pending migrations
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load().context("failed to load settings")?;

    init_tracing(&settings)?;

    let storage_backend = create_storage(settings.storage_config())
        .context("failed to open database storage")?;
    let storage: Arc<dyn StorageBackend> = Arc::from(storage_backend);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(settings, storage).await,
        Command::Migrate { action } => {
            migrate(storage, action.unwrap_or(MigrateAction::Upgrade)).await
        }
    }
}

async fn serve(settings: Settings, storage: Arc<dyn StorageBackend>) -> anyhow::Result<()> {
    let migrator = Migrator::new(storage.clone());
    if settings.database.auto_migrate {
        migrator
            .upgrade_head()
            .await
            .context("failed to apply migrations")?;
    } else {
        let pending = migrator.pending().await?;
        if !pending.is_empty() {
            bail!(
                "{} pending migration(s); run `apiseed migrate` or enable database.auto_migrate",
                pending.len()
            );
        }
    }

    let schema_version = migrator.current_version().await?;
    tracing::info!(
        app = %settings.app_name,
        environment = ?settings.environment,
        schema_version,
        "Starting server"
    );

    let addr = settings.bind_addr();
    let router = create_router(AppState::new(settings, storage));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    tracing::info!(%addr, "Listening for HTTP traffic");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn migrate(storage: Arc<dyn StorageBackend>, action: MigrateAction) -> anyhow::Result<()> {
    let migrator = Migrator::new(storage);

    match action {
        MigrateAction::Upgrade => {
            let applied = migrator.upgrade_head().await?;
            tracing::info!(?applied, head = migrator.head(), "Upgrade complete");
        }
        MigrateAction::Downgrade { version } => {
            let reverted = migrator.downgrade(version).await?;
            tracing::info!(?reverted, target = version, "Downgrade complete");
        }
        MigrateAction::Status => {
            let state = migrator.state().await?;
            println!("current revision: {} (head {})", state.version, migrator.head());
            for migration in migrator.migrations() {
                match state.applied.iter().find(|a| a.version == migration.version) {
                    Some(applied) => println!(
                        "  applied {:04}_{} at {}",
                        migration.version, migration.name, applied.applied_at
                    ),
                    None => println!("  pending {:04}_{}", migration.version, migration.name),
                }
            }
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "Failed to listen for SIGTERM");
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
    tracing::info!("Shutdown signal received");
}

fn init_tracing(settings: &Settings) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(settings.logging.level.clone()))
        .unwrap_or_else(|_| EnvFilter::new("apiseed=info,tower_http=info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match settings.logging.format {
        LogFormat::Json => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()?;
        }
        LogFormat::Text => {
            registry.with(tracing_subscriber::fmt::layer()).try_init()?;
        }
    }

    Ok(())
}
