//! # Folio API Server
//!
//! ```text
//! folio-api [--config <path>]
//!
//!   load config ─► open SQLite (migrate) ─► spawn fulfillment worker
//!        │
//!        ▼
//!   axum::serve ── SIGINT / SIGTERM ──► drain worker ─► close pool
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use folio_api::fulfillment::{LogMailer, StoredNotifier};
use folio_api::{app, ApiConfig, AppState, FulfillmentWorker, JwtManager};
use folio_db::{Database, DbConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "folio_api=info,folio_db=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Folio API...");

    let config = ApiConfig::load(config_path_arg()).context("Failed to load configuration")?;
    info!(
        bind = %config.server.bind_address(),
        database = %config.database.path.display(),
        "Configuration loaded"
    );

    if let Some(parent) = config.database.path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let db = Database::new(
        DbConfig::new(&config.database.path).max_connections(config.database.max_connections),
    )
    .await
    .context("Failed to open database")?;

    let (worker, notifier, fulfillment) = FulfillmentWorker::new(
        config.fulfillment.queue_capacity,
        Arc::new(StoredNotifier::new(db.notifications())),
        Arc::new(LogMailer),
        config.fulfillment.admin_recipient.clone(),
    );
    let worker_task = tokio::spawn(worker.run());

    let jwt = JwtManager::new(&config.auth.jwt_secret, config.auth.token_lifetime_secs);
    let state = AppState::new(db.clone(), jwt, notifier);

    let listener = tokio::net::TcpListener::bind(config.server.bind_address())
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_address()))?;
    info!(addr = %config.server.bind_address(), "Listening");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    fulfillment.shutdown().await;
    if let Err(e) = worker_task.await {
        tracing::error!(error = %e, "Fulfillment worker panicked");
    }
    db.close().await;

    info!("Server shutdown complete");
    Ok(())
}

/// `--config <path>` or `-c <path>`.
fn config_path_arg() -> Option<PathBuf> {
    let args: Vec<String> = std::env::args().collect();
    args.iter()
        .position(|a| a == "--config" || a == "-c")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from)
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
