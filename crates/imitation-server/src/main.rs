use anyhow::{Context, Result};
use clap::Parser;
use imitation_application::Arena;
use imitation_infrastructure::{ProfileCatalog, conversation_store_from_config, load_config};
use imitation_interaction::completion_service_from_config;
use std::time::Duration;
use tokio::net::TcpListener;

mod cli;
mod logging;
mod routes;
mod socket;

const SNAPSHOT_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();

    let mut config = load_config(args.config.as_deref()).context("Failed to load configuration")?;
    args.apply_to(&mut config);
    config.validate().context("Invalid configuration")?;

    let _log_guard = logging::init(&args.log_level, config.server.log_dir.as_deref());

    let catalog = ProfileCatalog::new(config.profiles.clone());
    tracing::info!(profiles = catalog.len(), "Loaded automation profiles");
    let gateway = conversation_store_from_config(&config.storage, catalog)
        .context("Failed to open conversation store")?;
    let completion = completion_service_from_config(&config.completion)
        .context("Failed to set up completion service")?;

    let bind = config.server.bind.clone();
    let arena = Arena::new(config, gateway, completion);
    spawn_snapshot_logger(arena.clone());

    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    tracing::info!(addr = %bind, "Imitation server listening");

    axum::serve(listener, routes::router(arena.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    arena.shutdown();
    tracing::info!("Server shutdown complete");
    Ok(())
}

fn spawn_snapshot_logger(arena: Arena) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SNAPSHOT_INTERVAL);
        loop {
            ticker.tick().await;
            let snapshot = arena.snapshot().await;
            tracing::debug!(?snapshot, "Arena snapshot");
        }
    });
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Received Ctrl+C, shutting down...");
}
