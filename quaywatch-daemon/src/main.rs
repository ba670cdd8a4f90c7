//! quaywatch-daemon entry point.
//!
//! Wiring order matters: every configured target is registered (watcher
//! build) before the status endpoint binds its port, so a query can never
//! observe a configured target as unknown; on shutdown, every monitor task
//! acknowledges cancellation before the process exits.

mod cli;
mod logging;
mod metrics_server;
mod server;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;

use quaywatch_core::config::QuaywatchConfig;
use quaywatch_core::lifecycle::Lifecycle;
use quaywatch_watcher::{BollardDockerClient, Publisher, WatcherBuilder};

use crate::cli::DaemonCli;
use crate::server::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    let mut config = QuaywatchConfig::load(&cli.config)
        .await
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;

    // CLI overrides take precedence over file and env values.
    if let Some(level) = cli.log_level {
        config.general.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.general.log_format = format;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    config.validate().context("configuration invalid")?;

    if cli.validate {
        println!(
            "configuration OK: {} target(s) defined in {}",
            config.targets.len(),
            cli.config.display()
        );
        return Ok(());
    }

    logging::init_tracing(&config.general)?;
    tracing::info!(
        config = %cli.config.display(),
        targets = config.targets.len(),
        "quaywatch-daemon starting"
    );

    if config.metrics.enabled {
        metrics_server::install_metrics_recorder(&config.metrics)?;
    }

    let docker = Arc::new(
        BollardDockerClient::connect_with_socket(&config.watch.docker_socket)
            .map_err(|e| anyhow::anyhow!("failed to create docker client: {e}"))?,
    );

    let publisher = Arc::new(Publisher::new());
    let cancel = CancellationToken::new();

    // Building the watcher compiles every pattern set and registers every
    // target as pending; a bad configuration aborts startup here.
    let mut watcher = WatcherBuilder::new()
        .docker_client(Arc::clone(&docker))
        .publisher(Arc::clone(&publisher))
        .cancel_token(cancel.clone())
        .watch_config(config.watch.clone())
        .targets(config.targets.clone())
        .build()
        .await
        .map_err(|e| anyhow::anyhow!("failed to build watcher: {e}"))?;

    watcher
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("failed to start watcher: {e}"))?;
    tracing::info!("monitors started");

    let state = AppState { publisher, docker };
    let app = server::router(state);

    let addr = format!("{}:{}", config.server.bind_addr, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind status endpoint on {addr}"))?;
    tracing::info!(listen_addr = addr.as_str(), "status endpoint listening");

    let shutdown = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            tracing::info!("shutdown signal received");
            shutdown.cancel();
        })
        .await
        .context("status endpoint failed")?;

    // Wait for every monitor to acknowledge cancellation before exiting.
    watcher
        .stop()
        .await
        .map_err(|e| anyhow::anyhow!("failed to stop watcher: {e}"))?;
    tracing::info!("quaywatch-daemon shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
