use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tapedeck_core::{Index, ScenarioSet};
use tapedeck_mock::app_state::{AppState, ReplayConfig, Routing};
use tapedeck_mock::cli::Cli;
use tapedeck_mock::error::MockError;
use tapedeck_mock::logging404::Logger404;
use tapedeck_mock::{handler, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let cli = Cli::parse();
    cli.validate().map_err(MockError::InvalidConfig)?;

    let routing = if let Some(config_path) = &cli.mock_config {
        tracing::info!(path = %config_path.display(), "loading scenario config");
        let scenarios = ScenarioSet::load(config_path)?;
        tracing::info!(count = scenarios.len(), "scenario mode active");
        Routing::Scenario(scenarios)
    } else {
        tracing::info!(dir = %cli.mock_dir.display(), "loading mock index");
        let index = Index::load(&cli.mock_dir)?;
        tracing::info!(count = index.len(), "mock index loaded");
        Routing::Index(index)
    };

    let logger404 = if cli.log_dir.is_empty() {
        None
    } else {
        Some(Logger404::new(PathBuf::from(&cli.log_dir)))
    };

    let replay = ReplayConfig {
        enabled: cli.replay_timing,
        jitter: cli.jitter,
    };

    let state = Arc::new(AppState::new(routing, replay, logger404));
    let app = handler::router(state);

    let addr = format!("{}:{}", cli.host, cli.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| MockError::Bind {
            addr: addr.clone(),
            source,
        })?;

    tracing::info!(%addr, "tapedeck-mock listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("mock server loop exited with an error")?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received, draining in-flight requests");
}
