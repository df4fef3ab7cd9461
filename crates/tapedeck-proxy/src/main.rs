use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tapedeck_proxy::cli::Cli;
use tapedeck_proxy::error::ProxyError;
use tapedeck_proxy::mtls::ClientIdentity;
use tapedeck_proxy::{logging, router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let cli = Cli::parse();
    cli.validate().map_err(ProxyError::InvalidConfig)?;

    let mut client_builder = reqwest::Client::builder().timeout(Duration::from_secs(300));

    if let (Some(cert_path), Some(key_path)) = (&cli.tls_cert, &cli.tls_key) {
        tracing::info!(cert = %cert_path.display(), "loading mTLS client identity");
        let identity = ClientIdentity::load(cert_path, key_path).map_err(anyhow::Error::new)?;
        let reqwest_identity = reqwest::Identity::from_pem(&identity.pem_bundle)
            .map_err(|e| ProxyError::Tls(format!("building client identity: {e}")))?;
        client_builder = client_builder.identity(reqwest_identity);
    }

    let client = client_builder
        .build()
        .map_err(|e| ProxyError::Tls(format!("building upstream HTTP client: {e}")))?;

    let state = Arc::new(AppState::new(cli.upstream.clone(), client, cli.log_dir.clone()));
    let app = router::router(state);

    let addr = format!("{}:{}", cli.host, cli.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| ProxyError::Bind {
            addr: addr.clone(),
            source,
        })?;

    tracing::info!(%addr, upstream = %cli.upstream, "tapedeck-proxy listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("proxy server loop exited with an error")?;

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

    tracing::info!("shutdown signal received, draining in-flight streams");
}
