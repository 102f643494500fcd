//! tokenlease development host: serves the engine's path surface over HTTP
//! on top of in-memory storage and the stub external client.

mod config;
mod error;
mod lease;
mod routes;

use std::sync::Arc;

use clap::Parser;
use tokenlease_engine::{Backend, StubClientFactory};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::routes::AppState;

/// tokenlease development host.
#[derive(Parser, Debug)]
#[command(name = "tokenlease-server", about = "Dynamic token secrets backend (development host)")]
struct Args {
    /// Listen port. Overrides `TOKENLEASE_PORT`.
    #[arg(long)]
    port: Option<u16>,

    /// Log filter, e.g. `tokenlease_engine=debug`. Overrides `RUST_LOG`.
    #[arg(long)]
    log: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = match &args.log {
        Some(directives) => tracing_subscriber::EnvFilter::try_new(directives)?,
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = ServerConfig::from_env();
    if let Some(port) = args.port {
        config.listen_port = port;
    }
    info!(
        default_ttl = config.lease_policy.default_ttl.as_secs(),
        max_ttl = config.lease_policy.max_ttl.as_secs(),
        "lease policy loaded"
    );

    let listen_port = config.listen_port;
    let shutdown = CancellationToken::new();
    let backend = Backend::new(Arc::new(StubClientFactory));
    let state = Arc::new(AppState::new(backend, config, shutdown.clone()));
    let app = routes::router(state);

    let addr = format!("0.0.0.0:{listen_port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(address = %addr, "tokenlease listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    info!("tokenlease stopped");
    Ok(())
}

/// Resolve on Ctrl-C, cancelling in-flight engine calls first.
async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
    shutdown.cancel();
}
