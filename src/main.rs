//! Devlock API server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ request id → trace → gzip → timeout → metrics
//!                                                            │
//!                      ┌─────────────────────────────────────┼──────────────────┐
//!                      ▼                                     ▼                  ▼
//!               /, /docs, /health,              /v1 data routes          /v1/login/*
//!               /metrics                        rate limiter             encrypted cookie
//!                                               → handlers               → Steam OpenID
//!                                               → QueryExecutor
//!                                               → ClickHouse
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use devlock_api::config::load_config;
use devlock_api::observability::{init_tracing, metrics};
use devlock_api::{ClickHouseExecutor, HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "devlock-api")]
#[command(about = "Read-only API over match, salt and active-match data", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(short, long, env = "DEVLOCK_API_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref());
    let log_level = config
        .as_ref()
        .map(|c| c.observability.log_level.clone())
        .unwrap_or_else(|_| "info".to_string());
    init_tracing(&log_level);

    let config = config.inspect_err(|e| tracing::error!(error = %e, "Invalid configuration"))?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        clickhouse = %config.clickhouse.url,
        "devlock-api starting"
    );

    let executor = Arc::new(ClickHouseExecutor::new(&config.clickhouse));
    let metrics_enabled = config.observability.metrics_enabled;
    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let mut server = HttpServer::new(config, executor)?;
    if metrics_enabled {
        match metrics::install_recorder() {
            Ok(handle) => server = server.with_metrics(handle),
            Err(e) => tracing::error!(error = %e, "Failed to install metrics recorder"),
        }
    }

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(shutdown.trigger_on_signal());

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
