//! Telemetry service bootstrap.
//!
//! Runs a gRPC server (health + reflection) and an HTTP server side by side,
//! supervises them, and shuts both down within `SERVER_SHUTDOWN_TIMEOUT` on
//! SIGTERM/Ctrl+C or the first fatal server error.
//!
//! ```text
//!   ┌──────────────┐     ┌──────────────┐
//!   │ gRPC :PORT   │     │ HTTP         │
//!   │ health, refl │     │ :HTTP_PORT   │
//!   └──────┬───────┘     └──────┬───────┘
//!          │  bind/serve errors │
//!          └────────┬───────────┘
//!                   ▼
//!            ErrorSink ──▶ supervise() ◀── SIGTERM / Ctrl+C
//!                              │
//!                              ▼
//!              shutdown(gRPC) ∥ shutdown(HTTP)
//! ```

use std::path::PathBuf;

use axum::routing::get;
use clap::Parser;

use telemetry_bootstrap::config::{load_config, load_env_config, ProcessEnv};
use telemetry_bootstrap::grpc::{health_service, serve_grpc};
use telemetry_bootstrap::http::{serve_http, HttpRoutes};
use telemetry_bootstrap::lifecycle::{
    error_channel, errors::DEFAULT_ERROR_CAPACITY, shutdown, supervise, wait_for_termination, Exit,
};
use telemetry_bootstrap::observability::{init_logging, init_metrics};

#[derive(Parser)]
#[command(name = "telemetry-bootstrap")]
#[command(about = "Run the bootstrapped gRPC and HTTP servers", long_about = None)]
struct Cli {
    /// Optional TOML config file; environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path, &ProcessEnv)?,
        None => load_env_config(&ProcessEnv)?,
    };

    init_logging(&config.logging)?;
    tracing::info!("telemetry-bootstrap v{} starting", env!("CARGO_PKG_VERSION"));

    if config.metrics.enabled {
        match config.metrics.address.parse() {
            Ok(addr) => init_metrics(addr)?,
            Err(e) => tracing::error!(
                metrics_address = %config.metrics.address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let (errors, mut error_rx) = error_channel(DEFAULT_ERROR_CAPACITY);

    let (_health_reporter, health) = health_service();
    let grpc = serve_grpc(&errors, &[&health], &config.grpc).await;

    let routes = HttpRoutes::new().route("/healthz", get(|| async { "ok" }))?;
    let http = serve_http(&errors, routes, &config.http).await;

    let exit = supervise(&mut error_rx, wait_for_termination()).await;

    tokio::join!(shutdown(grpc.as_ref()), shutdown(http.as_ref()));

    match exit {
        Exit::Signal => {
            tracing::info!("Shutdown complete");
            Ok(())
        }
        Exit::ServerFailed(e) => {
            tracing::error!(error = %e, "Exiting after server failure");
            std::process::exit(1);
        }
    }
}
