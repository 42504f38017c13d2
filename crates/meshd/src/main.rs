//! meshd — Meshwork demo host binary.
//!
//! Assembles a single process out of the Meshwork pieces:
//! - Shared context (properties + capability registry)
//! - Axum HTTP gateway, published as the HTTP-serving capability
//! - Hystrix metrics stream provider with the stub ping stream
//!
//! # Usage
//!
//! ```text
//! meshd --port 8181
//! curl http://127.0.0.1:8181/hystrix.stream
//! ```

use std::sync::Arc;

use clap::Parser;
use tokio::sync::watch;
use tracing::info;

use meshd::{HttpGateway, PingStream};
use meshwork_core::{Context, Provider};
use meshwork_http::{HTTP_SERVER_ADDRESS, HTTP_SERVER_PORT, HttpServer};
use meshwork_hystrix::{
    HYSTRIX_METRICS_ENABLED, HYSTRIX_METRICS_PATH, HystrixMetricsProvider,
};

#[derive(Parser)]
#[command(name = "meshd", about = "Meshwork demo host")]
struct Cli {
    /// Port to listen on.
    #[arg(long, default_value = "8181")]
    port: u16,

    /// Mount path for the metrics stream.
    #[arg(long, default_value = "hystrix.stream")]
    metrics_path: String,

    /// Start without the metrics stream endpoint.
    #[arg(long)]
    disable_metrics: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,meshd=debug,meshwork=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    info!("meshd starting");

    // ── Shared context ─────────────────────────────────────────

    let context = Context::new();
    context.set_property(HYSTRIX_METRICS_ENABLED, (!cli.disable_metrics).to_string());
    context.set_property(HYSTRIX_METRICS_PATH, cli.metrics_path);

    // ── HTTP gateway capability ────────────────────────────────

    let gateway = HttpGateway::new();
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", cli.port)).await?;
    let addr = listener.local_addr()?;

    context.set_property(HTTP_SERVER_ADDRESS, addr.ip().to_string());
    context.set_property(HTTP_SERVER_PORT, addr.port().to_string());
    context.register_capability::<Arc<dyn HttpServer>>(Arc::new(gateway.clone()));
    info!(%addr, "http gateway listening");

    // ── Metrics stream provider ────────────────────────────────

    let provider = HystrixMetricsProvider::new(Arc::new(PingStream));
    provider.initialize(&context)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let provider_handle = tokio::spawn({
        let context = context.clone();
        async move { provider.run(context, shutdown_rx).await }
    });

    // ── Serve until Ctrl-C ─────────────────────────────────────

    let server = axum::serve(listener, gateway.router()).with_graceful_shutdown(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    server.await?;

    let _ = provider_handle.await;

    info!("meshd stopped");
    Ok(())
}
