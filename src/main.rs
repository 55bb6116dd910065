//! Correlation broker service.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │                    BROKER                    │
//!   POST /client/request │  ┌────────────┐   put   ┌──────────────┐     │
//!  ──────────────────────┼─▶│ dispatcher │────────▶│ record store │     │
//!   ◀── 202 + key ───────┼──│            │         │  (DashMap)   │     │
//!                        │  └─────┬──────┘         └──────────────┘     │
//!                        │        │ spawn                ▲     ▲        │
//!                        │        ▼                      │     │        │
//!                        │  ┌────────────┐  complete_with│     │touch   │
//!                        │  │ downstream │──────┐        │     │        │
//!                        │  │  executor  │      │  ┌─────┴───┐ │        │
//!                        │  └─────┬──────┘      │  │callback │ │        │
//!                        └────────┼─────────────┼──┴────▲────┴─┼────────┘
//!                                 │ ID, Worker-Url      │      │
//!                                 ▼                     │      │ POST /client/status
//!                        ┌─────────────────┐  POST /service/in │
//!                        │ downstream svc  │────────────┘      │
//!                        └─────────────────┘          client ──┘
//! ```

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;

use correlation_broker::config::{load_config, BrokerConfig};
use correlation_broker::lifecycle::{shutdown_signal, Shutdown};
use correlation_broker::observability::{logging, metrics};
use correlation_broker::HttpServer;

#[derive(Parser)]
#[command(name = "correlation-broker")]
#[command(about = "Asynchronous request/response correlation broker", long_about = None)]
struct Args {
    /// Service port; overrides the port of `listener.bind_address`.
    #[arg(short, long)]
    port: Option<u16>,

    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// `host:port` downstream services should call back on.
    #[arg(long)]
    advertise: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => BrokerConfig::default(),
    };

    if let Some(port) = args.port {
        let mut addr: SocketAddr = config.listener.bind_address.parse()?;
        addr.set_port(port);
        config.listener.bind_address = addr.to_string();
    }
    if let Some(advertise) = args.advertise {
        config.listener.advertised_address = Some(advertise);
    }

    logging::init(&config.observability);

    tracing::info!("correlation-broker v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        callback_address = %config.listener.callback_address(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics listener");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.trigger();
    });

    tracing::info!("to stop the service, press [Ctrl+C]");
    HttpServer::new(config).run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
