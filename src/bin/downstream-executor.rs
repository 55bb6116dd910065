//! Simulated slow downstream service.
//!
//! Accepts dispatched calls from the broker, sleeps a random interval, then
//! posts the result back to the broker's callback endpoint.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;

use correlation_broker::config::{load_config, BrokerConfig};
use correlation_broker::downstream::relay;
use correlation_broker::lifecycle::shutdown_signal;
use correlation_broker::observability::logging;

#[derive(Parser)]
#[command(name = "downstream-executor")]
#[command(about = "Slow downstream service that calls the broker back", long_about = None)]
struct Args {
    /// Service port; overrides the port of `executor.bind_address`.
    #[arg(short, long)]
    port: Option<u16>,

    /// TOML configuration file (only the `executor` and `observability`
    /// sections are used).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => BrokerConfig::default(),
    };

    if let Some(port) = args.port {
        let mut addr: SocketAddr = config.executor.bind_address.parse()?;
        addr.set_port(port);
        config.executor.bind_address = addr.to_string();
    }

    logging::init(&config.observability);

    let listener = TcpListener::bind(&config.executor.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        min_delay_secs = config.executor.min_delay_secs,
        max_delay_secs = config.executor.max_delay_secs,
        "downstream-executor listening"
    );

    axum::serve(listener, relay::router(&config.executor)?)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
