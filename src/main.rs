//! vary-gateway server.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use vary_gateway::config::{apply_env_overrides, load_config, GatewayConfig};
use vary_gateway::observability::{logging, metrics};
use vary_gateway::provider::HttpProvider;
use vary_gateway::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "vary-gateway")]
#[command(about = "Resilient gateway for generative-AI provider calls", long_about = None)]
struct Args {
    /// Path to a TOML config file. Built-in defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    apply_env_overrides(&mut config);

    logging::init_logging(&config.observability);
    tracing::info!("vary-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        provider = %config.provider.base_url,
        routes = config.routes.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let provider = Arc::new(HttpProvider::new(&config.provider, &config.timeouts)?);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, provider);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
