//! geo-rewrite front proxy.
//!
//! ```text
//!     Client Request         ┌──────────────────────────────────────────────┐
//!     ───────────────────────┼─▶ request id / trace / timeout layers        │
//!                            │        │                                      │
//!                            │        ▼                                      │
//!                            │   geo rewrite middleware ──▶ MappingCache ────┼──▶ content API
//!                            │   (loop guard, engine)       (TTL, single-    │    (GraphQL)
//!                            │        │                      flight)         │
//!                            │        ▼                                      │
//!     Client Response        │   forward_handler ───────────────────────────┼──▶ upstream app
//!     ◀──────────────────────┼── (+ loop guard cookie)                       │
//!                            └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use geo_rewrite::config::{load_config, GeoRewriteConfig};
use geo_rewrite::observability::{logging, metrics};
use geo_rewrite::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "geo-rewrite", version, about = "Country landing page rewriting proxy")]
struct Args {
    /// Path to the TOML config file; defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GeoRewriteConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!("geo-rewrite v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.address,
        cache_ttl = ?config.cache.ttl(),
        fetch_timeout_ms = config.mapping_source.timeout_ms,
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

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
