//! `beacon` binary: the WebSocket signaling relay.

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use beacon_server::{BeaconServer, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "beacon", version, about = "WebSocket signaling relay")]
struct Args {
    /// Host to bind.
    #[arg(long, env = "BEACON_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to bind (0 auto-assigns).
    #[arg(long, env = "PORT", default_value_t = 10000)]
    port: u16,

    /// Seconds between liveness probe sweeps.
    #[arg(long, env = "BEACON_PROBE_INTERVAL", default_value_t = 10)]
    probe_interval: u64,

    /// Seconds a peer may wait for a match before timing out.
    #[arg(long, env = "BEACON_WAITING_TTL", default_value_t = 30)]
    waiting_ttl: u64,

    /// Seconds to wait for connections to close on shutdown.
    #[arg(long, env = "BEACON_SHUTDOWN_GRACE", default_value_t = 5)]
    shutdown_grace: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = ServerConfig {
        host: args.host,
        port: args.port,
        probe_interval_secs: args.probe_interval,
        waiting_ttl_secs: args.waiting_ttl,
        shutdown_grace_secs: args.shutdown_grace,
        ..ServerConfig::default()
    };

    let server = BeaconServer::new(config);
    let handle = server.listen().await?;
    info!(addr = %handle.addr, "signaling relay ready");

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    if server.shutdown_gracefully(handle).await {
        info!("shutdown complete");
    }
    Ok(())
}
