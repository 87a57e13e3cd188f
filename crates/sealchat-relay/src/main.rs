//! SealChat Relay Server
//!
//! Routes sealed chat messages between registered sessions.

use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use sealchat_core::config::load_config;
use sealchat_core::tracing_init::init_tracing;
use sealchat_relay::RelayServer;

#[derive(Parser, Debug)]
#[command(name = "sealchat-relay")]
#[command(version, about = "SealChat relay server - routes sealed messages between sessions")]
struct Args {
    /// Address to listen on (overrides config).
    #[arg(long, env = "SEALCHAT_LISTEN_ADDR")]
    listen: Option<String>,

    /// Path to a JSON config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Largest accepted frame in bytes (overrides config).
    #[arg(long)]
    max_frame_bytes: Option<usize>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_tracing("sealchat_relay=info", args.log_json);

    let mut config = load_config(args.config.as_deref())?;
    if let Some(listen) = args.listen {
        config.relay.listen_addr = listen;
    }
    if let Some(max) = args.max_frame_bytes {
        config.relay.max_frame_bytes = max;
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.relay.listen_addr,
        max_frame_bytes = config.relay.max_frame_bytes,
        "Starting sealchat-relay"
    );

    let server = RelayServer::bind(&config.relay).await?;
    info!(addr = %server.local_addr()?, "Relay listening");

    server
        .serve_with_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received shutdown signal");
            }
        })
        .await;

    info!("Relay stopped");
    Ok(())
}
