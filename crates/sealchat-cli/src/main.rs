//! `SealChat` CLI
//!
//! Line-mode chat client. Registers with a relay, then reads commands and
//! messages from stdin and prints incoming messages to stdout.

use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use sealchat_cli::chat::{ChatClient, ChatOptions};
use sealchat_cli::connection::{ConnectionConfig, RelayConnection};
use sealchat_cli::headless;
use sealchat_core::config::load_config;
use sealchat_core::tracing_init::init_tracing;

#[derive(Parser, Debug)]
#[command(name = "sealchat")]
#[command(version, about = "Sealed chat over a SealChat relay", long_about = None)]
struct Cli {
    /// Relay address (overrides config)
    #[arg(long, env = "SEALCHAT_RELAY_ADDR")]
    addr: Option<String>,

    /// Display name to register with
    #[arg(short, long, env = "SEALCHAT_NAME")]
    name: Option<String>,

    /// Path to a JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Upper bound of the prime search range for key generation
    #[arg(long)]
    prime_range: Option<u64>,

    /// Flip this bit (1-7) of every outgoing codeword before encryption
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=7))]
    corrupt_bit: Option<u8>,

    /// Output logs as JSON
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
#[allow(clippy::print_stderr)]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing("sealchat_cli=warn", cli.log_json);

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(addr) = cli.addr {
        config.client.relay_addr = addr;
    }
    if let Some(name) = cli.name {
        config.client.display_name = Some(name);
    }
    if let Some(range) = cli.prime_range {
        config.crypto.prime_range = range;
    }

    info!(version = env!("CARGO_PKG_VERSION"), addr = %config.client.relay_addr, "Starting sealchat");

    let conn = RelayConnection::connect_with(&ConnectionConfig {
        addr: config.client.relay_addr.clone(),
        max_frame_bytes: config.relay.max_frame_bytes,
        ..ConnectionConfig::default()
    })
    .await?;

    let mut client = ChatClient::new(
        conn,
        ChatOptions {
            crypto: config.crypto,
            corrupt_bit: cli.corrupt_bit,
        },
    );
    let identifier = client.register(config.client.display_name).await?;
    let fingerprint = client.key_pair()?.public_key().fingerprint();
    eprintln!("[registered as {identifier}, key {fingerprint}; /help for commands]");

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    headless::run(&mut client, stdin, &mut stdout).await?;

    info!("Session ended");
    Ok(())
}
