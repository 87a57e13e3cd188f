//! Relay connection client.
//!
//! Owns the TCP stream to the relay. Outbound records are written directly;
//! inbound frames are parsed by a background task and queued.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::BufReader;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use sealchat_core::framing::{FrameReader, FrameWriter};
use sealchat_core::protocol::{Record, parse_line};
use sealchat_crypto::CryptoError;

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Relay address (`host:port`).
    pub addr: String,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Largest frame accepted from the relay.
    pub max_frame_bytes: usize,
    /// Depth of the inbound record queue.
    pub inbound_queue: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:9000".to_string(),
            connect_timeout: Duration::from_secs(5),
            max_frame_bytes: 64 * 1024,
            inbound_queue: 128,
        }
    }
}

/// Client connection to the relay.
pub struct RelayConnection {
    writer: FrameWriter<OwnedWriteHalf>,
    inbound: mpsc::Receiver<Record>,
    reader_task: JoinHandle<()>,
    local_addr: SocketAddr,
}

impl RelayConnection {
    /// Connect to `addr` with default settings.
    pub async fn connect(addr: &str) -> Result<Self, ConnectionError> {
        Self::connect_with(&ConnectionConfig {
            addr: addr.to_string(),
            ..ConnectionConfig::default()
        })
        .await
    }

    pub async fn connect_with(config: &ConnectionConfig) -> Result<Self, ConnectionError> {
        let stream = tokio::time::timeout(config.connect_timeout, TcpStream::connect(&config.addr))
            .await
            .map_err(|_| ConnectionError::Timeout {
                addr: config.addr.clone(),
            })??;
        let local_addr = stream.local_addr()?;
        info!(addr = %config.addr, local = %local_addr, "Connected to relay");

        let (read_half, write_half) = stream.into_split();
        let (tx, inbound) = mpsc::channel(config.inbound_queue.max(1));
        let reader_task = tokio::spawn(read_loop(read_half, config.max_frame_bytes, tx));

        Ok(Self {
            writer: FrameWriter::new(write_half),
            inbound,
            reader_task,
            local_addr,
        })
    }

    /// Local socket address; the relay uses it as this session's identifier.
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub async fn send(&mut self, record: &Record) -> Result<(), ConnectionError> {
        self.writer.write_record(record).await?;
        Ok(())
    }

    /// Next record from the relay. `Closed` once the relay hangs up.
    pub async fn recv(&mut self) -> Result<Record, ConnectionError> {
        self.inbound.recv().await.ok_or(ConnectionError::Closed)
    }

    /// Half-close the stream so the relay sees end of input.
    pub async fn shutdown(&mut self) -> Result<(), ConnectionError> {
        self.writer.shutdown().await?;
        Ok(())
    }
}

impl Drop for RelayConnection {
    fn drop(&mut self) {
        self.reader_task.abort();
    }
}

async fn read_loop(read_half: OwnedReadHalf, max_frame_bytes: usize, tx: mpsc::Sender<Record>) {
    let mut frames = FrameReader::new(BufReader::new(read_half), max_frame_bytes);
    loop {
        let frame = match frames.next_frame().await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                debug!("Relay closed the connection");
                return;
            }
            Err(sealchat_core::Error::FrameTooLarge { limit }) => {
                warn!(limit, "Dropped oversized frame from relay");
                continue;
            }
            Err(e) => {
                warn!(error = %e, "Relay read failed");
                return;
            }
        };
        match parse_line(&frame) {
            Ok(record) => {
                if tx.send(record).await.is_err() {
                    return;
                }
            }
            Err(e) => warn!(error = %e, "Ignoring malformed record from relay"),
        }
    }
}

/// Client-side errors.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] sealchat_core::Error),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("Timed out connecting to {addr}")]
    Timeout { addr: String },

    #[error("Connection to relay closed")]
    Closed,

    #[error("Expected {expected}, relay sent {got}")]
    UnexpectedReply { expected: &'static str, got: String },

    #[error("No chat peer selected")]
    NoPeer,

    #[error("Corrupt bit {0} is outside 1..=7")]
    InvalidCorruptBit(u8),

    #[error("{0}")]
    TargetNotFound(String),

    #[error("Relay error: {0}")]
    Relay(String),
}
