//! TCP accept loop and per-connection tasks.

use std::future::Future;
use std::net::SocketAddr;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncBufRead, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{Instrument, debug, error, info, info_span, warn};

use sealchat_core::Error as CoreError;
use sealchat_core::config::RelayConfig;
use sealchat_core::framing::{FrameReader, FrameWriter};
use sealchat_core::protocol::{ErrorNotice, Record};

use crate::registry::SessionRegistry;
use crate::server::handler::{ConnectionHandler, ConnectionState};

/// Pause after a failed accept so descriptor exhaustion does not spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// The relay: a bound listener plus the shared registry.
pub struct RelayServer {
    listener: TcpListener,
    registry: SessionRegistry,
    max_frame_bytes: usize,
    outbound_queue: usize,
}

impl RelayServer {
    /// Bind to `config.listen_addr` with a fresh registry.
    pub async fn bind(config: &RelayConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr).await?;
        Ok(Self::from_listener(listener, config))
    }

    /// Wrap an already-bound listener.
    pub fn from_listener(listener: TcpListener, config: &RelayConfig) -> Self {
        Self {
            listener,
            registry: SessionRegistry::new(),
            max_frame_bytes: config.max_frame_bytes,
            outbound_queue: config.outbound_queue.max(1),
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Handle to the registry shared by every connection.
    pub fn registry(&self) -> SessionRegistry {
        self.registry.clone()
    }

    /// Accept connections forever.
    pub async fn serve(self) {
        self.serve_with_shutdown(std::future::pending()).await;
    }

    /// Accept connections until `shutdown` resolves. Failed accepts are
    /// logged and skipped.
    pub async fn serve_with_shutdown<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        accept_loop(
            &self.listener,
            &self.registry,
            self.max_frame_bytes,
            self.outbound_queue,
            shutdown,
        )
        .await;
    }
}

/// Source of inbound connections.
trait Acceptor {
    fn poll_accept(&self, cx: &mut Context<'_>) -> Poll<std::io::Result<(TcpStream, SocketAddr)>>;
}

impl Acceptor for TcpListener {
    fn poll_accept(&self, cx: &mut Context<'_>) -> Poll<std::io::Result<(TcpStream, SocketAddr)>> {
        Self::poll_accept(self, cx)
    }
}

async fn accept_loop<A, F>(
    acceptor: &A,
    registry: &SessionRegistry,
    max_frame_bytes: usize,
    outbound_queue: usize,
    shutdown: F,
) where
    A: Acceptor + Sync,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            accepted = std::future::poll_fn(|cx| acceptor.poll_accept(cx)) => {
                let (stream, peer) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "Accept failed");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                        continue;
                    }
                };
                let span = info_span!("connection", peer = %peer);
                tokio::spawn(
                    run_connection(
                        stream,
                        peer,
                        registry.clone(),
                        max_frame_bytes,
                        outbound_queue,
                    )
                    .instrument(span),
                );
            }
            () = &mut shutdown => {
                info!("Relay listener shutting down");
                return;
            }
        }
    }
}

async fn run_connection(
    stream: TcpStream,
    peer: SocketAddr,
    registry: SessionRegistry,
    max_frame_bytes: usize,
    outbound_queue: usize,
) {
    let identifier = peer.to_string();
    info!(identifier = %identifier, "Connection opened");

    let (read_half, write_half) = stream.into_split();
    let (out_tx, mut out_rx) = mpsc::channel::<Record>(outbound_queue);

    // Drain this connection's queue to the socket. Returning drops `out_rx`,
    // which the read loop watches for.
    let writer_id = identifier.clone();
    tokio::spawn(
        async move {
            let mut writer = FrameWriter::new(write_half);
            while let Some(record) = out_rx.recv().await {
                if let Err(e) = writer.write_record(&record).await {
                    warn!(identifier = %writer_id, error = %e, "Write failed, closing writer");
                    return;
                }
            }
            if let Err(e) = writer.shutdown().await {
                debug!(identifier = %writer_id, error = %e, "Shutdown after drain failed");
            }
        }
        .in_current_span(),
    );

    let mut handler = ConnectionHandler::new(identifier.clone(), registry, out_tx.clone());
    let mut frames = FrameReader::new(BufReader::new(read_half), max_frame_bytes);

    let outcome = read_loop(&mut frames, &mut handler, &out_tx).await;

    handler.close(outcome).await;
    info!(identifier = %identifier, outcome = ?outcome, "Connection closed");
}

/// Feed frames to the handler until the peer goes away or the writer dies.
async fn read_loop<R>(
    frames: &mut FrameReader<R>,
    handler: &mut ConnectionHandler,
    out_tx: &mpsc::Sender<Record>,
) -> ConnectionState
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let next = tokio::select! {
            next = frames.next_frame() => next,
            () = out_tx.closed() => {
                warn!(identifier = %handler.identifier(), "Writer gone, dropping connection");
                return ConnectionState::Errored;
            }
        };

        let reply = match next {
            Ok(Some(frame)) => handler.handle_frame(&frame).await,
            Ok(None) => return ConnectionState::Disconnected,
            Err(CoreError::FrameTooLarge { limit }) => {
                warn!(identifier = %handler.identifier(), limit, "Oversized frame discarded");
                Some(Record::Error(ErrorNotice {
                    message: format!("Frame exceeds {limit} bytes"),
                }))
            }
            Err(CoreError::Parse(reason)) => {
                debug!(identifier = %handler.identifier(), reason = %reason, "Undecodable frame");
                Some(Record::invalid_format())
            }
            Err(e) => {
                error!(identifier = %handler.identifier(), error = %e, "Connection read error");
                return ConnectionState::Errored;
            }
        };

        if let Some(reply) = reply {
            if out_tx.send(reply).await.is_err() {
                warn!(identifier = %handler.identifier(), "Writer gone, dropping connection");
                return ConnectionState::Errored;
            }
        }
    }
}
