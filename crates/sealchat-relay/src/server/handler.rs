//! Per-connection protocol state machine.
//!
//! The handler turns each incoming frame into at most one reply for its own
//! connection, and forwards chat messages to other sessions' queues. Payloads
//! are never inspected.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use sealchat_core::protocol::{
    ClientList, IncomingMessage, OutgoingMessage, Record, Register, RegisterAck, StartChatInfo,
    StartChatRequest, parse_line,
};

use crate::registry::SessionRegistry;

/// Lifecycle of one relay connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Unregistered,
    Registered,
    Disconnected,
    Errored,
}

pub struct ConnectionHandler {
    identifier: String,
    registry: SessionRegistry,
    outbound: mpsc::Sender<Record>,
    state: ConnectionState,
}

impl ConnectionHandler {
    /// `outbound` is this connection's own queue; it is handed to the
    /// registry on REGISTER so other sessions can reach us.
    pub const fn new(
        identifier: String,
        registry: SessionRegistry,
        outbound: mpsc::Sender<Record>,
    ) -> Self {
        Self {
            identifier,
            registry,
            outbound,
            state: ConnectionState::Unregistered,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Process one frame and return the reply for this connection, if any.
    pub async fn handle_frame(&mut self, frame: &str) -> Option<Record> {
        match parse_line(frame) {
            Ok(record) => self.handle_record(record).await,
            Err(e) => {
                debug!(identifier = %self.identifier, error = %e, "Malformed frame");
                Some(Record::invalid_format())
            }
        }
    }

    pub async fn handle_record(&mut self, record: Record) -> Option<Record> {
        match record {
            Record::Register(reg) => Some(self.register(reg).await),
            Record::ListRequest => Some(Record::ClientList(ClientList {
                list: self.registry.snapshot().await,
            })),
            Record::StartChatRequest(req) => Some(self.start_chat(req).await),
            Record::Message(msg) => self.forward(msg).await,
            Record::Unknown { record_type, .. } => {
                debug!(identifier = %self.identifier, record_type = %record_type, "Unknown record type");
                Some(Record::unknown_type(&record_type))
            }
            // Relay-to-client records are not requests.
            other @ (Record::RegisterAck(_)
            | Record::ClientList(_)
            | Record::StartChatInfo(_)
            | Record::TargetNotFound(_)
            | Record::IncomingMessage(_)
            | Record::DeliveryError(_)
            | Record::Error(_)) => {
                debug!(identifier = %self.identifier, record_type = other.record_type(), "Unexpected record from client");
                Some(Record::unknown_type(other.record_type()))
            }
        }
    }

    async fn register(&mut self, reg: Register) -> Record {
        self.registry
            .register(
                self.identifier.clone(),
                reg.name,
                reg.public_key,
                self.outbound.clone(),
            )
            .await;
        self.state = ConnectionState::Registered;
        Record::RegisterAck(RegisterAck {
            identifier: self.identifier.clone(),
        })
    }

    async fn start_chat(&self, req: StartChatRequest) -> Record {
        match self
            .registry
            .resolve_target(&req.target_identifier, &self.identifier)
            .await
        {
            Some(target) => {
                info!(
                    identifier = %self.identifier,
                    target = %target.identifier,
                    "Chat target resolved"
                );
                Record::StartChatInfo(StartChatInfo {
                    identifier: target.identifier.clone(),
                    name: target.name.clone(),
                    public_key: target.public_key.clone(),
                })
            }
            None => Record::target_not_found(&req.target_identifier),
        }
    }

    /// Forward a message; returns a reply only when delivery failed.
    async fn forward(&self, msg: OutgoingMessage) -> Option<Record> {
        let Some(receiver) = self.registry.get(&msg.receiver).await else {
            debug!(identifier = %self.identifier, receiver = %msg.receiver, "Receiver not registered");
            return Some(Record::delivery_failed(&msg.receiver));
        };
        if !receiver.is_writable() {
            return Some(Record::delivery_failed(&msg.receiver));
        }

        let sender_name = self
            .registry
            .get(&self.identifier)
            .await
            .and_then(|own| own.name.clone());
        let incoming = Record::IncomingMessage(IncomingMessage {
            sender: self.identifier.clone(),
            sender_name,
            payload: msg.payload,
        });

        if let Err(e) = receiver.deliver(incoming) {
            let reason = match e {
                mpsc::error::TrySendError::Full(_) => "queue full",
                mpsc::error::TrySendError::Closed(_) => "connection closed",
            };
            warn!(identifier = %self.identifier, receiver = %msg.receiver, reason, "Receiver not writable");
            return Some(Record::delivery_failed(&msg.receiver));
        }
        debug!(identifier = %self.identifier, receiver = %msg.receiver, "Message forwarded");
        None
    }

    /// Tear down: drop the registry entry and record how the connection ended.
    pub async fn close(&mut self, outcome: ConnectionState) {
        self.registry.unregister(&self.identifier).await;
        self.state = outcome;
    }
}
