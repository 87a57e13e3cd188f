//! Client-side chat session.
//!
//! Holds this client's key pair and the currently selected peer, seals
//! outgoing text with the peer's public key and opens incoming messages with
//! our private key. Chat messages that arrive while a request is waiting for
//! its reply are queued rather than dropped.

use std::collections::VecDeque;

use tracing::{debug, info, warn};

use sealchat_core::config::CryptoConfig;
use sealchat_core::fec;
use sealchat_core::protocol::{
    ClientEntry, OutgoingMessage, Record, Register, StartChatRequest,
};
use sealchat_crypto::{
    CryptoError, KeyPair, PublicKey, encrypt_message, payload_to_symbols, seal,
    symbols_to_payload, unseal,
};

use crate::connection::{ConnectionError, RelayConnection};

/// The session we are currently talking to.
#[derive(Debug, Clone)]
pub struct Peer {
    pub identifier: String,
    pub name: Option<String>,
    pub key: PublicKey,
}

impl Peer {
    /// Display name, falling back to the identifier.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.identifier)
    }
}

/// Something the user should see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// A message opened with our private key.
    Message {
        sender: String,
        sender_name: Option<String>,
        text: String,
    },
    /// A message that could not be opened. Other messages are unaffected.
    Unreadable { sender: String, reason: String },
    /// The relay could not deliver one of our messages.
    DeliveryFailed { recipient: String, reason: String },
    /// An ERROR record from the relay.
    Notice(String),
}

/// Chat session options.
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    pub crypto: CryptoConfig,
    /// Flip this bit in every outgoing codeword before encryption.
    /// Positions are 1-indexed; anything outside 1..=7 makes
    /// [`ChatClient::send_text`] fail with `InvalidCorruptBit`.
    pub corrupt_bit: Option<u8>,
}

pub struct ChatClient {
    conn: RelayConnection,
    options: ChatOptions,
    keys: Option<KeyPair>,
    identifier: Option<String>,
    peer: Option<Peer>,
    pending: VecDeque<Record>,
}

impl ChatClient {
    pub const fn new(conn: RelayConnection, options: ChatOptions) -> Self {
        Self {
            conn,
            options,
            keys: None,
            identifier: None,
            peer: None,
            pending: VecDeque::new(),
        }
    }

    /// Identifier assigned by the relay, once registered.
    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    pub const fn peer(&self) -> Option<&Peer> {
        self.peer.as_ref()
    }

    /// Our key pair, generated on first use.
    pub fn key_pair(&mut self) -> Result<&KeyPair, CryptoError> {
        let keys = match self.keys.take() {
            Some(keys) => keys,
            None => {
                let keys = KeyPair::generate(&self.options.crypto)?;
                info!(fingerprint = %keys.public_key().fingerprint(), "Generated key pair");
                keys
            }
        };
        Ok(self.keys.insert(keys))
    }

    /// Register with the relay under an optional display name.
    pub async fn register(&mut self, name: Option<String>) -> Result<String, ConnectionError> {
        let public_key = self.key_pair()?.public_key().to_material();
        self.conn
            .send(&Record::Register(Register { name, public_key }))
            .await?;
        match self.await_reply("REGISTER_ACK").await? {
            Record::RegisterAck(ack) => {
                info!(identifier = %ack.identifier, "Registered with relay");
                self.identifier = Some(ack.identifier.clone());
                Ok(ack.identifier)
            }
            other => Err(unexpected("REGISTER_ACK", &other)),
        }
    }

    /// Every registered session, ourselves included.
    pub async fn list(&mut self) -> Result<Vec<ClientEntry>, ConnectionError> {
        self.conn.send(&Record::ListRequest).await?;
        match self.await_reply("CLIENT_LIST").await? {
            Record::ClientList(list) => Ok(list.list),
            other => Err(unexpected("CLIENT_LIST", &other)),
        }
    }

    /// Look up `target` (identifier or display name) and make it the current peer.
    pub async fn start_chat(&mut self, target: &str) -> Result<&Peer, ConnectionError> {
        self.conn
            .send(&Record::StartChatRequest(StartChatRequest {
                target_identifier: target.to_string(),
            }))
            .await?;
        match self.await_reply("START_CHAT_INFO").await? {
            Record::StartChatInfo(info) => {
                let key = PublicKey::try_from(&info.public_key)?;
                info!(peer = %info.identifier, fingerprint = %key.fingerprint(), "Chat peer selected");
                Ok(self.peer.insert(Peer {
                    identifier: info.identifier,
                    name: info.name,
                    key,
                }))
            }
            Record::TargetNotFound(nf) => Err(ConnectionError::TargetNotFound(nf.message)),
            other => Err(unexpected("START_CHAT_INFO", &other)),
        }
    }

    /// Seal `text` for the current peer and send it.
    ///
    /// The relay sends nothing back on success; a failure arrives later as
    /// [`ChatEvent::DeliveryFailed`].
    pub async fn send_text(&mut self, text: &str) -> Result<(), ConnectionError> {
        let peer = self.peer.as_ref().ok_or(ConnectionError::NoPeer)?;
        let symbols = match self.options.corrupt_bit {
            Some(bit) => seal_corrupted(text, &peer.key, bit)?,
            None => seal(text, &peer.key)?,
        };
        let record = Record::Message(OutgoingMessage {
            receiver: peer.identifier.clone(),
            payload: symbols_to_payload(symbols),
        });
        debug!(receiver = %peer.identifier, chars = text.chars().count(), "Sending sealed message");
        self.conn.send(&record).await
    }

    /// Next event for the user: queued messages first, then the wire.
    pub async fn next_event(&mut self) -> Result<ChatEvent, ConnectionError> {
        loop {
            let record = match self.pending.pop_front() {
                Some(record) => record,
                None => self.conn.recv().await?,
            };
            if let Some(event) = self.open_incoming(record) {
                return Ok(event);
            }
        }
    }

    /// Turn an unsolicited record into an event. Replies that nobody is
    /// waiting for are logged and yield `None`.
    pub fn open_incoming(&self, record: Record) -> Option<ChatEvent> {
        open_record(record, self.keys.as_ref())
    }

    /// Half-close the connection; the relay drops our registration.
    pub async fn close(&mut self) -> Result<(), ConnectionError> {
        self.conn.shutdown().await
    }

    /// Wait for the reply to the request just sent, queueing chat traffic.
    async fn await_reply(&mut self, expected: &'static str) -> Result<Record, ConnectionError> {
        loop {
            match self.conn.recv().await? {
                record @ (Record::IncomingMessage(_) | Record::DeliveryError(_)) => {
                    self.pending.push_back(record);
                }
                Record::Error(notice) => return Err(ConnectionError::Relay(notice.message)),
                record => {
                    debug!(expected, got = record.record_type(), "Reply received");
                    return Ok(record);
                }
            }
        }
    }
}

fn unexpected(expected: &'static str, got: &Record) -> ConnectionError {
    ConnectionError::UnexpectedReply {
        expected,
        got: got.record_type().to_string(),
    }
}

/// FEC-encode, damage one bit per codeword, then encrypt.
fn seal_corrupted(text: &str, key: &PublicKey, bit: u8) -> Result<Vec<String>, ConnectionError> {
    let encoded = fec::encode_message(text).map_err(CryptoError::from)?;
    let damaged = encoded
        .chars()
        .map(|unit| fec::flip_bit(unit, usize::from(bit)))
        .collect::<Option<String>>()
        .ok_or(ConnectionError::InvalidCorruptBit(bit))?;
    Ok(encrypt_message(&damaged, key)?)
}

fn open_record(record: Record, keys: Option<&KeyPair>) -> Option<ChatEvent> {
    match record {
        Record::IncomingMessage(msg) => {
            let opened = keys
                .ok_or_else(|| CryptoError::KeyFormat("no local key pair".into()))
                .and_then(|keys| {
                    let symbols = payload_to_symbols(&msg.payload)?;
                    unseal(&symbols, keys.private_key())
                });
            Some(match opened {
                Ok(text) => ChatEvent::Message {
                    sender: msg.sender,
                    sender_name: msg.sender_name,
                    text,
                },
                Err(e) => {
                    warn!(sender = %msg.sender, error = %e, "Could not open message");
                    ChatEvent::Unreadable {
                        sender: msg.sender,
                        reason: e.to_string(),
                    }
                }
            })
        }
        Record::DeliveryError(err) => Some(ChatEvent::DeliveryFailed {
            recipient: err.recipient,
            reason: err.reason,
        }),
        Record::Error(notice) => Some(ChatEvent::Notice(notice.message)),
        other => {
            debug!(record_type = other.record_type(), "Ignoring unsolicited record");
            None
        }
    }
}
