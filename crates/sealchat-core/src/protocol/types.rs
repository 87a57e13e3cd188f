//! Record types for the SealChat relay protocol.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Every record exchanged between clients and the relay.
///
/// Serialized as a JSON object whose `type` field names the variant.
/// `Unknown` only ever comes out of the parser and is never written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Record {
    Register(Register),
    RegisterAck(RegisterAck),
    ListRequest,
    ClientList(ClientList),
    StartChatRequest(StartChatRequest),
    StartChatInfo(StartChatInfo),
    TargetNotFound(TargetNotFound),
    Message(OutgoingMessage),
    IncomingMessage(IncomingMessage),
    DeliveryError(DeliveryError),
    Error(ErrorNotice),
    #[serde(skip)]
    Unknown { record_type: String, payload: Value },
}

/// Wire names of every record kind the parser understands.
pub const KNOWN_TYPES: &[&str] = &[
    "REGISTER",
    "REGISTER_ACK",
    "LIST_REQUEST",
    "CLIENT_LIST",
    "START_CHAT_REQUEST",
    "START_CHAT_INFO",
    "TARGET_NOT_FOUND",
    "MESSAGE",
    "INCOMING_MESSAGE",
    "DELIVERY_ERROR",
    "ERROR",
];

impl Record {
    /// The `type` discriminator this record is written with.
    pub fn record_type(&self) -> &str {
        match self {
            Self::Register(_) => "REGISTER",
            Self::RegisterAck(_) => "REGISTER_ACK",
            Self::ListRequest => "LIST_REQUEST",
            Self::ClientList(_) => "CLIENT_LIST",
            Self::StartChatRequest(_) => "START_CHAT_REQUEST",
            Self::StartChatInfo(_) => "START_CHAT_INFO",
            Self::TargetNotFound(_) => "TARGET_NOT_FOUND",
            Self::Message(_) => "MESSAGE",
            Self::IncomingMessage(_) => "INCOMING_MESSAGE",
            Self::DeliveryError(_) => "DELIVERY_ERROR",
            Self::Error(_) => "ERROR",
            Self::Unknown { record_type, .. } => record_type,
        }
    }

    /// Reply for a frame that could not be parsed at all.
    pub fn invalid_format() -> Self {
        Self::Error(ErrorNotice {
            message: "Invalid message format".to_string(),
        })
    }

    /// Reply for a well-formed record of a type the relay does not handle.
    pub fn unknown_type(record_type: &str) -> Self {
        Self::Error(ErrorNotice {
            message: format!("Unknown message type: {record_type}"),
        })
    }

    pub fn target_not_found(identifier: &str) -> Self {
        Self::TargetNotFound(TargetNotFound {
            identifier: identifier.to_string(),
            message: format!("Client {identifier} not found"),
        })
    }

    pub fn delivery_failed(recipient: &str) -> Self {
        Self::DeliveryError(DeliveryError {
            recipient: recipient.to_string(),
            reason: format!("Recipient {recipient} is not connected"),
        })
    }
}

/// Public half of a key pair as carried on the wire: decimal strings.
///
/// The relay stores and returns this verbatim; only clients parse it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyMaterial {
    pub e: String,
    pub n: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Register {
    #[serde(default)]
    pub name: Option<String>,
    pub public_key: KeyMaterial,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterAck {
    pub identifier: String,
}

/// One row of a registry snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientEntry {
    pub identifier: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientList {
    pub list: Vec<ClientEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartChatRequest {
    /// Identifier, or display name as a fallback.
    pub target_identifier: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartChatInfo {
    pub identifier: String,
    #[serde(default)]
    pub name: Option<String>,
    pub public_key: KeyMaterial,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetNotFound {
    /// The request string exactly as received.
    pub identifier: String,
    pub message: String,
}

/// Client → relay chat message. `payload` is opaque to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub receiver: String,
    pub payload: Value,
}

/// Relay → client chat message, payload untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingMessage {
    pub sender: String,
    #[serde(default)]
    pub sender_name: Option<String>,
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryError {
    pub recipient: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorNotice {
    pub message: String,
}
