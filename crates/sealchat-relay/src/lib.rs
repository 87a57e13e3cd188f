//! SealChat Relay Server Library
//!
//! Core functionality for the SealChat relay:
//! - In-memory session registry (identifier → display name, public key, outbound queue)
//! - Per-connection protocol state machine
//! - TCP accept loop with line-feed framing
//!
//! The relay routes sealed payloads without ever decrypting them.

pub mod registry;
pub mod server;

pub use registry::{SessionRecord, SessionRegistry};
pub use server::{ConnectionHandler, ConnectionState, RelayServer};
