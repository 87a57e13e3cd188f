//! Relay server: per-connection protocol handling and the accept loop.

pub mod handler;
pub mod listener;

pub use handler::{ConnectionHandler, ConnectionState};
pub use listener::RelayServer;
