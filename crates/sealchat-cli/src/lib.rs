//! `SealChat` CLI Library
//!
//! Client side of the relay: the connection, the chat session that seals and
//! opens messages, and the line-mode front end.

pub mod chat;
pub mod connection;
pub mod headless;
