//! `SealChat` Core Library
//!
//! Shared functionality for `SealChat` components:
//! - Relay protocol records and their line framing
//! - Hamming(7,4) forward error correction
//! - Configuration resolution and hierarchy
//! - Common error types

pub mod config;
pub mod error;
pub mod fec;
pub mod framing;
pub mod protocol;
pub mod tracing_init;

pub use config::Config;
pub use error::{Error, FecError, Result};
pub use framing::{FrameReader, FrameWriter, encode_frame};
pub use protocol::Record;
