//! Error types for `SealChat` core library.

use thiserror::Error;

/// Result type alias using `SealChat` Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for `SealChat` operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Record could not be parsed
    #[error("Failed to parse record: {0}")]
    Parse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Incoming frame exceeded the configured limit
    #[error("Frame exceeds {limit} bytes")]
    FrameTooLarge { limit: usize },

    /// Forward-error-correction failure
    #[error("FEC error: {0}")]
    Fec(#[from] FecError),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the Hamming(7,4) codec.
///
/// All of these reject a single message; none of them affects the
/// connection the message arrived on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FecError {
    #[error("Nibble must be exactly 4 bits, got {actual}")]
    InvalidNibbleSize { actual: usize },

    #[error("Codeword must be exactly 7 bits, got {actual}")]
    InvalidWordSize { actual: usize },

    #[error("Bit at position {position} is {value}, expected 0 or 1")]
    InvalidBit { position: usize, value: u8 },

    #[error("Encoded length {length} is not a whole number of characters")]
    MalformedEncoding { length: usize },

    #[error("Character {ch:?} does not fit in 8 bits")]
    UnsupportedCharacter { ch: char },
}
