//! Crypto error types.

use num_bigint::BigUint;
use sealchat_core::FecError;

/// Errors from key generation and symbol encryption.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// No prime found in `[1, range]`; retry with a larger range.
    #[error("No prime found in [1, {range}] after {tries} tries")]
    ExhaustedAttempts { range: BigUint, tries: u32 },

    #[error("Key generation failed after {rounds} rounds (last range {last_range})")]
    KeyGenerationFailed { rounds: u32, last_range: BigUint },

    #[error("Invalid key material: {0}")]
    KeyFormat(String),

    #[error("Symbol value {value} is not below modulus {modulus}")]
    SymbolOutOfRange { value: BigUint, modulus: BigUint },

    #[error("Invalid ciphertext symbol: {0}")]
    InvalidSymbol(String),

    #[error("FEC error: {0}")]
    Fec(#[from] FecError),
}
