//! `SealChat` Crypto Library
//!
//! Textbook RSA over arbitrary-precision integers, applied one symbol at a
//! time, plus the sealing pipeline that puts Hamming(7,4) in front of it.
//!
//! ## Pipeline
//!
//! - **Seal**: plaintext → FEC-encode → encrypt each unit → decimal symbols
//! - **Unseal**: decimal symbols → decrypt → FEC-decode (repairs single-bit errors) → plaintext
//!
//! No padding, no forward secrecy. The relay only ever sees symbols.

pub mod cipher;
pub mod envelope;
pub mod error;
pub mod keys;
pub mod prime;

pub use cipher::{decrypt_message, decrypt_symbol, encrypt_message, encrypt_symbol};
pub use envelope::{payload_to_symbols, seal, symbols_to_payload, unseal};
pub use error::CryptoError;
pub use keys::{KeyPair, PrivateKey, PublicKey, generate_key_pair};
pub use prime::{gcd, generate_prime, is_prime, mod_inverse};
