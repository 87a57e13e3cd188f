//! Per-symbol textbook RSA.
//!
//! Each character is encrypted on its own with no padding, so equal
//! characters produce equal symbols. This is the scheme's behavior and is
//! not hardened here.

use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};

use crate::error::CryptoError;
use crate::keys::{PrivateKey, PublicKey};

/// `value^e mod n`.
///
/// Values at or above `n` would not survive decryption, so they are refused
/// instead of silently producing a wrong symbol.
pub fn encrypt_symbol(value: &BigUint, e: &BigUint, n: &BigUint) -> Result<BigUint, CryptoError> {
    if value >= n {
        return Err(CryptoError::SymbolOutOfRange {
            value: value.clone(),
            modulus: n.clone(),
        });
    }
    Ok(value.modpow(e, n))
}

/// `cipher^d mod n`.
pub fn decrypt_symbol(cipher: &BigUint, d: &BigUint, n: &BigUint) -> Result<BigUint, CryptoError> {
    if n.is_zero() {
        return Err(CryptoError::KeyFormat("modulus is zero".into()));
    }
    Ok(cipher.modpow(d, n))
}

/// Encrypt each character's code point, preserving order.
pub fn encrypt_message(text: &str, key: &PublicKey) -> Result<Vec<String>, CryptoError> {
    text.chars()
        .map(|ch| {
            encrypt_symbol(&BigUint::from(u32::from(ch)), &key.e, &key.n)
                .map(|c| c.to_str_radix(10))
        })
        .collect()
}

/// Decrypt symbols back into characters, in order.
pub fn decrypt_message<S: AsRef<str>>(symbols: &[S], key: &PrivateKey) -> Result<String, CryptoError> {
    symbols
        .iter()
        .map(|symbol| {
            let symbol = symbol.as_ref();
            let cipher = symbol
                .parse::<BigUint>()
                .map_err(|_| CryptoError::InvalidSymbol(format!("{symbol:?} is not a decimal integer")))?;
            let value = decrypt_symbol(&cipher, &key.d, &key.n)?;
            value
                .to_u32()
                .and_then(char::from_u32)
                .ok_or_else(|| CryptoError::InvalidSymbol(format!("{value} is not a character")))
        })
        .collect()
}
