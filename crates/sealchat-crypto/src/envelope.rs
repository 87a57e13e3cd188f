//! Sealing pipeline: FEC-encode then encrypt, and the reverse.
//!
//! The sealed form is an ordered list of decimal symbols, two per plaintext
//! character. The relay carries it as an opaque JSON array.

use serde_json::Value;

use sealchat_core::fec;

use crate::cipher::{decrypt_message, encrypt_message};
use crate::error::CryptoError;
use crate::keys::{PrivateKey, PublicKey};

/// FEC-encode `plaintext` and encrypt every codeword unit.
pub fn seal(plaintext: &str, key: &PublicKey) -> Result<Vec<String>, CryptoError> {
    let encoded = fec::encode_message(plaintext)?;
    encrypt_message(&encoded, key)
}

/// Decrypt every symbol and FEC-decode the result.
pub fn unseal<S: AsRef<str>>(symbols: &[S], key: &PrivateKey) -> Result<String, CryptoError> {
    let encoded = decrypt_message(symbols, key)?;
    Ok(fec::decode_message(&encoded)?)
}

/// Wrap symbols as a message payload.
pub fn symbols_to_payload(symbols: Vec<String>) -> Value {
    Value::Array(symbols.into_iter().map(Value::String).collect())
}

/// Pull symbols back out of a message payload.
pub fn payload_to_symbols(payload: &Value) -> Result<Vec<String>, CryptoError> {
    let items = payload
        .as_array()
        .ok_or_else(|| CryptoError::InvalidSymbol("payload is not an array".into()))?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| CryptoError::InvalidSymbol(format!("{item} is not a string")))
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cipher::encrypt_message;
    use crate::keys::generate_key_pair;

    #[test]
    fn seal_unseal_round_trip() {
        let pair = generate_key_pair(1000).unwrap();
        let sealed = seal("hi there!", pair.public_key()).unwrap();
        assert_eq!(sealed.len(), 18);
        assert_eq!(unseal(&sealed, pair.private_key()).unwrap(), "hi there!");
    }

    #[test]
    fn single_bit_damage_before_encryption_is_repaired() {
        let pair = generate_key_pair(1000).unwrap();
        let damaged: String = fec::encode_message("hi")
            .unwrap()
            .chars()
            .map(|c| fec::flip_bit(c, 3).unwrap())
            .collect();
        let symbols = encrypt_message(&damaged, pair.public_key()).unwrap();
        assert_eq!(unseal(&symbols, pair.private_key()).unwrap(), "hi");
    }

    #[test]
    fn odd_symbol_count_is_local_failure() {
        let pair = generate_key_pair(1000).unwrap();
        let mut sealed = seal("ok", pair.public_key()).unwrap();
        sealed.pop();
        assert!(matches!(
            unseal(&sealed, pair.private_key()),
            Err(CryptoError::Fec(_))
        ));
    }

    #[test]
    fn wide_plaintext_rejected() {
        let pair = generate_key_pair(1000).unwrap();
        assert!(matches!(
            seal("\u{2603}", pair.public_key()),
            Err(CryptoError::Fec(_))
        ));
    }

    #[test]
    fn payload_helpers() {
        let payload = symbols_to_payload(vec!["1".into(), "22".into()]);
        assert_eq!(payload, serde_json::json!(["1", "22"]));
        assert_eq!(payload_to_symbols(&payload).unwrap(), vec!["1", "22"]);
        assert!(payload_to_symbols(&serde_json::json!({"a": 1})).is_err());
        assert!(payload_to_symbols(&serde_json::json!([1])).is_err());
    }
}
