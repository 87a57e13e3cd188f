//! Hamming(7,4) single-error-correcting code.
//!
//! Codeword layout, 1-indexed: `[p1, p2, d3, p4, d5, d6, d7]`. Parity bit
//! `pN` covers every position whose index has bit `N` set.
//!
//! Two flipped bits in one codeword are "corrected" to a different valid
//! codeword. That is a property of the code and is kept as is.

use tracing::debug;

use crate::error::FecError;

/// Four data bits, most significant first: `[d3, d5, d6, d7]`.
pub type Nibble = [u8; 4];

/// Seven bits in position order 1..=7.
pub type Codeword = [u8; 7];

const NIBBLE_BITS: usize = 4;
const WORD_BITS: usize = 7;

fn check_bits(bits: &[u8]) -> Result<(), FecError> {
    match bits.iter().position(|&b| b > 1) {
        Some(i) => Err(FecError::InvalidBit {
            position: i + 1,
            value: bits[i],
        }),
        None => Ok(()),
    }
}

/// Encode four data bits into a codeword.
pub fn encode_nibble(bits: &[u8]) -> Result<Codeword, FecError> {
    if bits.len() != NIBBLE_BITS {
        return Err(FecError::InvalidNibbleSize { actual: bits.len() });
    }
    check_bits(bits)?;

    let (d3, d5, d6, d7) = (bits[0], bits[1], bits[2], bits[3]);
    let p1 = d3 ^ d5 ^ d7;
    let p2 = d3 ^ d6 ^ d7;
    let p4 = d5 ^ d6 ^ d7;
    Ok([p1, p2, d3, p4, d5, d6, d7])
}

/// Decode a codeword, repairing at most one flipped bit.
pub fn decode_nibble(word: &[u8]) -> Result<Nibble, FecError> {
    decode_nibble_with_syndrome(word).map(|(nibble, _)| nibble)
}

/// Decode a codeword and also return its syndrome.
///
/// A zero syndrome means the word was accepted unchanged; otherwise it is the
/// 1-indexed position that was flipped back.
pub fn decode_nibble_with_syndrome(word: &[u8]) -> Result<(Nibble, u8), FecError> {
    if word.len() != WORD_BITS {
        return Err(FecError::InvalidWordSize { actual: word.len() });
    }
    check_bits(word)?;

    let mut w: Codeword = [0; WORD_BITS];
    w.copy_from_slice(word);

    let s1 = w[0] ^ w[2] ^ w[4] ^ w[6];
    let s2 = w[1] ^ w[2] ^ w[5] ^ w[6];
    let s4 = w[3] ^ w[4] ^ w[5] ^ w[6];
    let syndrome = 4 * s4 + 2 * s2 + s1;

    if syndrome != 0 {
        w[usize::from(syndrome) - 1] ^= 1;
    }

    Ok(([w[2], w[4], w[5], w[6]], syndrome))
}

fn nibble_bits(value: u8) -> Nibble {
    [(value >> 3) & 1, (value >> 2) & 1, (value >> 1) & 1, value & 1]
}

fn nibble_value(bits: Nibble) -> u8 {
    bits.iter().fold(0, |acc, &b| (acc << 1) | b)
}

fn word_to_unit(word: Codeword) -> char {
    char::from(word.iter().fold(0u8, |acc, &b| (acc << 1) | b))
}

fn unit_to_word(unit: char) -> Result<Codeword, FecError> {
    let code = u32::from(unit);
    if code > 0x7F {
        return Err(FecError::InvalidWordSize {
            actual: (u32::BITS - code.leading_zeros()) as usize,
        });
    }
    let mut word: Codeword = [0; WORD_BITS];
    for (i, bit) in word.iter_mut().enumerate() {
        *bit = u8::from(code >> (WORD_BITS - 1 - i) & 1 == 1);
    }
    Ok(word)
}

/// Encode text into codeword units, two per character (high nibble first).
///
/// Every output char lies in `U+0000..=U+007F`. Characters above `U+00FF`
/// are rejected.
pub fn encode_message(text: &str) -> Result<String, FecError> {
    let mut encoded = String::with_capacity(text.len() * 2);
    for ch in text.chars() {
        let byte = u8::try_from(u32::from(ch)).map_err(|_| FecError::UnsupportedCharacter { ch })?;
        for nibble in [byte >> 4, byte & 0x0F] {
            let word = encode_nibble(&nibble_bits(nibble))?;
            encoded.push(word_to_unit(word));
        }
    }
    Ok(encoded)
}

/// Decode codeword units back into text, repairing single-bit errors.
pub fn decode_message(encoded: &str) -> Result<String, FecError> {
    let units: Vec<char> = encoded.chars().collect();
    if units.len() % 2 != 0 {
        return Err(FecError::MalformedEncoding {
            length: units.len(),
        });
    }

    let mut corrected = 0usize;
    let mut text = String::with_capacity(units.len() / 2);
    for pair in units.chunks_exact(2) {
        let (high, high_syndrome) = decode_nibble_with_syndrome(&unit_to_word(pair[0])?)?;
        let (low, low_syndrome) = decode_nibble_with_syndrome(&unit_to_word(pair[1])?)?;
        corrected += usize::from(high_syndrome != 0) + usize::from(low_syndrome != 0);
        text.push(char::from((nibble_value(high) << 4) | nibble_value(low)));
    }

    if corrected > 0 {
        debug!(corrected, units = units.len(), "Repaired codeword bit errors");
    }
    Ok(text)
}

/// Flip the bit at 1-indexed `position` of one codeword unit.
///
/// Returns `None` for positions outside `1..=7` or units wider than 7 bits.
pub fn flip_bit(unit: char, position: usize) -> Option<char> {
    if !(1..=WORD_BITS).contains(&position) {
        return None;
    }
    let mut word = unit_to_word(unit).ok()?;
    word[position - 1] ^= 1;
    Some(word_to_unit(word))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn encode_known_codeword() {
        // d = 1011 -> p1 = 1^0^1 = 0, p2 = 1^1^1 = 1, p4 = 0^1^1 = 0
        assert_eq!(encode_nibble(&[1, 0, 1, 1]).unwrap(), [0, 1, 1, 0, 0, 1, 1]);
    }

    #[test]
    fn every_nibble_round_trips() {
        for n in 0..16u8 {
            let word = encode_nibble(&nibble_bits(n)).unwrap();
            assert_eq!(nibble_value(decode_nibble(&word).unwrap()), n);
        }
    }

    #[test]
    fn clean_word_has_zero_syndrome() {
        let word = encode_nibble(&[0, 1, 1, 0]).unwrap();
        assert_eq!(decode_nibble_with_syndrome(&word).unwrap().1, 0);
    }

    #[test]
    fn single_flip_corrected_at_every_position() {
        for n in 0..16u8 {
            let word = encode_nibble(&nibble_bits(n)).unwrap();
            for pos in 0..7 {
                let mut damaged = word;
                damaged[pos] ^= 1;
                let (decoded, syndrome) = decode_nibble_with_syndrome(&damaged).unwrap();
                assert_eq!(nibble_value(decoded), n, "nibble {n} position {}", pos + 1);
                assert_eq!(usize::from(syndrome), pos + 1);
            }
        }
    }

    #[test]
    fn double_flip_is_miscorrected() {
        for n in 0..16u8 {
            let word = encode_nibble(&nibble_bits(n)).unwrap();
            for a in 0..7 {
                for b in (a + 1)..7 {
                    let mut damaged = word;
                    damaged[a] ^= 1;
                    damaged[b] ^= 1;
                    let decoded = decode_nibble(&damaged).unwrap();
                    assert_ne!(nibble_value(decoded), n);
                }
            }
        }
    }

    #[test]
    fn wrong_sizes_rejected() {
        assert_eq!(
            encode_nibble(&[1, 0, 1]),
            Err(FecError::InvalidNibbleSize { actual: 3 })
        );
        assert_eq!(
            decode_nibble(&[0; 8]),
            Err(FecError::InvalidWordSize { actual: 8 })
        );
    }

    #[test]
    fn non_binary_bit_rejected() {
        assert_eq!(
            encode_nibble(&[0, 2, 0, 0]),
            Err(FecError::InvalidBit {
                position: 2,
                value: 2
            })
        );
    }

    #[test]
    fn message_doubles_length() {
        let encoded = encode_message("hi").unwrap();
        assert_eq!(encoded.chars().count(), 4);
        assert!(encoded.chars().all(|c| u32::from(c) <= 0x7F));
    }

    #[test]
    fn odd_length_is_malformed() {
        let encoded = encode_message("a").unwrap();
        let truncated: String = encoded.chars().take(1).collect();
        assert_eq!(
            decode_message(&truncated),
            Err(FecError::MalformedEncoding { length: 1 })
        );
    }

    #[test]
    fn wide_unit_is_rejected() {
        assert!(matches!(
            decode_message("\u{80}\u{0}"),
            Err(FecError::InvalidWordSize { actual: 8 })
        ));
    }

    #[test]
    fn wide_character_is_rejected() {
        assert_eq!(
            encode_message("€"),
            Err(FecError::UnsupportedCharacter { ch: '€' })
        );
    }

    #[test]
    fn flip_bit_bounds() {
        assert!(flip_bit('\u{0}', 0).is_none());
        assert!(flip_bit('\u{0}', 8).is_none());
        assert_eq!(flip_bit('\u{0}', 7), Some('\u{1}'));
        assert_eq!(flip_bit('\u{0}', 1), Some('\u{40}'));
    }

    proptest! {
        #[test]
        fn prop_message_round_trip(text in "[\\x00-\\xff]{0,64}") {
            let encoded = encode_message(&text).unwrap();
            prop_assert_eq!(decode_message(&encoded).unwrap(), text);
        }

        #[test]
        fn prop_one_flip_per_unit_repaired(text in "[\\x00-\\xff]{1,32}", position in 1usize..=7) {
            let damaged: String = encode_message(&text)
                .unwrap()
                .chars()
                .map(|c| flip_bit(c, position).unwrap())
                .collect();
            prop_assert_eq!(decode_message(&damaged).unwrap(), text);
        }
    }
}
