//! Forward error correction applied to plaintext before encryption.

mod hamming;

pub use hamming::{
    Codeword, Nibble, decode_message, decode_nibble, decode_nibble_with_syndrome, encode_message,
    encode_nibble, flip_bit,
};
