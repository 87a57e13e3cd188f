//! Relay protocol records.
//!
//! Each record is a JSON object with a `type` discriminator, written as one
//! line. Parsing follows a tolerant reader pattern.

mod parser;
mod types;

pub use parser::{parse_line, parse_value, to_line};
pub use types::*;
