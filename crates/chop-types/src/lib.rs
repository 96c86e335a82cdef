//! # chop-types
//!
//! Value objects shared by every chop crate.
//! These types represent concepts defined by their value, not identity:
//! addresses, hashes, byte strings and 256-bit words, together with the
//! hex surface forms the terminal UI edits.

#![warn(clippy::all)]

mod address;
mod bytes;
mod errors;
mod hash;
mod num;

pub use address::Address;
pub use bytes::Bytes;
pub use errors::TypeError;
pub use hash::{keccak256, Hash};
pub use num::{format_u64_grouped, parse_u256, parse_u64, u256_to_be_bytes};

// Re-export U256 from primitive-types for 256-bit arithmetic
pub use primitive_types::U256;
