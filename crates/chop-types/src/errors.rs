//! Errors produced while parsing surface forms into value objects.

use thiserror::Error;

/// Errors from hex and numeric parsing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    /// Input did not start with the `0x` prefix.
    #[error("missing 0x prefix")]
    MissingPrefix,

    /// Input contained a non-hex character.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// Hex payload had an odd number of digits.
    #[error("odd-length hex string")]
    OddLength,

    /// Input decoded to the wrong number of bytes.
    #[error("invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Numeric input did not fit the target width.
    #[error("number out of range: {0}")]
    NumberOverflow(String),

    /// Numeric input was not a decimal or 0x-hex integer.
    #[error("invalid number: {0}")]
    InvalidNumber(String),
}
