//! Parsing helpers for the numeric surface forms edited in the UI.

use crate::errors::TypeError;
use primitive_types::U256;

/// Parses a non-negative integer from decimal or `0x`-hex into a U256.
///
/// # Errors
///
/// Returns `TypeError` on empty input, bad digits or values over 256 bits.
pub fn parse_u256(input: &str) -> Result<U256, TypeError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(TypeError::InvalidNumber(input.to_string()));
    }
    if let Some(rest) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        U256::from_str_radix(rest, 16).map_err(|_| TypeError::InvalidNumber(input.to_string()))
    } else {
        U256::from_dec_str(trimmed).map_err(|_| TypeError::InvalidNumber(input.to_string()))
    }
}

/// Parses a non-negative integer from decimal or `0x`-hex into a u64.
///
/// # Errors
///
/// Returns `TypeError` on bad digits or values over 64 bits.
pub fn parse_u64(input: &str) -> Result<u64, TypeError> {
    let value = parse_u256(input)?;
    if value > U256::from(u64::MAX) {
        return Err(TypeError::NumberOverflow(input.to_string()));
    }
    Ok(value.as_u64())
}

/// Big-endian 32-byte form of a U256, the normalized internal shape.
#[must_use]
pub fn u256_to_be_bytes(value: U256) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    bytes
}

/// Groups a u64 with underscores for display (1_000_000).
#[must_use]
pub fn format_u64_grouped(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('_');
        }
        out.push(ch);
    }
    out
}

// =============================================================================
// TESTS
// =============================================================================
