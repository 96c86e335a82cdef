//! 20-byte account addresses.

use crate::errors::TypeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A 20-byte Ethereum-style address.
///
/// The canonical surface form is lowercase hex with a `0x` prefix,
/// 42 characters total. The zero address is reserved.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The zero address (0x0000...0000).
    pub const ZERO: Self = Self([0u8; 20]);

    /// Creates an address from a 20-byte array.
    #[must_use]
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Creates an address from a slice. Returns None if wrong length.
    #[must_use]
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        if slice.len() == 20 {
            let mut bytes = [0u8; 20];
            bytes.copy_from_slice(slice);
            Some(Self(bytes))
        } else {
            None
        }
    }

    /// Parses the canonical surface form: `0x` followed by 40 hex digits.
    /// Input case is ignored; output is always lowercase.
    ///
    /// # Errors
    ///
    /// Returns `TypeError` on missing prefix, bad digits or wrong length.
    pub fn parse(input: &str) -> Result<Self, TypeError> {
        let rest = input
            .strip_prefix("0x")
            .or_else(|| input.strip_prefix("0X"))
            .ok_or(TypeError::MissingPrefix)?;
        let raw = hex::decode(rest).map_err(|_| TypeError::InvalidHex(input.to_string()))?;
        Self::from_slice(&raw).ok_or(TypeError::InvalidLength {
            expected: 20,
            actual: raw.len(),
        })
    }

    /// Returns the underlying bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Returns true if this is the zero address.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Canonical lowercase hex form, 42 characters.
    #[must_use]
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in &self.0[..4] {
            write!(f, "{byte:02x}")?;
        }
        write!(f, "...")?;
        for byte in &self.0[18..] {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl FromStr for Address {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl From<Address> for [u8; 20] {
    fn from(addr: Address) -> Self {
        addr.0
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero() {
        assert!(Address::ZERO.is_zero());
        assert!(!Address::new([1u8; 20]).is_zero());
    }

    #[test]
    fn test_parse_roundtrip() {
        let hex = "0x00000000000000000000000000000000000010aB";
        let addr = Address::parse(hex).unwrap();
        assert_eq!(addr.to_hex(), hex.to_lowercase());
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(Address::parse("1234"), Err(TypeError::MissingPrefix));
        assert!(matches!(
            Address::parse("0x12"),
            Err(TypeError::InvalidLength { .. })
        ));
        assert!(matches!(
            Address::parse("0xzz00000000000000000000000000000000000000"),
            Err(TypeError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_display_truncates() {
        let addr = Address::parse("0x1234567890abcdef1234567890abcdef12345678").unwrap();
        assert_eq!(format!("{addr}"), "0x12345678...5678");
        assert_eq!(
            format!("{addr:?}"),
            "0x1234567890abcdef1234567890abcdef12345678"
        );
    }
}
