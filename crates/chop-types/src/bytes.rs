//! Variable-length byte strings with a hex surface form.

use crate::errors::TypeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Variable-length byte vector for calldata, return data and code.
///
/// Empty is legal and means "no code" / "no data". The canonical hex
/// form carries a `0x` prefix and an even number of digits.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    /// Creates an empty Bytes.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Creates Bytes from a vector.
    #[must_use]
    pub fn from_vec(vec: Vec<u8>) -> Self {
        Self(vec)
    }

    /// Creates Bytes from a slice.
    #[must_use]
    pub fn from_slice(slice: &[u8]) -> Self {
        Self(slice.to_vec())
    }

    /// Parses `0x`-prefixed even-length hex. `0x` alone is the empty value.
    ///
    /// # Errors
    ///
    /// Returns `TypeError` on missing prefix, odd length or bad digits.
    pub fn parse(input: &str) -> Result<Self, TypeError> {
        let rest = input
            .strip_prefix("0x")
            .or_else(|| input.strip_prefix("0X"))
            .ok_or(TypeError::MissingPrefix)?;
        if rest.len() % 2 != 0 {
            return Err(TypeError::OddLength);
        }
        let raw = hex::decode(rest).map_err(|_| TypeError::InvalidHex(input.to_string()))?;
        Ok(Self(raw))
    }

    /// Returns the underlying vector.
    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }

    /// Returns a reference to the underlying slice.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Returns the length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Canonical hex form with `0x` prefix.
    #[must_use]
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.0))
    }
}

impl fmt::Debug for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.len() <= 8 {
            write!(f, "{}", self.to_hex())
        } else {
            write!(f, "0x")?;
            for byte in &self.0[..4] {
                write!(f, "{byte:02x}")?;
            }
            write!(f, "..({} bytes)", self.0.len())
        }
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(vec: Vec<u8>) -> Self {
        Self(vec)
    }
}

impl From<&[u8]> for Bytes {
    fn from(slice: &[u8]) -> Self {
        Self(slice.to_vec())
    }
}

impl AsRef<[u8]> for Bytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for Bytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Bytes {
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
    fn test_parse_empty() {
        let bytes = Bytes::parse("0x").unwrap();
        assert!(bytes.is_empty());
        assert_eq!(bytes.to_hex(), "0x");
    }

    #[test]
    fn test_parse_roundtrip() {
        let bytes = Bytes::parse("0x6005600a01").unwrap();
        assert_eq!(bytes.as_slice(), &[0x60, 0x05, 0x60, 0x0a, 0x01]);
        assert_eq!(bytes.to_hex(), "0x6005600a01");
    }

    #[test]
    fn test_parse_rejects_odd_length() {
        assert_eq!(Bytes::parse("0x123"), Err(TypeError::OddLength));
    }

    #[test]
    fn test_parse_rejects_missing_prefix() {
        assert_eq!(Bytes::parse("1234"), Err(TypeError::MissingPrefix));
    }
}
