//! Content digest used to key every blob (BLAKE3, 32 bytes).
//!
//! Implementation from Iroh (MIT OR Apache-2.0)
//! https://github.com/n0-computer/iroh-blobs/blob/main/src/hash.rs

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

/// BLAKE3 digest of a blob's exact byte sequence.
#[derive(Clone, Copy, Hash, PartialEq, Eq)]
pub struct Hash(blake3::Hash);

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Hash").field(&self.to_hex()).finish()
    }
}

impl Hash {
    /// The digest of the empty byte sequence (`b""`).
    pub const EMPTY: Hash = Hash::from_bytes([
        175, 19, 73, 185, 245, 249, 161, 166, 160, 64, 77, 234, 54, 220, 201, 73, 155, 203, 37,
        201, 173, 193, 18, 183, 204, 154, 147, 202, 228, 31, 50, 98,
    ]);

    /// Digest length in bytes.
    pub const SIZE: usize = 32;

    /// Hashes `buf`.
    pub fn new(buf: impl AsRef<[u8]>) -> Self {
        Hash(blake3::hash(buf.as_ref()))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(blake3::Hash::from_bytes(bytes))
    }

    /// Lowercase hex, 64 characters.
    pub fn to_hex(&self) -> String {
        self.0.to_hex().to_string()
    }

    /// Parses the 64 character hex form produced by [`Hash::to_hex`].
    pub fn from_hex(s: &str) -> Result<Self, HashParseError> {
        blake3::Hash::from_hex(s)
            .map(Hash)
            .map_err(|_| HashParseError(s.to_owned()))
    }

    /// First 6 bytes as hex, for log lines.
    pub fn fmt_short(&self) -> String {
        data_encoding::HEXLOWER.encode(&self.as_bytes()[..6])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid content hash: {0:?}")]
pub struct HashParseError(String);

impl FromStr for Hash {
    type Err = HashParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Hash::from_hex(s)
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl From<blake3::Hash> for Hash {
    fn from(value: blake3::Hash) -> Self {
        Hash(value)
    }
}

impl From<[u8; 32]> for Hash {
    fn from(value: [u8; 32]) -> Self {
        Hash::from_bytes(value)
    }
}

impl From<Hash> for [u8; 32] {
    fn from(value: Hash) -> Self {
        *value.as_bytes()
    }
}

impl PartialOrd for Hash {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Hash {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_bytes().cmp(other.as_bytes())
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// Hex on the wire keeps persisted logs readable.
impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Hash::from_hex(&s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_matches_constant() {
        assert_eq!(Hash::new(b""), Hash::EMPTY);
    }

    #[test]
    fn known_value() {
        let hash = Hash::new(b"hello");
        assert_eq!(
            hash.to_hex(),
            "ea8f163db38682925e4491c5e58d4bb3506ef8c14eb78a86e908c5624a67200f"
        );
    }

    #[test]
    fn parses_own_hex() {
        let hash = Hash::new(b"some content");
        let parsed: Hash = hash.to_hex().parse().unwrap();
        assert_eq!(parsed, hash);
    }

    #[test]
    fn rejects_malformed_hex() {
        assert!(Hash::from_hex("abc").is_err());
        assert!(Hash::from_hex(&"zz".repeat(32)).is_err());
    }

    #[test]
    fn short_form_is_prefix() {
        let hash = Hash::new(b"hello");
        let short = hash.fmt_short();
        assert_eq!(short.len(), 12);
        assert!(hash.to_hex().starts_with(&short));
    }

    #[test]
    fn ordering_follows_bytes() {
        let low = Hash::from_bytes([0u8; 32]);
        let high = Hash::from_bytes([0xff; 32]);
        assert!(low < high);
    }

    #[test]
    fn different_content_different_hash() {
        assert_ne!(Hash::new(b"a"), Hash::new(b"b"));
    }
}
