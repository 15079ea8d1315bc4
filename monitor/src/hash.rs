//! # Hashing Utilities
//!
//! The 32-byte digest type used for block, transaction and log identities,
//! plus the BLAKE3 helpers used to fabricate them.
//!
//! Hashes arriving from a real feed are opaque: the window only ever compares
//! them. BLAKE3 is used when this crate has to produce a hash itself (test
//! chains, the replay tool's synthetic blocks), never to re-verify a hash a
//! feed reported.
//!
//! On the wire (JSON feeds) a hash is a `0x`-prefixed lowercase hex string.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Length of every digest in bytes.
pub const HASH_LENGTH: usize = 32;

/// Errors produced when parsing a hash from its hex form.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HashParseError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid hash length: expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },
}

/// A 32-byte block, transaction or topic hash.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct H256(pub [u8; HASH_LENGTH]);

impl H256 {
    /// The all-zero hash. Used as the parent of a genesis block.
    pub const ZERO: H256 = H256([0u8; HASH_LENGTH]);

    /// Borrow the raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_LENGTH] {
        &self.0
    }

    /// `0x`-prefixed lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Abbreviated rendering for log lines: `0x1234…cdef`.
    pub fn short(&self) -> String {
        let full = hex::encode(self.0);
        format!("0x{}…{}", &full[..4], &full[full.len() - 4..])
    }
}

impl From<[u8; HASH_LENGTH]> for H256 {
    fn from(bytes: [u8; HASH_LENGTH]) -> Self {
        H256(bytes)
    }
}

impl fmt::Display for H256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for H256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "H256({})", self.short())
    }
}

impl FromStr for H256 {
    type Err = HashParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits).map_err(|e| HashParseError::InvalidHex(e.to_string()))?;
        let array: [u8; HASH_LENGTH] =
            bytes
                .as_slice()
                .try_into()
                .map_err(|_| HashParseError::InvalidLength {
                    expected: HASH_LENGTH,
                    got: bytes.len(),
                })?;
        Ok(H256(array))
    }
}

impl Serialize for H256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for H256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Compute the BLAKE3 hash of the input data.
pub fn blake3_hash(data: &[u8]) -> H256 {
    H256(*blake3::hash(data).as_bytes())
}

/// Hash multiple byte slices together without concatenating them first.
pub fn blake3_hash_multi(parts: &[&[u8]]) -> H256 {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    H256(*hasher.finalize().as_bytes())
}

/// Serde adapter for `Vec<u8>` fields carried as `0x`-prefixed hex.
pub mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s.strip_prefix("0x").unwrap_or(&s)).map_err(serde::de::Error::custom)
    }
}
