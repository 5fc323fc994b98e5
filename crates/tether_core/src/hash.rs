//! Content hashing for change detection.

use crate::error::{Result, TetherError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 32-byte BLAKE3 hash of an entity's content body.
///
/// Hashes are computed over the front-matter-stripped markdown body, so
/// edits to cosmetic metadata (status lines, timestamps written back by
/// `pull`) never register as content changes.
///
/// # Examples
///
/// ```
/// use tether_core::ContentHash;
///
/// let a = ContentHash::of_body("# Title\n\nBody");
/// let b = ContentHash::of_body("# Title\n\nBody");
/// assert_eq!(a, b);
/// assert_eq!(a.as_hex().len(), 64);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(#[serde(with = "hex_bytes")] [u8; 32]);

impl ContentHash {
    /// The length of a ContentHash as a hex string.
    pub const HEX_LEN: usize = 64;

    /// Creates a ContentHash from raw bytes.
    #[inline]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns a reference to the underlying 32-byte BLAKE3 hash.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Computes the hash of a content body.
    pub fn of_body(body: &str) -> Self {
        let hash = blake3::hash(body.as_bytes());
        Self(*hash.as_bytes())
    }

    /// Returns this hash as a lowercase hex string (always 64 characters).
    pub fn as_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses a ContentHash from a hex string.
    ///
    /// # Errors
    ///
    /// Returns `TetherError::InvalidHex` if the string is not valid hex
    /// or is not exactly 64 characters long.
    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.len() != Self::HEX_LEN {
            return Err(TetherError::InvalidHex(format!(
                "expected {} hex chars, got {}",
                Self::HEX_LEN,
                s.len()
            )));
        }

        let bytes = hex::decode(s).map_err(|e| TetherError::InvalidHex(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| TetherError::InvalidHex("invalid length".to_string()))?;

        Ok(Self(arr))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_hex())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({}...)", &self.as_hex()[..12])
    }
}

/// Serde helper: serialize the 32-byte array as a hex string so the
/// sync-state file stays human-inspectable.
mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(de)?;
        let v = hex::decode(&s).map_err(serde::de::Error::custom)?;
        v.try_into()
            .map_err(|_| serde::de::Error::custom("expected 32 bytes"))
    }
}
