//! 32-byte identifier type.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::cb58::{decode_cb58, encode_cb58, Cb58Error};
use crate::hashing::compute_hash256;
use crate::ID_LEN;

/// A 32-byte (256-bit) identifier.
///
/// Ids name transactions, vertices, UTXOs, and chains. They are typically
/// the SHA-256 hash of the entity's serialization and render as CB58
/// strings.
///
/// # Examples
///
/// ```
/// use snow_ids::Id;
///
/// let id = Id::from_hash(b"some transaction bytes");
/// assert!(!id.is_empty());
///
/// let parsed: Id = id.to_string().parse().unwrap();
/// assert_eq!(id, parsed);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Id([u8; ID_LEN]);

/// Errors that can occur when parsing an ID.
#[derive(Debug, Error)]
pub enum IdError {
    /// The CB58 decoding failed.
    #[error("cb58 decoding failed: {0}")]
    Cb58(#[from] Cb58Error),

    /// The decoded bytes have the wrong length.
    #[error("invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

impl Id {
    /// The empty (zero) ID.
    pub const EMPTY: Self = Self([0u8; ID_LEN]);

    /// Creates an ID from a 32-byte array.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Creates an ID from a slice.
    ///
    /// # Errors
    ///
    /// Returns `IdError::InvalidLength` if the slice is not exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, IdError> {
        if bytes.len() != ID_LEN {
            return Err(IdError::InvalidLength {
                expected: ID_LEN,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; ID_LEN];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    /// Computes an ID as the SHA-256 hash of the given bytes.
    #[must_use]
    pub fn from_hash(bytes: &[u8]) -> Self {
        Self(compute_hash256(bytes))
    }

    /// Returns the ID as a byte array reference.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; ID_LEN] {
        &self.0
    }

    /// Returns true if this is the empty (zero) ID.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0 == [0u8; ID_LEN]
    }

    /// Returns the hex-encoded representation of this ID.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match encode_cb58(&self.0) {
            Ok(s) => write!(f, "{s}"),
            Err(_) => write!(f, "<invalid>"),
        }
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self)
    }
}

impl FromStr for Id {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = decode_cb58(s)?;
        Self::from_slice(&bytes)
    }
}

impl PartialOrd for Id {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Id {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl AsRef<[u8]> for Id {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; ID_LEN]> for Id {
    fn from(bytes: [u8; ID_LEN]) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<Id> for [u8; ID_LEN] {
    fn from(id: Id) -> Self {
        id.0
    }
}

impl Serialize for Id {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if serializer.is_human_readable() {
            let s = encode_cb58(&self.0).map_err(serde::ser::Error::custom)?;
            serializer.serialize_str(&s)
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            s.parse().map_err(serde::de::Error::custom)
        } else {
            let bytes = <Vec<u8>>::deserialize(deserializer)?;
            Self::from_slice(&bytes).map_err(serde::de::Error::custom)
        }
    }
}
