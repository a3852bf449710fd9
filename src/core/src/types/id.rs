//! Content-addressed identifiers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier length in bytes
pub const ID_LEN: usize = 32;

/// 32-byte identifier, normally the BLAKE3 hash of the bytes it names
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Id(pub [u8; ID_LEN]);

/// Identifier of a DAG vertex (hash of its encoding)
pub type VertexId = Id;

/// Identifier of a transition (hash of its encoding, computed by the VM)
pub type TransitionId = Id;

impl Id {
    /// The all-zero identifier
    pub const EMPTY: Id = Id([0u8; ID_LEN]);

    /// Create a new ID from bytes
    pub fn new(bytes: [u8; ID_LEN]) -> Self {
        Id(bytes)
    }

    /// Compute the ID of `data`
    pub fn from_data(data: &[u8]) -> Self {
        let hash = blake3::hash(data);
        Id(*hash.as_bytes())
    }

    /// Create an ID from a slice
    pub fn from_slice(slice: &[u8]) -> crate::Result<Self> {
        if slice.len() != ID_LEN {
            return Err(crate::error::CoreError::invalid(format!(
                "Id must be {} bytes, got {}",
                ID_LEN,
                slice.len()
            )));
        }
        let mut bytes = [0u8; ID_LEN];
        bytes.copy_from_slice(slice);
        Ok(Id(bytes))
    }

    /// Parse a full-length hex string
    pub fn from_hex(s: &str) -> crate::Result<Self> {
        let bytes = hex::decode(s)
            .map_err(|e| crate::error::CoreError::invalid(format!("Invalid hex id: {}", e)))?;
        Self::from_slice(&bytes)
    }

    /// Derive a new ID by hashing `prefix` in front of this one.
    ///
    /// Handy for minting distinct, deterministic IDs from a single seed.
    pub fn prefix(&self, prefix: u64) -> Id {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&prefix.to_be_bytes());
        hasher.update(&self.0);
        Id(*hasher.finalize().as_bytes())
    }

    /// Get the ID as bytes
    pub fn as_bytes(&self) -> &[u8; ID_LEN] {
        &self.0
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Whether this is the all-zero ID
    pub fn is_empty(&self) -> bool {
        self.0 == [0u8; ID_LEN]
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..8])
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.to_hex())
    }
}

impl AsRef<[u8]> for Id {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; ID_LEN]> for Id {
    fn from(bytes: [u8; ID_LEN]) -> Self {
        Id(bytes)
    }
}
