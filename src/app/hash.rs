//! SHA-256 digest type
//!
//! Stores a digest as its raw 32-byte value and renders it as the lowercase
//! hex string used in registry manifests.

use std::fmt;

use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};

/// A SHA-256 digest stored as raw bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sha256Hash([u8; 32]);

impl Sha256Hash {
    /// Compute the digest of an in-memory buffer
    pub fn digest(data: &[u8]) -> Self {
        Self::from_hasher(Sha256::new_with_prefix(data))
    }

    /// Finalize a running hasher into a digest
    pub fn from_hasher(hasher: Sha256) -> Self {
        Sha256Hash(hasher.finalize().into())
    }

    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Sha256Hash(bytes)
    }

    /// Get the raw byte array representation
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase 64-character hexadecimal representation
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Compare against a registry hash string.
    ///
    /// The comparison is exact: registry hashes are expected in lowercase,
    /// and an upper-case or truncated value never matches.
    pub fn matches(&self, expected: &str) -> bool {
        self.to_hex() == expected
    }
}

impl fmt::Display for Sha256Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Sha256Hash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}
