use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use std::fmt;

/// Number of hex characters in a rendered SHA-256 digest
pub const HASH_HEX_LEN: usize = 64;

/// Errors that can occur while hashing ledger data
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Identifier of an account on the ledger
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address(pub String);

impl Address {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Address(s.to_string())
    }
}

impl From<String> for Address {
    fn from(s: String) -> Self {
        Address(s)
    }
}

/// A SHA-256 digest with value semantics
///
/// Serializes as an array of 32 integers, the same shape a fixed-size byte
/// array takes in the canonical block encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockHash(pub [u8; 32]);

impl BlockHash {
    /// Renders the digest as lowercase hexadecimal
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Checks that the first `difficulty` hex characters are all '0'
    ///
    /// A difficulty wider than the digest can never be met.
    pub fn has_leading_zeros(&self, difficulty: usize) -> bool {
        if difficulty > HASH_HEX_LEN {
            return false;
        }

        self.to_hex().bytes().take(difficulty).all(|c| c == b'0')
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Hashes the canonical JSON encoding of a value
///
/// Struct fields are encoded in declaration order, so any type hashed here
/// must keep its field order stable.
pub fn sha256_json<T: Serialize + ?Sized>(value: &T) -> Result<BlockHash, CryptoError> {
    let encoded = serde_json::to_vec(value)
        .map_err(|e| CryptoError::SerializationError(e.to_string()))?;

    let mut hasher = Sha256::new();
    hasher.update(&encoded);

    Ok(BlockHash(hasher.finalize().into()))
}
