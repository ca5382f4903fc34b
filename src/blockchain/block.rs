use chrono::Utc;
use serde::{Deserialize, Serialize};

use std::fmt;

use super::crypto::{sha256_json, BlockHash, CryptoError};
use super::transaction::Transaction;

/// Timestamp given to the candidate blocks built during proof-of-work
///
/// Every trial of a search uses it, so the same inputs always produce the
/// same nonce.
pub const CANDIDATE_TIMESTAMP: i64 = 0;

/// Represents a block in the blockchain
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Proof of work (nonce)
    pub nonce: u64,

    /// Hash of the previous block
    pub previous_hash: BlockHash,

    /// Creation time in nanoseconds since the Unix epoch
    pub timestamp: i64,

    /// Transactions included in this block, in insertion order
    pub transactions: Vec<Transaction>,
}

/// Borrowed view with the same encoding as `Block`
///
/// Lets the proof-of-work search hash a candidate without cloning the
/// transaction snapshot on every trial.
#[derive(Serialize)]
struct BlockView<'a> {
    nonce: u64,
    previous_hash: &'a BlockHash,
    timestamp: i64,
    transactions: Option<&'a [Transaction]>,
}

/// Hashes the canonical encoding of a block's fields
pub fn hash_fields(
    nonce: u64,
    previous_hash: &BlockHash,
    timestamp: i64,
    transactions: &[Transaction],
) -> Result<BlockHash, CryptoError> {
    sha256_json(&BlockView {
        nonce,
        previous_hash,
        timestamp,
        transactions: Some(transactions),
    })
}

/// Hash every chain's genesis block points back to
///
/// This is the zero block with no transaction list at all, which encodes as
/// `"transactions":null` rather than an empty array.
pub fn genesis_anchor() -> Result<BlockHash, CryptoError> {
    sha256_json(&BlockView {
        nonce: 0,
        previous_hash: &BlockHash::default(),
        timestamp: 0,
        transactions: None,
    })
}

/// Current wall-clock time in nanoseconds
fn now_nanos() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
}

impl Block {
    /// Creates a new block stamped with the current time
    ///
    /// # Arguments
    ///
    /// * `nonce` - The proof of work
    /// * `previous_hash` - The hash of the previous block
    /// * `transactions` - The transactions to include in the block
    ///
    /// # Returns
    ///
    /// A new Block instance
    pub fn new(nonce: u64, previous_hash: BlockHash, transactions: Vec<Transaction>) -> Self {
        Block::with_timestamp(nonce, previous_hash, now_nanos(), transactions)
    }

    /// Creates a block with an explicit timestamp
    pub fn with_timestamp(
        nonce: u64,
        previous_hash: BlockHash,
        timestamp: i64,
        transactions: Vec<Transaction>,
    ) -> Self {
        Block {
            nonce,
            previous_hash,
            timestamp,
            transactions,
        }
    }

    /// Calculates the hash of the block
    ///
    /// Covers the nonce, previous hash, timestamp and transactions, so two
    /// blocks differing only in timestamp hash differently.
    ///
    /// # Returns
    ///
    /// The SHA-256 digest of the block's canonical JSON encoding
    pub fn hash(&self) -> Result<BlockHash, CryptoError> {
        hash_fields(
            self.nonce,
            &self.previous_hash,
            self.timestamp,
            &self.transactions,
        )
    }

    /// Encodes the block in its serialized format
    pub fn to_json(&self) -> Result<String, CryptoError> {
        serde_json::to_string(self).map_err(|e| CryptoError::SerializationError(e.to_string()))
    }

    /// Decodes a block from its serialized format
    pub fn from_json(json: &str) -> Result<Self, CryptoError> {
        serde_json::from_str(json).map_err(|e| CryptoError::SerializationError(e.to_string()))
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "nonce: {}", self.nonce)?;
        writeln!(f, "previous_hash: {}", self.previous_hash)?;
        writeln!(f, "timestamp: {}", self.timestamp)?;
        write!(f, "transactions: {}", self.transactions.len())?;
        for transaction in &self.transactions {
            write!(f, "\n{}", transaction)?;
        }
        Ok(())
    }
}
