// Blockchain module
//
// This module contains the core ledger implementation including:
// - Block structure
// - Blockchain structure
// - Transaction structure
// - Hashing utilities
// - Proof of work algorithm

pub mod block;
pub mod chain;
pub mod crypto;
pub mod transaction;

// Re-export main components for easier access
pub use block::Block;
pub use chain::{Blockchain, BlockchainError, MINING_DIFFICULTY, MINING_REWARD, MINING_SENDER};
pub use crypto::{Address, BlockHash, CryptoError};
pub use transaction::Transaction;
