//! A single-node proof-of-work ledger
//!
//! Blocks of value transfers are linked by SHA-256 hash and sealed by a
//! leading-zero puzzle. Balances are computed by replaying the chain.

pub mod blockchain;
pub mod config;
pub mod miner;

pub use blockchain::{
    Address, Block, BlockHash, Blockchain, BlockchainError, CryptoError, Transaction,
    MINING_DIFFICULTY, MINING_REWARD, MINING_SENDER,
};
pub use config::{ChainConfig, Config, ConfigError, MinerConfig};
