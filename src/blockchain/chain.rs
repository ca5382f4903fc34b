use parking_lot::Mutex;
use thiserror::Error;
use log::{debug, info, trace};

use std::fmt;
use std::sync::Arc;

use super::block::{genesis_anchor, hash_fields, Block, CANDIDATE_TIMESTAMP};
use super::crypto::{Address, BlockHash, CryptoError, HASH_HEX_LEN};
use super::transaction::Transaction;
use crate::config::ChainConfig;

/// Number of leading zero hex characters a proof must produce
pub const MINING_DIFFICULTY: usize = 3;

/// Sender recorded on mining reward transactions
pub const MINING_SENDER: &str = "THE BLOCKCHAIN";

/// Value credited to the miner for each sealed block
pub const MINING_REWARD: f32 = 1.0;

/// Errors that can occur during blockchain operations
#[derive(Debug, Error)]
pub enum BlockchainError {
    #[error("Chain is empty")]
    EmptyChain,

    #[error("Crypto error: {0}")]
    CryptoError(#[from] CryptoError),

    #[error("Invalid block: {0}")]
    InvalidBlock(String),

    #[error("Invalid chain: {0}")]
    InvalidChain(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("System error: {0}")]
    SystemError(String),
}

/// Represents the blockchain
///
/// Clones share the same chain and transaction pool.
#[derive(Debug, Clone)]
pub struct Blockchain {
    /// The chain of blocks, genesis first
    chain: Arc<Mutex<Vec<Block>>>,

    /// Pending transactions to be included in the next block
    transaction_pool: Arc<Mutex<Vec<Transaction>>>,

    /// Held for the whole of a search and seal, one miner at a time
    mining_lock: Arc<Mutex<()>>,

    /// Address credited with mining rewards
    miner_address: Address,

    /// Mining difficulty (number of leading zeros required in hash)
    difficulty: usize,

    /// Mining reward
    mining_reward: f32,

    /// Sender of reward transactions
    mining_sender: Address,
}

impl Blockchain {
    /// Creates a new blockchain with a genesis block and the default
    /// difficulty and reward
    ///
    /// # Arguments
    ///
    /// * `miner_address` - The address credited with mining rewards
    ///
    /// # Returns
    ///
    /// A new Blockchain instance
    pub fn new(miner_address: impl Into<Address>) -> Result<Self, BlockchainError> {
        Blockchain::with_config(miner_address, &ChainConfig::default())
    }

    /// Creates a new blockchain with a genesis block and the given settings
    pub fn with_config(
        miner_address: impl Into<Address>,
        config: &ChainConfig,
    ) -> Result<Self, BlockchainError> {
        // A wider target than the digest would make every search run forever
        if config.difficulty > HASH_HEX_LEN {
            return Err(BlockchainError::InvalidConfig(format!(
                "difficulty must be at most {}, got {}",
                HASH_HEX_LEN, config.difficulty
            )));
        }

        if !config.mining_reward.is_finite() {
            return Err(BlockchainError::InvalidConfig(
                "mining reward must be a finite number".to_string(),
            ));
        }

        let blockchain = Blockchain {
            chain: Arc::new(Mutex::new(Vec::new())),
            transaction_pool: Arc::new(Mutex::new(Vec::new())),
            mining_lock: Arc::new(Mutex::new(())),
            miner_address: miner_address.into(),
            difficulty: config.difficulty,
            mining_reward: config.mining_reward,
            mining_sender: Address::from(config.mining_sender.as_str()),
        };

        // Create the genesis block
        blockchain.create_block(0, genesis_anchor()?);

        Ok(blockchain)
    }

    /// Creates a new block from the whole transaction pool and appends it
    ///
    /// # Arguments
    ///
    /// * `nonce` - The proof of work for the block
    /// * `previous_hash` - The hash of the previous block
    ///
    /// # Returns
    ///
    /// The appended block
    pub fn create_block(&self, nonce: u64, previous_hash: BlockHash) -> Block {
        let _mining = self.mining_lock.lock();
        let mut chain = self.chain.lock();
        let transactions = std::mem::take(&mut *self.transaction_pool.lock());

        let block = Block::new(nonce, previous_hash, transactions);
        chain.push(block.clone());

        debug!("Created block {} with {} transactions", chain.len() - 1, block.transactions.len());
        block
    }

    /// Gets the last block in the chain
    pub fn last_block(&self) -> Result<Block, BlockchainError> {
        self.chain
            .lock()
            .last()
            .cloned()
            .ok_or(BlockchainError::EmptyChain)
    }

    /// Adds a new transaction to the transaction pool
    ///
    /// # Arguments
    ///
    /// * `sender` - The address of the sender
    /// * `recipient` - The address of the recipient
    /// * `value` - The amount to transfer
    pub fn add_transaction(
        &self,
        sender: impl Into<Address>,
        recipient: impl Into<Address>,
        value: f32,
    ) {
        let transaction = Transaction::new(sender, recipient, value);
        self.transaction_pool.lock().push(transaction);
    }

    /// Copies the transaction pool
    ///
    /// # Returns
    ///
    /// Independent copies of every pending transaction, in pool order
    pub fn copy_pool(&self) -> Vec<Transaction> {
        self.transaction_pool.lock().clone()
    }

    /// Checks whether a nonce solves the proof-of-work puzzle
    ///
    /// Builds a candidate block at `CANDIDATE_TIMESTAMP` from the given
    /// fields and accepts it when the first `difficulty` characters of its
    /// hex hash are '0'.
    pub fn valid_proof(
        nonce: u64,
        previous_hash: &BlockHash,
        transactions: &[Transaction],
        difficulty: usize,
    ) -> Result<bool, BlockchainError> {
        let candidate = hash_fields(nonce, previous_hash, CANDIDATE_TIMESTAMP, transactions)?;
        trace!("nonce={} candidate={}", nonce, candidate);

        Ok(candidate.has_leading_zeros(difficulty))
    }

    /// Searches for a nonce over a snapshot of the transaction pool
    ///
    /// The search is anchored to the last block's previous hash, not to the
    /// last block's own hash.
    ///
    /// # Returns
    ///
    /// The first nonce, counting up from 0, that passes `valid_proof`
    pub fn proof_of_work(&self) -> Result<u64, BlockchainError> {
        self.solve().map(|(nonce, _)| nonce)
    }

    /// Runs the search and returns the nonce with the snapshot it covers
    fn solve(&self) -> Result<(u64, Vec<Transaction>), BlockchainError> {
        let transactions = self.copy_pool();
        let previous_hash = self.last_block()?.previous_hash;

        let mut nonce = 0;
        while !Blockchain::valid_proof(nonce, &previous_hash, &transactions, self.difficulty)? {
            nonce += 1;
        }

        Ok((nonce, transactions))
    }

    /// Mines a new block with the pending transactions
    ///
    /// Adds the reward transaction to the pool, solves the proof of work and
    /// seals the block on top of the current last block.
    ///
    /// # Returns
    ///
    /// The newly mined block
    pub fn mine_block(&self) -> Result<Block, BlockchainError> {
        let _mining = self.mining_lock.lock();

        self.add_transaction(
            self.mining_sender.clone(),
            self.miner_address.clone(),
            self.mining_reward,
        );

        let (nonce, transactions) = self.solve()?;
        let block = self.seal_block(nonce, transactions)?;

        info!("action=mining, status=success");
        Ok(block)
    }

    /// Mines a new block and reports success
    pub fn mining(&self) -> Result<bool, BlockchainError> {
        self.mine_block().map(|_| true)
    }

    /// Appends a block holding exactly the searched snapshot
    ///
    /// The snapshot is always a prefix of the pool, since the pool only
    /// grows while the mining lock is held. Anything added during the
    /// search stays pending.
    fn seal_block(
        &self,
        nonce: u64,
        transactions: Vec<Transaction>,
    ) -> Result<Block, BlockchainError> {
        let mut chain = self.chain.lock();
        let previous_hash = chain.last().ok_or(BlockchainError::EmptyChain)?.hash()?;

        {
            let mut pool = self.transaction_pool.lock();
            let sealed = transactions.len().min(pool.len());
            pool.drain(..sealed);
        }

        let block = Block::new(nonce, previous_hash, transactions);
        chain.push(block.clone());

        debug!("Sealed block {} with nonce {}", chain.len() - 1, nonce);
        Ok(block)
    }

    /// Calculates the balance of an address by replaying the whole chain
    ///
    /// # Arguments
    ///
    /// * `address` - The address to total up
    ///
    /// # Returns
    ///
    /// Received value minus sent value over every block
    pub fn calculate_total_amount(&self, address: &str) -> f32 {
        let chain = self.chain.lock();

        chain
            .iter()
            .flat_map(|block| block.transactions.iter())
            .map(|transaction| transaction.balance_delta(address))
            .sum()
    }

    /// Gets the entire blockchain
    pub fn get_chain(&self) -> Vec<Block> {
        self.chain.lock().clone()
    }

    /// Number of blocks in the chain
    pub fn len(&self) -> usize {
        self.chain.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.lock().is_empty()
    }

    pub fn miner_address(&self) -> &Address {
        &self.miner_address
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    /// Validates the blockchain
    ///
    /// The genesis block must be anchored to `genesis_anchor`.
    /// Every later block must link to the hash of its predecessor and carry
    /// a nonce that passes `valid_proof` against the predecessor's previous
    /// hash, the same anchor the search used.
    pub fn validate(&self) -> Result<(), BlockchainError> {
        let chain = self.chain.lock();

        let genesis = chain.first().ok_or(BlockchainError::EmptyChain)?;
        if genesis.previous_hash != genesis_anchor()? {
            return Err(BlockchainError::InvalidChain(
                "genesis block is not anchored to the zero block".to_string(),
            ));
        }

        for (index, pair) in chain.windows(2).enumerate() {
            let (previous_block, current_block) = (&pair[0], &pair[1]);
            let index = index + 1;

            if current_block.previous_hash != previous_block.hash()? {
                return Err(BlockchainError::InvalidChain(format!(
                    "block {} does not link to block {}",
                    index,
                    index - 1
                )));
            }

            if !Blockchain::valid_proof(
                current_block.nonce,
                &previous_block.previous_hash,
                &current_block.transactions,
                self.difficulty,
            )? {
                return Err(BlockchainError::InvalidBlock(format!(
                    "block {} fails proof of work",
                    index
                )));
            }
        }

        Ok(())
    }

    /// Validates the blockchain
    ///
    /// # Returns
    ///
    /// true if the blockchain is valid, false otherwise
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

impl fmt::Display for Blockchain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let chain = self.chain.lock();
        let rule = "=".repeat(25);

        for (index, block) in chain.iter().enumerate() {
            writeln!(f, "{} Chain {} {}", rule, index, rule)?;
            writeln!(f, "{}", block)?;
        }
        write!(f, "{}", "*".repeat(60))
    }
}
