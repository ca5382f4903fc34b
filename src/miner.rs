//! Background mining
//!
//! The proof-of-work search is CPU-bound and blocking, so it runs on tokio's
//! blocking pool rather than on an async worker thread.

use log::{debug, info, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use std::time::Duration;

use crate::blockchain::{Block, Blockchain, BlockchainError};

/// Mines one block on the blocking pool
pub fn spawn_mining(blockchain: Blockchain) -> JoinHandle<Result<Block, BlockchainError>> {
    tokio::task::spawn_blocking(move || blockchain.mine_block())
}

/// Mines a block once per interval until told to stop
pub struct Miner {
    blockchain: Blockchain,
    interval: Duration,
}

impl Miner {
    pub fn new(blockchain: Blockchain, interval: Duration) -> Self {
        Miner {
            blockchain,
            interval,
        }
    }

    /// Runs until `shutdown` turns true or its sender is dropped
    ///
    /// A search in progress always runs to completion before shutdown is
    /// checked again.
    ///
    /// # Returns
    ///
    /// The number of blocks mined
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<u64, BlockchainError> {
        let mut ticker = tokio::time::interval(self.interval);
        let mut mined = 0;

        info!(
            "Miner started for {} every {:?}",
            self.blockchain.miner_address(),
            self.interval
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let block = spawn_mining(self.blockchain.clone())
                        .await
                        .map_err(|e| BlockchainError::SystemError(e.to_string()))??;

                    mined += 1;
                    debug!(
                        "Mined block with nonce {} and {} transactions",
                        block.nonce,
                        block.transactions.len()
                    );
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        warn!("Miner shutdown channel closed");
                        break;
                    }
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Miner stopped after {} blocks", mined);
        Ok(mined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChainConfig;

    fn fast_blockchain() -> Blockchain {
        let config = ChainConfig {
            difficulty: 1,
            ..ChainConfig::default()
        };
        Blockchain::with_config("M", &config).unwrap()
    }

    #[tokio::test]
    async fn test_spawn_mining() {
        let blockchain = fast_blockchain();
        blockchain.add_transaction("A", "B", 5.0);

        let block = spawn_mining(blockchain.clone()).await.unwrap().unwrap();

        assert_eq!(block.transactions.len(), 2);
        assert_eq!(blockchain.len(), 2);
        assert_eq!(blockchain.calculate_total_amount("M"), 1.0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_miner_runs_until_shutdown() {
        let blockchain = fast_blockchain();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let miner = Miner::new(blockchain.clone(), Duration::from_millis(10));
        let handle = tokio::spawn(miner.run(shutdown_rx));

        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        while blockchain.len() < 3 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        shutdown_tx.send(true).unwrap();
        let mined = handle.await.unwrap().unwrap();

        assert!(mined >= 2);
        assert_eq!(blockchain.len() as u64, mined + 1);
        assert!(blockchain.is_valid());
    }

    #[tokio::test]
    async fn test_miner_stops_when_sender_dropped() {
        let blockchain = fast_blockchain();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        drop(shutdown_tx);

        let miner = Miner::new(blockchain, Duration::from_secs(3600));
        let mined = miner.run(shutdown_rx).await.unwrap();

        // The first tick fires immediately, so at most one block is mined
        assert!(mined <= 1);
    }
}
