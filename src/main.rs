use anyhow::Context;
use log::info;

use std::io::Write;
use std::path::PathBuf;

use mini_ledger::config;
use mini_ledger::miner::spawn_mining;
use mini_ledger::Blockchain;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::new().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(buf, "Blockchain: {} {}", record.level(), record.args())
        })
        .init();

    let config_path = std::env::var("LEDGER_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("ledger.toml"));
    let config = config::load_config(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;

    let miner_address = config.miner.address.clone();
    let blockchain = Blockchain::with_config(miner_address.as_str(), &config.chain)?;
    info!("Initialized chain for miner {}", miner_address);
    println!("{}", blockchain);

    blockchain.add_transaction("Gaethje", "Poirier", 2.01);
    blockchain.add_transaction("Khabib", "Mcgregor", 10.187);
    spawn_mining(blockchain.clone()).await??;
    println!("{}", blockchain);

    blockchain.add_transaction("Chandler", "Oliveira", 2.01);
    blockchain.add_transaction("Khabib", "Mcgregor", 10.187);
    spawn_mining(blockchain.clone()).await??;
    println!("{}", blockchain);

    println!(
        "{}: {:.1}",
        miner_address,
        blockchain.calculate_total_amount(&miner_address)
    );

    if !blockchain.is_valid() {
        anyhow::bail!("mined chain failed validation");
    }

    Ok(())
}
