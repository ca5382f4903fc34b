//! Configuration management for the ledger

use log::info;
use serde::Deserialize;
use thiserror::Error;

use std::fs;
use std::path::Path;

use crate::blockchain::chain::{MINING_DIFFICULTY, MINING_REWARD, MINING_SENDER};
use crate::blockchain::crypto::HASH_HEX_LEN;

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub miner: MinerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    #[serde(default = "default_difficulty")]
    pub difficulty: usize,
    #[serde(default = "default_mining_reward")]
    pub mining_reward: f32,
    #[serde(default = "default_mining_sender")]
    pub mining_sender: String,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            difficulty: default_difficulty(),
            mining_reward: default_mining_reward(),
            mining_sender: default_mining_sender(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MinerConfig {
    #[serde(default = "default_miner_address")]
    pub address: String,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            address: default_miner_address(),
            interval_secs: default_interval_secs(),
        }
    }
}

fn default_difficulty() -> usize {
    MINING_DIFFICULTY
}

fn default_mining_reward() -> f32 {
    MINING_REWARD
}

fn default_mining_sender() -> String {
    MINING_SENDER.to_string()
}

fn default_miner_address() -> String {
    "My_Blockchain_Miner_Address".to_string()
}

fn default_interval_secs() -> u64 {
    10
}

impl Config {
    /// Parses and validates a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chain.difficulty > HASH_HEX_LEN {
            return Err(ConfigError::Invalid(format!(
                "chain.difficulty must be at most {}, got {}",
                HASH_HEX_LEN, self.chain.difficulty
            )));
        }

        if !self.chain.mining_reward.is_finite() {
            return Err(ConfigError::Invalid(
                "chain.mining_reward must be a finite number".to_string(),
            ));
        }

        if self.chain.mining_sender.is_empty() {
            return Err(ConfigError::Invalid("chain.mining_sender must be set".to_string()));
        }

        if self.miner.address.is_empty() {
            return Err(ConfigError::Invalid("miner.address must be set".to_string()));
        }

        if self.miner.interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "miner.interval_secs must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Loads configuration from a TOML file, falling back to defaults when the
/// file does not exist
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        info!("No config at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    let config_str = fs::read_to_string(path)?;
    Config::from_toml_str(&config_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert_eq!(config.chain.difficulty, 3);
        assert_eq!(config.chain.mining_reward, 1.0);
        assert_eq!(config.chain.mining_sender, "THE BLOCKCHAIN");
        assert_eq!(config.miner.interval_secs, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_document_uses_defaults() {
        let config = Config::from_toml_str(
            r#"
            [chain]
            difficulty = 2

            [miner]
            address = "miner-1"
            "#,
        )
        .unwrap();

        assert_eq!(config.chain.difficulty, 2);
        assert_eq!(config.chain.mining_reward, 1.0);
        assert_eq!(config.miner.address, "miner-1");
        assert_eq!(config.miner.interval_secs, 10);
    }

    #[test]
    fn test_empty_document() {
        let config = Config::from_toml_str("").unwrap();

        assert_eq!(config.chain.difficulty, MINING_DIFFICULTY);
    }

    #[test]
    fn test_rejects_unreachable_difficulty() {
        let result = Config::from_toml_str("[chain]\ndifficulty = 65\n");

        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_empty_miner_address() {
        let result = Config::from_toml_str("[miner]\naddress = \"\"\n");

        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_malformed_toml() {
        let result = Config::from_toml_str("[chain\ndifficulty = ");

        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("mini-ledger-missing-config.toml");

        let config = load_config(&path).unwrap();
        assert_eq!(config.miner.address, "My_Blockchain_Miner_Address");
    }
}
