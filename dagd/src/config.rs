use consensus::process::sync::SyncConfig;
use consensus_core::config::params::Params;
use consensus_core::{Amount, NetworkType};
use database::DbConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub network: NetworkConfig,
    pub consensus: ConsensusConfig,
    pub sync: SyncConfig,
    pub storage: StorageConfig,
    pub p2p: P2PConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub network_id: String,
}

/// Overrides applied on top of the network's consensus parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusConfig {
    /// Height where the main-block reward drops; network default when unset
    pub reward_fork_height: Option<u64>,
    pub confirmation_depth: u64,
    /// Minimum fee in nano units
    pub min_fee: u64,
    pub max_block_fields: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub in_memory: bool,
    pub db: DbConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct P2PConfig {
    pub listen_address: String,
    pub port: u16,
    pub bootstrap_peers: Vec<String>,
}

impl Config {
    /// Load configuration from file if it exists, otherwise use defaults
    pub fn load(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path).map_err(|e| format!("Failed to read config file: {}", e))?;
        toml::from_str(&content).map_err(|e| format!("Failed to parse config: {}", e))
    }

    /// Load default configuration for network
    pub fn for_network(network: &str) -> Result<Self, String> {
        let kind: NetworkType = network.parse().map_err(|_| format!("Unknown network: {}", network))?;
        let mut config = Config::default();
        config.network.network_id = kind.to_string();
        config.p2p.port = default_port(kind);
        config.storage.data_dir = PathBuf::from("./data").join(kind.to_string());
        Ok(config)
    }

    /// Override config with CLI arguments
    pub fn apply_cli_overrides(&mut self, args: &crate::cli::Args) {
        if let Some(data_dir) = &args.data_dir {
            self.storage.data_dir = data_dir.clone();
        }

        if let Some(p2p_port) = args.p2p_port {
            self.p2p.port = p2p_port;
        }

        if args.in_memory {
            self.storage.in_memory = true;
        }

        if let Some(peers) = &args.bootstrap_peers {
            self.p2p.bootstrap_peers =
                peers.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
        }
    }

    pub fn network_type(&self) -> Result<NetworkType, String> {
        self.network.network_id.parse().map_err(|_| format!("Unknown network: {}", self.network.network_id))
    }

    /// Consensus parameters for the configured network with overrides applied
    pub fn params(&self) -> Result<Params, String> {
        let mut params = Params::for_network(self.network_type()?);
        if let Some(height) = self.consensus.reward_fork_height {
            params.reward_fork_height = height;
        }
        params.confirmation_depth = self.consensus.confirmation_depth;
        params.min_fee = Amount::from_units(self.consensus.min_fee);
        params.max_block_fields = self.consensus.max_block_fields;
        Ok(params)
    }
}

fn default_port(network: NetworkType) -> u16 {
    match network {
        NetworkType::Mainnet => 16111,
        NetworkType::Testnet => 16211,
        NetworkType::Devnet => 16311,
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self { network_id: NetworkType::Mainnet.to_string() }
    }
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        let params = Params::mainnet();
        Self {
            reward_fork_height: None,
            confirmation_depth: params.confirmation_depth,
            min_fee: params.min_fee.units(),
            max_block_fields: params.max_block_fields,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { data_dir: PathBuf::from("./data"), in_memory: false, db: DbConfig::default() }
    }
}

impl Default for P2PConfig {
    fn default() -> Self {
        Self { listen_address: "0.0.0.0".to_string(), port: default_port(NetworkType::Mainnet), bootstrap_peers: vec![] }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use consensus_core::constants::DEVNET_REWARD_FORK_HEIGHT;
    use std::time::Duration;

    #[test]
    fn network_defaults_feed_params() {
        let config = Config::for_network("devnet").unwrap();
        let params = config.params().unwrap();
        assert_eq!(params.network, NetworkType::Devnet);
        assert_eq!(params.reward_fork_height, DEVNET_REWARD_FORK_HEIGHT);
        assert_eq!(params.min_fee, Amount::from_milli(100));
        assert!(Config::for_network("moonnet").is_err());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [network]
            network_id = "testnet"

            [consensus]
            reward_fork_height = 50

            [sync]
            period = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.network_type().unwrap(), NetworkType::Testnet);
        assert_eq!(config.params().unwrap().reward_fork_height, 50);
        assert_eq!(config.sync.period, Duration::from_secs(5));
        assert_eq!(config.sync.initial_delay, Duration::from_secs(32));
        assert_eq!(config.consensus.max_block_fields, 16);
    }

    #[test]
    fn cli_overrides_win() {
        let mut config = Config::default();
        let args = Args {
            p2p_port: Some(9000),
            bootstrap_peers: Some("10.0.0.1:16111, 10.0.0.2:16111,".to_string()),
            in_memory: true,
            ..Args::default()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.p2p.port, 9000);
        assert_eq!(config.p2p.bootstrap_peers.len(), 2);
        assert!(config.storage.in_memory);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = Config::load(Path::new("/nonexistent/dagd.toml")).unwrap();
        assert_eq!(config.network.network_id, "mainnet");
    }
}
