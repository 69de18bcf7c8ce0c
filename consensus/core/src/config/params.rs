use crate::constants::*;
use crate::{Amount, NetworkType};
use serde::{Deserialize, Serialize};

/// Consensus parameters for one network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    pub network: NetworkType,
    /// First height paid with the reduced reward
    pub reward_fork_height: u64,
    pub main_reward: Amount,
    pub fork_reward: Amount,
    /// Main-chain links a block needs behind the frontier before promotion
    pub confirmation_depth: u64,
    pub min_fee: Amount,
    pub max_block_fields: usize,
}

impl Params {
    pub fn for_network(network: NetworkType) -> Self {
        let reward_fork_height = match network {
            NetworkType::Mainnet => MAINNET_REWARD_FORK_HEIGHT,
            NetworkType::Testnet => TESTNET_REWARD_FORK_HEIGHT,
            NetworkType::Devnet => DEVNET_REWARD_FORK_HEIGHT,
        };
        Self {
            network,
            reward_fork_height,
            main_reward: MAIN_REWARD,
            fork_reward: FORK_REWARD,
            confirmation_depth: CONFIRMATION_DEPTH,
            min_fee: MIN_FEE,
            max_block_fields: MAX_BLOCK_FIELDS,
        }
    }

    pub fn mainnet() -> Self {
        Self::for_network(NetworkType::Mainnet)
    }

    pub fn devnet() -> Self {
        Self::for_network(NetworkType::Devnet)
    }
}

impl Default for Params {
    fn default() -> Self {
        Self::mainnet()
    }
}
