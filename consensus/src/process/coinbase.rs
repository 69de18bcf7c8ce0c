//! Main block rewards
//!
//! Every main block earns a fixed reward that drops once the chain reaches
//! the network's reward fork height.

use consensus_core::config::Params;
use consensus_core::Amount;

/// Reward schedule for one network
#[derive(Debug, Clone)]
pub struct RewardSchedule {
    fork_height: u64,
    main_reward: Amount,
    fork_reward: Amount,
}

impl RewardSchedule {
    pub fn new(params: &Params) -> Self {
        Self {
            fork_height: params.reward_fork_height,
            main_reward: params.main_reward,
            fork_reward: params.fork_reward,
        }
    }

    /// Reward credited to the main block at `height`
    pub fn reward(&self, height: u64) -> Amount {
        if height < self.fork_height {
            self.main_reward
        } else {
            self.fork_reward
        }
    }

    /// Total coins minted by main blocks at heights `1..=nmain`
    pub fn supply(&self, nmain: u64) -> Amount {
        let before_fork = nmain.min(self.fork_height.saturating_sub(1));
        let after_fork = nmain - before_fork;
        let minted = self
            .main_reward
            .units()
            .saturating_mul(before_fork)
            .saturating_add(self.fork_reward.units().saturating_mul(after_fork));
        Amount::from_units(minted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use consensus_core::NetworkType;

    #[test]
    fn reward_drops_at_fork_height() {
        let schedule = RewardSchedule::new(&Params::mainnet());
        assert_eq!(schedule.reward(1), Amount::from_coins(1024));
        assert_eq!(schedule.reward(1_017_322), Amount::from_coins(1024));
        assert_eq!(schedule.reward(1_017_323), Amount::from_coins(128));
    }

    #[test]
    fn fork_height_follows_network() {
        let testnet = RewardSchedule::new(&Params::for_network(NetworkType::Testnet));
        assert_eq!(testnet.reward(196_249), Amount::from_coins(1024));
        assert_eq!(testnet.reward(196_250), Amount::from_coins(128));
    }

    #[test]
    fn supply_sums_rewards() {
        let schedule = RewardSchedule::new(&Params::devnet());
        assert_eq!(schedule.supply(0), Amount::ZERO);
        assert_eq!(schedule.supply(10), Amount::from_coins(10 * 1024));
        assert_eq!(schedule.supply(999), Amount::from_coins(999 * 1024));
        assert_eq!(schedule.supply(1_001), Amount::from_coins(999 * 1024 + 2 * 128));
    }
}
