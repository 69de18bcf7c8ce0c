use crate::Amount;

/// Maximum number of 32-byte fields in a block, header included
pub const MAX_BLOCK_FIELDS: usize = 16;

/// Fields taken by one signature: public key plus the two signature halves
pub const SIGNATURE_FIELDS: usize = 3;

/// Protocol minimum fee charged per output
pub const MIN_FEE: Amount = Amount::from_milli(100);

/// Reward per main block below the reward fork height
pub const MAIN_REWARD: Amount = Amount::from_coins(1024);

/// Reward per main block at or above the reward fork height
pub const FORK_REWARD: Amount = Amount::from_coins(128);

pub const MAINNET_REWARD_FORK_HEIGHT: u64 = 1_017_323;
pub const TESTNET_REWARD_FORK_HEIGHT: u64 = 196_250;
pub const DEVNET_REWARD_FORK_HEIGHT: u64 = 1_000;

/// Main-chain links a block needs behind the frontier before promotion
pub const CONFIRMATION_DEPTH: u64 = 1;
