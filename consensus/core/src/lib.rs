//! Core data model for the block-DAG node
//!
//! Hashes, amounts, link records, blocks, derived block info, network
//! parameters and the storage traits the consensus engine consumes.

pub mod address;
pub mod amount;
pub mod block;
pub mod block_info;
pub mod config;
pub mod constants;
pub mod errors;
pub mod hash;
pub mod network;
pub mod sign;
pub mod state;
pub mod stores;
pub mod time;

pub use address::{AccountAddress, Address, FieldKind, ParsedAddress, Target, TxNonce};
pub use amount::Amount;
pub use block::Block;
pub use block_info::{BlockFlags, BlockInfo, ChainStats};
pub use hash::{Hash, ZERO_HASH};
pub use network::NetworkType;
pub use time::TimeDigest;
