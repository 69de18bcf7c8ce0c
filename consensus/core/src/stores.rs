//! Storage traits consumed by the consensus engine
//!
//! The `consensus` crate ships in-memory implementations and the `database`
//! crate RocksDB-backed ones.

use crate::errors::StoreResult;
use crate::{AccountAddress, Amount, Block, BlockInfo, ChainStats, Hash, TimeDigest};
use serde::{Deserialize, Serialize};

/// Blocks, their derived info and the height/time indices
pub trait BlockStore: Send + Sync {
    /// Stores the immutable block and indexes it by timestamp
    fn put_block(&self, block: &Block) -> StoreResult<()>;
    fn get_block(&self, hash: &Hash) -> StoreResult<Option<Block>>;
    fn has_block(&self, hash: &Hash) -> StoreResult<bool>;

    fn put_info(&self, info: &BlockInfo) -> StoreResult<()>;
    fn get_info(&self, hash: &Hash) -> StoreResult<Option<BlockInfo>>;

    fn set_height(&self, height: u64, hash: &Hash) -> StoreResult<()>;
    fn remove_height(&self, height: u64) -> StoreResult<()>;
    fn hash_by_height(&self, height: u64) -> StoreResult<Option<Hash>>;

    /// Sixteen-bucket digest of blocks with timestamps in `[from, from + dt)`
    fn load_time_digest(&self, from: u64, dt: u64) -> StoreResult<TimeDigest>;
    /// Hashes of blocks with timestamps in `[from, to)`, ascending by time
    fn hashes_in_range(&self, from: u64, to: u64) -> StoreResult<Vec<Hash>>;

    fn save_stats(&self, stats: &ChainStats) -> StoreResult<()>;
    fn load_stats(&self) -> StoreResult<Option<ChainStats>>;
}

/// Per-account balance and nonce counters
pub trait AccountStore: Send + Sync {
    fn balance(&self, account: &AccountAddress) -> StoreResult<Amount>;
    fn set_balance(&self, account: &AccountAddress, amount: Amount) -> StoreResult<()>;

    /// Highest transaction nonce seen on ingestion
    fn tx_quantity(&self, account: &AccountAddress) -> StoreResult<u64>;
    fn set_tx_quantity(&self, account: &AccountAddress, quantity: u64) -> StoreResult<()>;

    /// Number of nonce-bearing transactions applied
    fn executed_nonce(&self, account: &AccountAddress) -> StoreResult<u64>;
    fn set_executed_nonce(&self, account: &AccountAddress, nonce: u64) -> StoreResult<()>;

    fn add_executed_nonce(&self, account: &AccountAddress) -> StoreResult<()> {
        let current = self.executed_nonce(account)?;
        self.set_executed_nonce(account, current.saturating_add(1))
    }

    fn subtract_executed_nonce(&self, account: &AccountAddress) -> StoreResult<()> {
        let current = self.executed_nonce(account)?;
        self.set_executed_nonce(account, current.saturating_sub(1))
    }
}

/// A block waiting to be referenced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrphanEntry {
    pub hash: Hash,
    /// Sender's transaction nonce, zero for link entries
    pub nonce: u64,
    pub is_tx: bool,
    pub time: u64,
    pub fee: Amount,
    pub account: Option<AccountAddress>,
}

impl OrphanEntry {
    pub fn link(hash: Hash, time: u64) -> Self {
        Self { hash, nonce: 0, is_tx: false, time, fee: Amount::ZERO, account: None }
    }

    pub fn transaction(hash: Hash, time: u64, fee: Amount, account: Option<AccountAddress>, nonce: u64) -> Self {
        Self { hash, nonce, is_tx: true, time, fee, account }
    }
}

pub trait OrphanStore: Send + Sync {
    fn add(&self, entry: &OrphanEntry) -> StoreResult<()>;
    /// Removes the entry for `hash`; returns whether one existed
    fn remove(&self, hash: &Hash) -> StoreResult<bool>;
    fn contains(&self, hash: &Hash) -> StoreResult<bool>;
    /// Snapshot of all entries
    fn entries(&self) -> StoreResult<Vec<OrphanEntry>>;
    fn count(&self) -> StoreResult<u64>;
}
