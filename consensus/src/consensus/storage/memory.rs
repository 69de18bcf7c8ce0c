//! In-memory store implementations

use consensus_core::errors::StoreResult;
use consensus_core::stores::{AccountStore, BlockStore, OrphanEntry, OrphanStore};
use consensus_core::{AccountAddress, Amount, Block, BlockInfo, ChainStats, Hash, TimeDigest, ZERO_HASH};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Default)]
struct BlockTables {
    blocks: HashMap<Hash, Block>,
    infos: HashMap<Hash, BlockInfo>,
    heights: BTreeMap<u64, Hash>,
    time_index: BTreeSet<(u64, Hash)>,
    stats: Option<ChainStats>,
}

/// Block store held in memory
#[derive(Default)]
pub struct MemoryBlockStore {
    tables: RwLock<BlockTables>,
}

impl MemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block_count(&self) -> usize {
        self.tables.read().blocks.len()
    }
}

impl BlockStore for MemoryBlockStore {
    fn put_block(&self, block: &Block) -> StoreResult<()> {
        let hash = block.hash();
        let mut tables = self.tables.write();
        tables.time_index.insert((block.timestamp, hash));
        tables.blocks.insert(hash, block.clone());
        Ok(())
    }

    fn get_block(&self, hash: &Hash) -> StoreResult<Option<Block>> {
        Ok(self.tables.read().blocks.get(hash).cloned())
    }

    fn has_block(&self, hash: &Hash) -> StoreResult<bool> {
        Ok(self.tables.read().blocks.contains_key(hash))
    }

    fn put_info(&self, info: &BlockInfo) -> StoreResult<()> {
        self.tables.write().infos.insert(info.hash, info.clone());
        Ok(())
    }

    fn get_info(&self, hash: &Hash) -> StoreResult<Option<BlockInfo>> {
        Ok(self.tables.read().infos.get(hash).cloned())
    }

    fn set_height(&self, height: u64, hash: &Hash) -> StoreResult<()> {
        self.tables.write().heights.insert(height, *hash);
        Ok(())
    }

    fn remove_height(&self, height: u64) -> StoreResult<()> {
        self.tables.write().heights.remove(&height);
        Ok(())
    }

    fn hash_by_height(&self, height: u64) -> StoreResult<Option<Hash>> {
        Ok(self.tables.read().heights.get(&height).copied())
    }

    fn load_time_digest(&self, from: u64, dt: u64) -> StoreResult<TimeDigest> {
        let to = from.saturating_add(dt);
        let tables = self.tables.read();
        let mut digest = TimeDigest::default();
        for (time, hash) in tables.time_index.range((from, ZERO_HASH)..).take_while(|(t, _)| *t < to) {
            digest.add(from, dt, *time, hash);
        }
        Ok(digest)
    }

    fn hashes_in_range(&self, from: u64, to: u64) -> StoreResult<Vec<Hash>> {
        let tables = self.tables.read();
        Ok(tables
            .time_index
            .range((from, ZERO_HASH)..)
            .take_while(|(t, _)| *t < to)
            .map(|(_, h)| *h)
            .collect())
    }

    fn save_stats(&self, stats: &ChainStats) -> StoreResult<()> {
        self.tables.write().stats = Some(stats.clone());
        Ok(())
    }

    fn load_stats(&self) -> StoreResult<Option<ChainStats>> {
        Ok(self.tables.read().stats.clone())
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct AccountState {
    balance: Amount,
    tx_quantity: u64,
    executed_nonce: u64,
}

/// Account balances and nonce counters held in memory
#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: RwLock<HashMap<AccountAddress, AccountState>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, account: &AccountAddress, f: impl Fn(&AccountState) -> T) -> T {
        let accounts = self.accounts.read();
        f(accounts.get(account).unwrap_or(&AccountState::default()))
    }

    fn update(&self, account: &AccountAddress, f: impl FnOnce(&mut AccountState)) {
        let mut accounts = self.accounts.write();
        f(accounts.entry(*account).or_default());
    }
}

impl AccountStore for MemoryAccountStore {
    fn balance(&self, account: &AccountAddress) -> StoreResult<Amount> {
        Ok(self.read(account, |s| s.balance))
    }

    fn set_balance(&self, account: &AccountAddress, amount: Amount) -> StoreResult<()> {
        self.update(account, |s| s.balance = amount);
        Ok(())
    }

    fn tx_quantity(&self, account: &AccountAddress) -> StoreResult<u64> {
        Ok(self.read(account, |s| s.tx_quantity))
    }

    fn set_tx_quantity(&self, account: &AccountAddress, quantity: u64) -> StoreResult<()> {
        self.update(account, |s| s.tx_quantity = quantity);
        Ok(())
    }

    fn executed_nonce(&self, account: &AccountAddress) -> StoreResult<u64> {
        Ok(self.read(account, |s| s.executed_nonce))
    }

    fn set_executed_nonce(&self, account: &AccountAddress, nonce: u64) -> StoreResult<()> {
        self.update(account, |s| s.executed_nonce = nonce);
        Ok(())
    }
}

/// Orphan index held in memory, iterated in hash order
#[derive(Default)]
pub struct MemoryOrphanStore {
    entries: RwLock<BTreeMap<Hash, OrphanEntry>>,
}

impl MemoryOrphanStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OrphanStore for MemoryOrphanStore {
    fn add(&self, entry: &OrphanEntry) -> StoreResult<()> {
        self.entries.write().insert(entry.hash, entry.clone());
        Ok(())
    }

    fn remove(&self, hash: &Hash) -> StoreResult<bool> {
        Ok(self.entries.write().remove(hash).is_some())
    }

    fn contains(&self, hash: &Hash) -> StoreResult<bool> {
        Ok(self.entries.read().contains_key(hash))
    }

    fn entries(&self) -> StoreResult<Vec<OrphanEntry>> {
        Ok(self.entries.read().values().cloned().collect())
    }

    fn count(&self) -> StoreResult<u64> {
        Ok(self.entries.read().len() as u64)
    }
}
