//! Block processor for consensus
//!
//! The single ingestion point. Serializes every fork-choice mutation behind
//! one lock and serves reads from the stores' last committed values.

use crate::consensus::fork_choice::ForkChoice;
use crate::consensus::storage::ConsensusStorage;
use crate::consensus::types::BlockProcessingResult;
use crate::pipeline::orphan_pool::{InclusionSelection, OrphanPool};
use crate::process::sync::LocalChain;
use consensus_core::config::Params;
use consensus_core::errors::{ConsensusError, ConsensusResult, StoreError, StoreResult};
use consensus_core::state::NodeState;
use consensus_core::{Amount, Block, BlockInfo, ChainStats, Hash, TimeDigest};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

/// Block processor for consensus
pub struct BlockProcessor {
    engine: Mutex<ForkChoice>,
    storage: ConsensusStorage,
    orphans: OrphanPool,
    params: Params,
    state: RwLock<NodeState>,
}

impl BlockProcessor {
    /// Create a new block processor over `storage`
    pub fn new(params: Params, storage: ConsensusStorage) -> ConsensusResult<Self> {
        let engine = ForkChoice::new(params.clone(), storage.clone())?;
        Ok(Self {
            engine: Mutex::new(engine),
            orphans: OrphanPool::new(storage.orphans().clone()),
            storage,
            params,
            state: RwLock::new(NodeState::Init),
        })
    }

    /// Process a complete block
    pub fn process_block(&self, block: &Block) -> ConsensusResult<BlockProcessingResult> {
        let hash = block.hash();
        let result = self.engine.lock().connect(block)?;
        Ok(BlockProcessingResult { hash, result })
    }

    pub fn check_main(&self) -> ConsensusResult<()> {
        self.engine.lock().check_main()
    }

    pub fn rollback(&self, main: Hash) -> ConsensusResult<()> {
        self.engine.lock().rollback(main)
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn storage(&self) -> &ConsensusStorage {
        &self.storage
    }

    pub fn orphan_pool(&self) -> &OrphanPool {
        &self.orphans
    }

    /// Consistent copy of the counters and frontier
    pub fn stats(&self) -> ChainStats {
        self.engine.lock().stats().clone()
    }

    pub fn frontier(&self) -> Option<(Hash, u128)> {
        let engine = self.engine.lock();
        engine.stats().top.map(|top| (top, engine.stats().top_difficulty))
    }

    /// Coins minted by the confirmed main chain
    pub fn supply(&self) -> Amount {
        let engine = self.engine.lock();
        engine.rewards().supply(engine.stats().nmain)
    }

    pub fn has_block(&self, hash: &Hash) -> StoreResult<bool> {
        self.storage.blocks().has_block(hash)
    }

    pub fn get_block(&self, hash: &Hash) -> StoreResult<Option<Block>> {
        self.storage.blocks().get_block(hash)
    }

    pub fn block_info(&self, hash: &Hash) -> StoreResult<Option<BlockInfo>> {
        self.storage.blocks().get_info(hash)
    }

    pub fn block_by_height(&self, height: u64) -> StoreResult<Option<Block>> {
        match self.storage.blocks().hash_by_height(height)? {
            Some(hash) => self.storage.blocks().get_block(&hash),
            None => Ok(None),
        }
    }

    /// Stored blocks with time in `[from, to)`, ascending by time
    pub fn blocks_in_range(&self, from: u64, to: u64) -> StoreResult<Vec<Block>> {
        let mut blocks = Vec::new();
        for hash in self.storage.blocks().hashes_in_range(from, to)? {
            if let Some(block) = self.storage.blocks().get_block(&hash)? {
                blocks.push(block);
            }
        }
        Ok(blocks)
    }

    pub fn select_for_inclusion(&self, max_count: usize, now: u64) -> StoreResult<InclusionSelection> {
        self.orphans.select_for_inclusion(max_count, now)
    }

    pub fn set_node_state(&self, state: NodeState) {
        let mut current = self.state.write();
        if *current != state {
            info!("node state {} -> {}", current.short_name(), state.short_name());
            *current = state;
        }
    }
}

impl LocalChain for BlockProcessor {
    fn load_time_digest(&self, from: u64, dt: u64) -> StoreResult<TimeDigest> {
        self.storage.blocks().load_time_digest(from, dt)
    }

    fn last_main_time(&self) -> StoreResult<u64> {
        self.engine.lock().last_main_time().map_err(|e| match e {
            ConsensusError::Store(e) => e,
            other => StoreError::Corrupt(other.to_string()),
        })
    }

    fn node_state(&self) -> NodeState {
        *self.state.read()
    }

    fn set_sync_old(&self) {
        let state = self.node_state();
        if state.is_syncing_old() || state.is_synchronized() {
            return;
        }
        debug!("switching to old-range synchronization");
        self.set_node_state(NodeState::SyncingOld(self.params.network));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::types::ImportResult;
    use consensus_core::block::BlockBuilder;
    use consensus_core::{AccountAddress, NetworkType};
    use secp256k1::SecretKey;
    use std::sync::Arc;

    fn processor() -> BlockProcessor {
        BlockProcessor::new(Params::devnet(), ConsensusStorage::in_memory()).unwrap()
    }

    fn chain(processor: &BlockProcessor, n: u64) -> Vec<Hash> {
        let key = SecretKey::from_slice(&[1; 32]).unwrap();
        let root = BlockBuilder::new(1).signed(&key).unwrap().build();
        processor.process_block(&root).unwrap();
        let mut hashes = vec![root.hash()];
        for i in 1..=n {
            let block = BlockBuilder::new(i * 1000)
                .link(*hashes.last().unwrap())
                .coinbase(AccountAddress::from_bytes([3; 20]))
                .build();
            processor.process_block(&block).unwrap();
            hashes.push(block.hash());
        }
        hashes
    }

    #[test]
    fn test_snapshot_reads_follow_ingestion() {
        let processor = processor();
        let hashes = chain(&processor, 4);

        let stats = processor.stats();
        assert_eq!(stats.nblocks, 5);
        assert_eq!(stats.nmain, 3);
        assert_eq!(processor.frontier().map(|(h, _)| h), Some(hashes[4]));
        assert_eq!(processor.supply(), Amount::from_coins(3 * 1024));
        assert_eq!(processor.block_by_height(2).unwrap().map(|b| b.hash()), Some(hashes[1]));
        assert_eq!(processor.last_main_time().unwrap(), 2000);
        assert_eq!(processor.blocks_in_range(1000, 3000).unwrap().len(), 2);
        assert!(processor.block_info(&hashes[0]).unwrap().unwrap().is_main());
    }

    #[test]
    fn test_duplicate_reported_not_raised() {
        let processor = processor();
        let block = BlockBuilder::new(5).build();
        assert!(processor.process_block(&block).unwrap().result.is_accepted());
        let again = processor.process_block(&block).unwrap();
        assert_eq!(again.result, ImportResult::RejectedDuplicate);
        assert_eq!(again.hash, block.hash());
    }

    #[test]
    fn test_sync_old_respects_current_state() {
        let processor = processor();
        processor.set_node_state(NodeState::Connected(NetworkType::Devnet));
        processor.set_sync_old();
        assert_eq!(processor.node_state(), NodeState::SyncingOld(NetworkType::Devnet));

        processor.set_node_state(NodeState::Synchronized(NetworkType::Devnet));
        processor.set_sync_old();
        assert!(processor.node_state().is_synchronized());
    }

    #[test]
    fn test_concurrent_ingestion_is_serialized() {
        let processor = Arc::new(processor());
        std::thread::scope(|scope| {
            for worker in 0..4u64 {
                let processor = processor.clone();
                scope.spawn(move || {
                    for i in 0..25u64 {
                        let block = BlockBuilder::new(worker * 100 + i).difficulty(worker + 1).build();
                        processor.process_block(&block).unwrap();
                    }
                });
            }
        });
        let stats = processor.stats();
        assert_eq!(stats.nblocks, 100);
        assert_eq!(stats.norphan, 100);
        assert_eq!(processor.orphan_pool().len().unwrap(), 100);
    }
}
