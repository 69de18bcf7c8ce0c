//! Storage handles for the consensus engine
//!
//! [`ConsensusStorage`] bundles the three stores the engine writes. The
//! in-memory implementations serve tests and `--in-memory` nodes; the
//! `database` crate provides RocksDB-backed ones.

pub mod memory;

pub use memory::{MemoryAccountStore, MemoryBlockStore, MemoryOrphanStore};

use consensus_core::stores::{AccountStore, BlockStore, OrphanStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct ConsensusStorage {
    blocks: Arc<dyn BlockStore>,
    accounts: Arc<dyn AccountStore>,
    orphans: Arc<dyn OrphanStore>,
}

impl ConsensusStorage {
    pub fn new(blocks: Arc<dyn BlockStore>, accounts: Arc<dyn AccountStore>, orphans: Arc<dyn OrphanStore>) -> Self {
        Self { blocks, accounts, orphans }
    }

    /// Storage backed entirely by memory
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryBlockStore::new()),
            Arc::new(MemoryAccountStore::new()),
            Arc::new(MemoryOrphanStore::new()),
        )
    }

    pub fn blocks(&self) -> &Arc<dyn BlockStore> {
        &self.blocks
    }

    pub fn accounts(&self) -> &Arc<dyn AccountStore> {
        &self.accounts
    }

    pub fn orphans(&self) -> &Arc<dyn OrphanStore> {
        &self.orphans
    }
}
