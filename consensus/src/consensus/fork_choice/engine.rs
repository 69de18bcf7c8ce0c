use crate::consensus::storage::ConsensusStorage;
use crate::consensus::types::{FeeSummary, ImportResult};
use crate::consensus::validation::BlockValidator;
use crate::process::coinbase::RewardSchedule;
use consensus_core::config::Params;
use consensus_core::errors::{ConsensusError, ConsensusResult};
use consensus_core::stores::OrphanEntry;
use consensus_core::{Block, BlockFlags, BlockInfo, ChainStats, Hash};
use tracing::{debug, trace};

/// Fork-choice state machine over the block DAG.
///
/// Owns the chain counters and the frontier. All mutation goes through
/// `&mut self`, so callers serialize access (see
/// [`crate::pipeline::BlockProcessor`]).
pub struct ForkChoice {
    pub(super) params: Params,
    pub(super) storage: ConsensusStorage,
    pub(super) validator: BlockValidator,
    pub(super) rewards: RewardSchedule,
    pub(super) stats: ChainStats,
}

impl ForkChoice {
    /// Opens the engine over `storage`, resuming from persisted counters if any
    pub fn new(params: Params, storage: ConsensusStorage) -> ConsensusResult<Self> {
        let stats = storage.blocks().load_stats()?.unwrap_or_default();
        debug!("fork choice resumed at nmain={} nblocks={}", stats.nmain, stats.nblocks);
        Ok(Self {
            validator: BlockValidator::new(params.clone(), storage.clone()),
            rewards: RewardSchedule::new(&params),
            params,
            storage,
            stats,
        })
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn storage(&self) -> &ConsensusStorage {
        &self.storage
    }

    pub fn stats(&self) -> &ChainStats {
        &self.stats
    }

    pub fn rewards(&self) -> &RewardSchedule {
        &self.rewards
    }

    /// Timestamp of the highest main block, zero before the first one
    pub fn last_main_time(&self) -> ConsensusResult<u64> {
        if self.stats.nmain == 0 {
            return Ok(0);
        }
        match self.storage.blocks().hash_by_height(self.stats.nmain)? {
            Some(hash) => Ok(self.info(&hash)?.timestamp),
            None => Err(ConsensusError::Inconsistent(format!("no main block at height {}", self.stats.nmain))),
        }
    }

    /// Ingests one block.
    ///
    /// Rule violations come back as [`ImportResult::RejectedInvalid`] and
    /// leave no trace; store failures are returned as errors.
    pub fn connect(&mut self, block: &Block) -> ConsensusResult<ImportResult> {
        let hash = block.hash();
        if self.storage.blocks().has_block(&hash)? {
            trace!("duplicate block {}", hash);
            return Ok(ImportResult::RejectedDuplicate);
        }

        let fees = match self.validator.validate(block) {
            Ok(fees) => fees,
            Err(ConsensusError::Validation(err)) => {
                debug!("rejected block {}: {}", hash, err);
                return Ok(ImportResult::RejectedInvalid(err));
            }
            Err(err) => return Err(err),
        };

        self.check_main()?;

        let info = self.derive_info(hash, block)?;
        self.storage.blocks().put_block(block)?;
        self.storage.blocks().put_info(&info)?;
        self.stats.nblocks += 1;

        for target in block.block_links() {
            self.mark_referenced(&target)?;
        }
        self.register_unreferenced(hash, block, &fees)?;

        if let (Some(sender), Some(nonce)) = (block.sender(), block.tx_nonce()) {
            let quantity = self.storage.accounts().tx_quantity(&sender)?;
            if nonce > quantity {
                self.storage.accounts().set_tx_quantity(&sender, nonce)?;
            }
        }

        let result = if info.difficulty > self.stats.top_difficulty {
            self.advance_frontier(hash)?;
            ImportResult::AcceptedBest
        } else {
            ImportResult::AcceptedNotBest
        };

        self.storage.blocks().save_stats(&self.stats)?;
        debug!("connected block {} ({:?}), nblocks={}", hash, result, self.stats.nblocks);
        Ok(result)
    }

    /// Promotes frontier ancestors once they sit `confirmation_depth`
    /// links behind the top. Running it twice in a row changes nothing.
    pub fn check_main(&mut self) -> ConsensusResult<()> {
        let mut cursor = self.stats.top;
        for _ in 0..self.params.confirmation_depth {
            cursor = match cursor {
                Some(hash) => self.info(&hash)?.max_diff_link,
                None => None,
            };
        }

        let mut pending = Vec::new();
        while let Some(hash) = cursor {
            let info = self.info(&hash)?;
            if info.is_main() {
                break;
            }
            pending.push(hash);
            cursor = info.max_diff_link;
        }

        if pending.is_empty() {
            return Ok(());
        }
        for hash in pending.into_iter().rev() {
            self.set_main(hash)?;
        }
        self.storage.blocks().save_stats(&self.stats)?;
        Ok(())
    }

    pub(super) fn info(&self, hash: &Hash) -> ConsensusResult<BlockInfo> {
        self.storage.blocks().get_info(hash)?.ok_or(ConsensusError::UnknownBlock(*hash))
    }

    pub(super) fn block(&self, hash: &Hash) -> ConsensusResult<Block> {
        self.storage.blocks().get_block(hash)?.ok_or(ConsensusError::UnknownBlock(*hash))
    }

    pub(super) fn put_info(&self, info: &BlockInfo) -> ConsensusResult<()> {
        Ok(self.storage.blocks().put_info(info)?)
    }

    /// Cumulative difficulty through the heaviest link; the first link wins ties
    fn derive_info(&self, hash: Hash, block: &Block) -> ConsensusResult<BlockInfo> {
        let mut heaviest: Option<(Hash, u128)> = None;
        for link in block.block_links() {
            let difficulty = self.info(&link)?.difficulty;
            if heaviest.map_or(true, |(_, best)| difficulty > best) {
                heaviest = Some((link, difficulty));
            }
        }

        let mut info = BlockInfo::new(hash, block.timestamp);
        info.difficulty = block.difficulty as u128 + heaviest.map_or(0, |(_, d)| d);
        info.max_diff_link = heaviest.map(|(h, _)| h);
        Ok(info)
    }

    fn mark_referenced(&mut self, target: &Hash) -> ConsensusResult<()> {
        let mut info = self.info(target)?;
        if info.is_ref() {
            return Ok(());
        }
        info.flags.insert(BlockFlags::REF);
        self.put_info(&info)?;

        if self.storage.orphans().remove(target)? {
            self.stats.norphan = self.stats.norphan.saturating_sub(1);
        } else {
            self.stats.nextra = self.stats.nextra.saturating_sub(1);
        }
        Ok(())
    }

    /// Coinbase blocks count as extra candidates; everything else waits in
    /// the orphan pool until something links it.
    fn register_unreferenced(&mut self, hash: Hash, block: &Block, fees: &FeeSummary) -> ConsensusResult<()> {
        if block.coinbase().is_some() {
            self.stats.nextra += 1;
            return Ok(());
        }

        let entry = if block.has_inputs() {
            OrphanEntry::transaction(hash, block.timestamp, fees.total, block.sender(), block.tx_nonce().unwrap_or(0))
        } else {
            OrphanEntry::link(hash, block.timestamp)
        };
        self.storage.orphans().add(&entry)?;
        self.stats.norphan += 1;
        Ok(())
    }
}
