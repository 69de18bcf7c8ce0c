use super::ForkChoice;
use consensus_core::errors::ConsensusResult;
use consensus_core::{BlockFlags, Hash};
use tracing::info;

impl ForkChoice {
    /// Moves the frontier to `new_top`, unwinding the old chain down to the
    /// point where the two chains meet.
    pub(super) fn advance_frontier(&mut self, new_top: Hash) -> ConsensusResult<()> {
        let mut path = Vec::new();
        let mut fork_point = None;
        let mut cursor = Some(new_top);
        while let Some(hash) = cursor {
            let info = self.info(&hash)?;
            if info.is_main_chain() {
                fork_point = Some(hash);
                break;
            }
            path.push(hash);
            cursor = info.max_diff_link;
        }

        self.apply_reorg(fork_point)?;

        for hash in path.iter().rev() {
            let mut info = self.info(hash)?;
            info.flags.insert(BlockFlags::MAIN_CHAIN);
            self.put_info(&info)?;
        }

        let top = self.info(&new_top)?;
        self.stats.top = Some(new_top);
        self.stats.top_difficulty = top.difficulty;
        Ok(())
    }

    /// Walks the current chain from the top down to `fork_point`, rolling
    /// back main blocks and clearing chain membership on the way.
    pub fn apply_reorg(&mut self, fork_point: Option<Hash>) -> ConsensusResult<()> {
        let mut rolled_back = 0u64;
        let mut cursor = self.stats.top;
        while let Some(hash) = cursor {
            if Some(hash) == fork_point {
                break;
            }
            if self.info(&hash)?.is_main() {
                self.rollback(hash)?;
                rolled_back += 1;
            }
            let mut info = self.info(&hash)?;
            info.flags.remove(BlockFlags::MAIN_CHAIN);
            self.put_info(&info)?;
            cursor = info.max_diff_link;
        }

        if rolled_back > 0 {
            info!("reorganization rolled back {} main blocks, nmain now {}", rolled_back, self.stats.nmain);
        }
        Ok(())
    }
}
