//! Block assembly for producers
//!
//! Builds an unsigned candidate that extends the frontier and references
//! as many orphans as the field budget allows.

use crate::pipeline::BlockProcessor;
use consensus_core::block::BlockBuilder;
use consensus_core::constants::SIGNATURE_FIELDS;
use consensus_core::errors::StoreResult;
use consensus_core::{AccountAddress, Block};
use std::sync::Arc;
use tracing::debug;

/// A candidate block and the selection watermark it was built with
#[derive(Debug, Clone)]
pub struct BlockTemplate {
    pub block: Block,
    pub watermark: u64,
}

/// Assembles candidate blocks
pub struct BlockTemplateBuilder {
    processor: Arc<BlockProcessor>,
    difficulty: u64,
}

impl BlockTemplateBuilder {
    pub fn new(processor: Arc<BlockProcessor>) -> Self {
        Self { processor, difficulty: 1 }
    }

    /// Proof weight stamped on built candidates
    pub fn with_difficulty(mut self, difficulty: u64) -> Self {
        self.difficulty = difficulty;
        self
    }

    /// Builds a candidate paying `coinbase` at time `now`. The result leaves
    /// room for exactly one signature within the field cap.
    pub fn build(&self, coinbase: AccountAddress, now: u64) -> StoreResult<BlockTemplate> {
        let top = self.processor.frontier().map(|(hash, _)| hash);

        let mut builder = BlockBuilder::new(now).difficulty(self.difficulty);
        if let Some(top) = top {
            builder = builder.link(top);
        }
        builder = builder.coinbase(coinbase);

        let used = builder.field_count() + SIGNATURE_FIELDS;
        let budget = self.processor.params().max_block_fields.saturating_sub(used);
        // The frontier may itself be an orphan; it is already linked and
        // does not count against the budget.
        let selection = self.processor.select_for_inclusion(budget + 1, now)?;
        let mut linked = 0;
        let mut consumed = 0;
        let mut latest = None;
        for entry in &selection.entries {
            if Some(entry.hash) != top {
                if linked == budget {
                    break;
                }
                builder = builder.link(entry.hash);
                linked += 1;
            }
            consumed += 1;
            latest = latest.max(Some(entry.time));
        }
        // The selection's watermark covers every entry it returned; a cut
        // short by the budget only consumed a prefix of them.
        let watermark = if consumed == selection.entries.len() {
            selection.watermark
        } else {
            latest.map_or(now, |t| (t + 1).min(now))
        };

        let block = builder.build();
        debug!("built template with {} links, {} fields", block.links.len(), block.field_count());
        Ok(BlockTemplate { block, watermark })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::storage::ConsensusStorage;
    use consensus_core::config::Params;
    use consensus_core::constants::MAX_BLOCK_FIELDS;
    use secp256k1::SecretKey;

    fn processor() -> Arc<BlockProcessor> {
        Arc::new(BlockProcessor::new(Params::devnet(), ConsensusStorage::in_memory()).unwrap())
    }

    #[test]
    fn test_template_respects_field_cap() {
        let processor = processor();
        for t in 1..=30u64 {
            processor.process_block(&BlockBuilder::new(t).build()).unwrap();
        }

        let miner = AccountAddress::from_bytes([5; 20]);
        let template = BlockTemplateBuilder::new(processor.clone()).build(miner, 100).unwrap();
        let mut block = template.block;
        block.sign(&SecretKey::from_slice(&[9; 32]).unwrap()).unwrap();

        assert_eq!(block.field_count(), MAX_BLOCK_FIELDS);
        assert_eq!(block.coinbase(), Some(miner));
        assert_eq!(template.watermark, 12);

        let result = processor.process_block(&block).unwrap();
        assert!(result.result.is_accepted());
        assert_eq!(processor.stats().top, Some(block.hash()));
    }

    #[test]
    fn test_watermark_stops_at_last_linked_entry() {
        let processor = processor();
        for t in 1..=30u64 {
            processor.process_block(&BlockBuilder::new(t).build()).unwrap();
        }
        let top = BlockBuilder::new(40).difficulty(5).coinbase(AccountAddress::from_bytes([6; 20])).build();
        processor.process_block(&top).unwrap();
        assert_eq!(processor.stats().top, Some(top.hash()));

        let template = BlockTemplateBuilder::new(processor.clone())
            .build(AccountAddress::from_bytes([5; 20]), 100)
            .unwrap();
        let links: Vec<_> = template.block.block_links().collect();
        assert_eq!(links.len(), 11);
        assert_eq!(links[0], top.hash());
        assert_eq!(template.watermark, 11);
        assert_eq!(processor.select_for_inclusion(11, 100).unwrap().watermark, 12);
    }

    #[test]
    fn test_template_links_frontier_first() {
        let processor = processor();
        let root = BlockBuilder::new(1).build();
        processor.process_block(&root).unwrap();

        let template = BlockTemplateBuilder::new(processor)
            .build(AccountAddress::from_bytes([5; 20]), 50)
            .unwrap();
        let links: Vec<_> = template.block.block_links().collect();
        assert_eq!(links, vec![root.hash()]);
        assert_eq!(template.watermark, 2);
    }
}
