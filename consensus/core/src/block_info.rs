//! Derived, mutable per-block state owned by the fork-choice engine

use crate::{Amount, Hash};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Flag bitset of a block
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockFlags(u8);

impl BlockFlags {
    /// Confirmed main block with an assigned height
    pub const MAIN: BlockFlags = BlockFlags(0x01);
    /// On the max-difficulty path from the frontier
    pub const MAIN_CHAIN: BlockFlags = BlockFlags(0x02);
    /// Contained by some main block
    pub const MAIN_REF: BlockFlags = BlockFlags(0x04);
    /// Linked by at least one other block
    pub const REF: BlockFlags = BlockFlags(0x08);
    /// Balance effects executed
    pub const APPLIED: BlockFlags = BlockFlags(0x10);

    pub const fn empty() -> Self {
        BlockFlags(0)
    }

    pub const fn bits(&self) -> u8 {
        self.0
    }

    pub fn contains(&self, other: BlockFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: BlockFlags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: BlockFlags) {
        self.0 &= !other.0;
    }
}

impl std::ops::BitOr for BlockFlags {
    type Output = BlockFlags;

    fn bitor(self, rhs: BlockFlags) -> BlockFlags {
        BlockFlags(self.0 | rhs.0)
    }
}

impl fmt::Debug for BlockFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (BlockFlags::MAIN, "MAIN"),
            (BlockFlags::MAIN_CHAIN, "MAIN_CHAIN"),
            (BlockFlags::MAIN_REF, "MAIN_REF"),
            (BlockFlags::REF, "REF"),
            (BlockFlags::APPLIED, "APPLIED"),
        ];
        let set: Vec<&str> = names.iter().filter(|(flag, _)| self.contains(*flag)).map(|(_, n)| *n).collect();
        write!(f, "BlockFlags({})", set.join(" | "))
    }
}

/// Derived state of a block, written only by the fork-choice engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    pub hash: Hash,
    pub timestamp: u64,
    pub flags: BlockFlags,
    /// Own difficulty plus the cumulative difficulty of `max_diff_link`
    pub difficulty: u128,
    /// Balance currently attributed to the block
    pub amount: Amount,
    /// Fees collected while this block applied the blocks it contains
    pub fee: Amount,
    /// Main-chain position, present exactly while MAIN is set
    pub height: Option<u64>,
    /// Main block that applied this block
    pub reference: Option<Hash>,
    /// Predecessor with the greatest cumulative difficulty
    pub max_diff_link: Option<Hash>,
}

impl BlockInfo {
    pub fn new(hash: Hash, timestamp: u64) -> Self {
        Self {
            hash,
            timestamp,
            flags: BlockFlags::empty(),
            difficulty: 0,
            amount: Amount::ZERO,
            fee: Amount::ZERO,
            height: None,
            reference: None,
            max_diff_link: None,
        }
    }

    pub fn is_main(&self) -> bool {
        self.flags.contains(BlockFlags::MAIN)
    }

    pub fn is_main_chain(&self) -> bool {
        self.flags.contains(BlockFlags::MAIN_CHAIN)
    }

    pub fn is_ref(&self) -> bool {
        self.flags.contains(BlockFlags::REF)
    }

    pub fn is_main_ref(&self) -> bool {
        self.flags.contains(BlockFlags::MAIN_REF)
    }

    pub fn is_applied(&self) -> bool {
        self.flags.contains(BlockFlags::APPLIED)
    }
}

/// Global counters and the fork-choice frontier
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainStats {
    /// Blocks ever accepted
    pub nblocks: u64,
    /// Confirmed main blocks; also the height of the last one
    pub nmain: u64,
    /// Unreferenced main-chain candidates
    pub nextra: u64,
    /// Unreferenced ordinary blocks held by the orphan pool
    pub norphan: u64,
    pub top: Option<Hash>,
    pub top_difficulty: u128,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_set_operations() {
        let mut flags = BlockFlags::MAIN_CHAIN | BlockFlags::REF;
        assert!(flags.contains(BlockFlags::REF));
        assert!(!flags.contains(BlockFlags::MAIN));
        flags.insert(BlockFlags::MAIN | BlockFlags::APPLIED);
        flags.remove(BlockFlags::APPLIED);
        assert_eq!(flags.bits(), 0x01 | 0x02 | 0x08);
        assert_eq!(format!("{:?}", flags), "BlockFlags(MAIN | MAIN_CHAIN | REF)");
    }
}
