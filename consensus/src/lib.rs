//! Consensus library for the block DAG
//!
//! Fork choice by cumulative difficulty, main-block confirmation with
//! reward and fee accounting, the orphan pool and time-digest sync.

pub mod consensus;
pub mod pipeline;
pub mod process;

// Re-export key types for easier access
pub use consensus::fork_choice::ForkChoice;
pub use consensus::storage::ConsensusStorage;
pub use consensus::types::{BlockProcessingResult, FeeSummary, ImportResult};
pub use consensus::validation::{BlockValidator, ContextualValidator};
pub use consensus_core::Hash;

pub use pipeline::{BlockProcessor, InclusionSelection, OrphanPool};
pub use process::{BlockTemplate, BlockTemplateBuilder, RewardSchedule, SyncConfig, SyncProcess};
