//! Consensus rules for the block DAG
//!
//! Validation, fork choice and the storage handles they share.

pub mod fork_choice;
pub mod storage;
pub mod types;
pub mod validation;

pub use fork_choice::ForkChoice;
pub use storage::ConsensusStorage;
pub use types::{BlockProcessingResult, FeeSummary, ImportResult};
pub use validation::{BlockValidator, ContextualValidator};
