//! Block ingestion pipeline
//!
//! Serialized block processing in front of the fork-choice engine and the
//! orphan pool that feeds block producers.

pub mod block_processor;
pub mod orphan_pool;

pub use block_processor::BlockProcessor;
pub use orphan_pool::{InclusionSelection, OrphanPool};
