//! Background processes for consensus
//!
//! Block assembly, the reward schedule and time-digest synchronization.

pub mod coinbase;
pub mod mining;
pub mod sync;

pub use coinbase::RewardSchedule;
pub use mining::{BlockTemplate, BlockTemplateBuilder};
pub use sync::{SyncConfig, SyncProcess};
