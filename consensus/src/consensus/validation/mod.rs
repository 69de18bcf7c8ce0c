//! Validation module for consensus
//!
//! Context-free block checks plus contextual checks against stored
//! blocks and account state.

pub mod block_validator;
pub mod contextual;

pub use block_validator::BlockValidator;
pub use contextual::ContextualValidator;
