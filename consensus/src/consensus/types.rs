//! Consensus-specific types
//!
//! This module defines types used throughout the consensus module.

use consensus_core::errors::ValidationError;
use consensus_core::{Amount, Hash};

/// Outcome of offering a block to the fork-choice engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportResult {
    /// Accepted and now the frontier
    AcceptedBest,
    /// Accepted without moving the frontier
    AcceptedNotBest,
    /// Rejected; no state changed
    RejectedInvalid(ValidationError),
    /// Already known; no state changed
    RejectedDuplicate,
}

impl ImportResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ImportResult::AcceptedBest | ImportResult::AcceptedNotBest)
    }
}

/// Block processing result
#[derive(Debug, Clone)]
pub struct BlockProcessingResult {
    /// Block hash
    pub hash: Hash,
    pub result: ImportResult,
}

/// Checked fee figures of a block that passed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSummary {
    /// Fee withheld from each paying output
    pub per_output: Amount,
    /// Fee the first confirming main block collects
    pub total: Amount,
}
