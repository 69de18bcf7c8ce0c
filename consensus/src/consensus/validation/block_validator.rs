//! Block validation for consensus
//!
//! Context-free checks: field cap, fee rules, amount conservation and
//! signature integrity. Checks that need stored state live in
//! [`super::contextual`].

use crate::consensus::storage::ConsensusStorage;
use crate::consensus::types::FeeSummary;
use consensus_core::config::Params;
use consensus_core::errors::{ConsensusError, ValidationError};
use consensus_core::{Amount, Block};

use super::contextual::ContextualValidator;

/// Block validator for consensus rules
pub struct BlockValidator {
    params: Params,
    contextual: ContextualValidator,
}

impl BlockValidator {
    /// Create a new block validator
    pub fn new(params: Params, storage: ConsensusStorage) -> Self {
        Self { params, contextual: ContextualValidator::new(storage) }
    }

    /// Runs every check in order; the first failure wins. Store failures are
    /// reported as [`ConsensusError::Store`], rule violations as
    /// [`ConsensusError::Validation`].
    pub fn validate(&self, block: &Block) -> Result<FeeSummary, ConsensusError> {
        self.validate_structure(block)?;
        self.contextual.validate_links(block)?;
        let fees = self.validate_fees(block)?;
        self.contextual.validate_solvency(block)?;
        self.contextual.validate_nonce(block)?;
        self.validate_signatures(block)?;
        self.contextual.validate_input_ownership(block)?;
        Ok(fees)
    }

    pub fn validate_structure(&self, block: &Block) -> Result<(), ValidationError> {
        block.check_field_count(self.params.max_block_fields)
    }

    /// Per-output fee actually charged by `block`
    pub fn effective_fee(&self, block: &Block) -> Amount {
        if block.fee.is_zero() {
            self.params.min_fee
        } else {
            block.fee
        }
    }

    pub fn validate_fees(&self, block: &Block) -> Result<FeeSummary, ValidationError> {
        if !block.fee.is_zero() && block.fee < self.params.min_fee {
            return Err(ValidationError::FeeBelowMinimum(block.fee, self.params.min_fee));
        }
        let per_output = self.effective_fee(block);

        let total_in = Amount::checked_sum(block.inputs().map(|l| l.amount)).ok_or(ValidationError::AmountOverflow)?;
        let total_out = Amount::checked_sum(block.outputs().map(|l| l.amount)).ok_or(ValidationError::AmountOverflow)?;
        if total_out > total_in {
            return Err(ValidationError::OutputsExceedInputs);
        }

        let mut paying = 0u64;
        for (index, output) in block.outputs().enumerate() {
            if output.amount.is_zero() {
                continue;
            }
            if output.amount < per_output {
                return Err(ValidationError::OutputBelowFee { index, amount: output.amount, fee: per_output });
            }
            paying += 1;
        }

        let total = per_output.checked_mul(paying).ok_or(ValidationError::AmountOverflow)?;
        Ok(FeeSummary { per_output, total })
    }

    pub fn validate_signatures(&self, block: &Block) -> Result<(), ValidationError> {
        let digest = block.signing_digest();
        for sig in &block.signatures {
            sig.verify(&digest)?;
        }
        Ok(())
    }
}
