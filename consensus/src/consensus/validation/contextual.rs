//! Contextual validation against stored state
//!
//! Link resolution, input solvency, nonce freshness and input ownership.

use crate::consensus::storage::ConsensusStorage;
use consensus_core::errors::{ConsensusError, ValidationError};
use consensus_core::{Amount, Block, Target};
use std::collections::HashMap;

pub struct ContextualValidator {
    storage: ConsensusStorage,
}

impl ContextualValidator {
    pub fn new(storage: ConsensusStorage) -> Self {
        Self { storage }
    }

    /// Every block link must name a known block
    pub fn validate_links(&self, block: &Block) -> Result<(), ConsensusError> {
        for hash in block.block_links() {
            if !self.storage.blocks().has_block(&hash)? {
                return Err(ValidationError::UnknownLink(hash).into());
            }
        }
        Ok(())
    }

    /// Every spent source must currently hold what the block takes from it
    pub fn validate_solvency(&self, block: &Block) -> Result<(), ConsensusError> {
        let mut needs: HashMap<Target, Amount> = HashMap::new();
        for input in block.inputs() {
            let need = needs.entry(input.target).or_default();
            *need = need.checked_add(input.amount).ok_or(ValidationError::AmountOverflow)?;
        }

        for (target, needed) in needs {
            let available = match target {
                Target::Account(account) => self.storage.accounts().balance(&account)?,
                Target::Block(hash) => self
                    .storage
                    .blocks()
                    .get_info(&hash)?
                    .map(|info| info.amount)
                    .unwrap_or_default(),
            };
            if available < needed {
                return Err(ValidationError::InsufficientFunds { needed, available }.into());
            }
        }
        Ok(())
    }

    /// A nonce needs an account input and must be above the executed count
    pub fn validate_nonce(&self, block: &Block) -> Result<(), ConsensusError> {
        let Some(nonce) = block.tx_nonce() else {
            return Ok(());
        };
        let sender = block.sender().ok_or(ValidationError::OrphanNonce)?;
        let executed = self.storage.accounts().executed_nonce(&sender)?;
        if nonce <= executed {
            return Err(ValidationError::StaleNonce { nonce, executed }.into());
        }
        Ok(())
    }

    /// Account inputs need a signature by the account's key; block inputs
    /// need a signature by a key that also signed the spent block.
    pub fn validate_input_ownership(&self, block: &Block) -> Result<(), ConsensusError> {
        for (index, input) in block.inputs().enumerate() {
            let owned = match input.target {
                Target::Account(account) => block.signatures.iter().any(|s| s.account() == account),
                Target::Block(hash) => {
                    let spent = self
                        .storage
                        .blocks()
                        .get_block(&hash)?
                        .ok_or(ValidationError::UnknownLink(hash))?;
                    block
                        .signatures
                        .iter()
                        .any(|s| spent.signatures.iter().any(|owner| owner.public_key == s.public_key))
                }
            };
            if !owned {
                return Err(ValidationError::MissingSignature(index).into());
            }
        }
        Ok(())
    }
}
