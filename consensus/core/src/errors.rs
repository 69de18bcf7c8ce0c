use crate::{Amount, Hash};
use thiserror::Error;

/// Reasons a block is rejected at ingestion. A rejected block leaves no trace.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Block has {0} fields, more than the allowed {1}")]
    TooManyFields(usize, usize),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Input {0} is not signed by its owner")]
    MissingSignature(usize),

    #[error("Unknown link target {0}")]
    UnknownLink(Hash),

    #[error("Insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: Amount, available: Amount },

    #[error("Output {index} of {amount} is below the fee {fee}")]
    OutputBelowFee { index: usize, amount: Amount, fee: Amount },

    #[error("Declared fee {0} is below the minimum {1}")]
    FeeBelowMinimum(Amount, Amount),

    #[error("Outputs exceed inputs")]
    OutputsExceedInputs,

    #[error("Amount overflow")]
    AmountOverflow,

    #[error("Stale nonce {nonce}, account already executed {executed}")]
    StaleNonce { nonce: u64, executed: u64 },

    #[error("Nonce field without an account input")]
    OrphanNonce,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Missing record: {0}")]
    NotFound(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum ConsensusError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Unknown block {0}")]
    UnknownBlock(Hash),

    #[error("Block {0} is not a main block")]
    NotMain(Hash),

    #[error("Main block {hash} at height {height} is below the top main height {top}")]
    NotHighestMain { hash: Hash, height: u64, top: u64 },

    #[error("Inconsistent chain state: {0}")]
    Inconsistent(String),
}

pub type ConsensusResult<T> = Result<T, ConsensusError>;
