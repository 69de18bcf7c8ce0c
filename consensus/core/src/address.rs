//! Link records embedded in a block's field list
//!
//! A link record exists either in its raw 32-byte wire form or in parsed form.
//! Both are variants of [`Address`]; `parse` is a pure function from one to the
//! other and `to_raw` its inverse, so either representation can be held
//! without lazy mutable state.

use crate::{Amount, Hash};
use ripemd::Ripemd160;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

pub const RAW_FIELD_SIZE: usize = 32;
pub const ACCOUNT_SIZE: usize = 20;

/// Role of a link inside a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    /// Spends from an account or block balance; must be signed
    Input,
    /// Credits an account or block
    Output,
    /// Output without signature requirement, used only for DAG topology
    Link,
    /// Identifies the reward recipient of a main-chain candidate
    Coinbase,
}

impl FieldKind {
    pub fn code(&self) -> u8 {
        match self {
            FieldKind::Input => 0,
            FieldKind::Output => 1,
            FieldKind::Link => 2,
            FieldKind::Coinbase => 3,
        }
    }
}

/// 20-byte account identifier derived from a compressed public key
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountAddress([u8; ACCOUNT_SIZE]);

impl AccountAddress {
    pub const fn from_bytes(bytes: [u8; ACCOUNT_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ACCOUNT_SIZE] {
        &self.0
    }

    /// RIPEMD-160 of SHA-256 of the serialized public key.
    pub fn from_public_key(public_key: &[u8]) -> Self {
        let sha = Sha256::digest(public_key);
        let ripe = Ripemd160::digest(sha);
        let mut out = [0u8; ACCOUNT_SIZE];
        out.copy_from_slice(&ripe);
        Self(out)
    }

    pub fn try_from_slice(slice: &[u8]) -> Option<Self> {
        let bytes: [u8; ACCOUNT_SIZE] = slice.try_into().ok()?;
        Some(Self(bytes))
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Account({})", hex::encode(self.0))
    }
}

/// What a link points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Target {
    Block(Hash),
    Account(AccountAddress),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParsedAddress {
    pub kind: FieldKind,
    pub target: Target,
    pub amount: Amount,
}

impl ParsedAddress {
    pub fn is_account(&self) -> bool {
        matches!(self.target, Target::Account(_))
    }

    pub fn block_hash(&self) -> Option<Hash> {
        match self.target {
            Target::Block(hash) => Some(hash),
            Target::Account(_) => None,
        }
    }

    pub fn account(&self) -> Option<AccountAddress> {
        match self.target {
            Target::Account(account) => Some(account),
            Target::Block(_) => None,
        }
    }

    /// Raw wire form: amount in bytes 0..8, then the hashlow fragment or the
    /// account padded with zeros.
    pub fn to_raw(&self) -> [u8; RAW_FIELD_SIZE] {
        let mut raw = [0u8; RAW_FIELD_SIZE];
        raw[..8].copy_from_slice(&self.amount.units().to_le_bytes());
        match self.target {
            Target::Block(hash) => raw[8..].copy_from_slice(&hash.low_fragment()),
            Target::Account(account) => raw[8..8 + ACCOUNT_SIZE].copy_from_slice(account.as_bytes()),
        }
        raw
    }
}

/// A link record in either representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Address {
    Raw {
        kind: FieldKind,
        is_account: bool,
        bytes: [u8; RAW_FIELD_SIZE],
    },
    Parsed(ParsedAddress),
}

impl Address {
    pub fn block(kind: FieldKind, hash: Hash, amount: Amount) -> Self {
        Address::Parsed(ParsedAddress { kind, target: Target::Block(hash.hash_low()), amount })
    }

    pub fn account(kind: FieldKind, account: AccountAddress, amount: Amount) -> Self {
        Address::Parsed(ParsedAddress { kind, target: Target::Account(account), amount })
    }

    pub fn from_raw(kind: FieldKind, is_account: bool, bytes: [u8; RAW_FIELD_SIZE]) -> Self {
        Address::Raw { kind, is_account, bytes }
    }

    /// Decodes the raw form; a parsed address is returned as is.
    pub fn parse(&self) -> ParsedAddress {
        match *self {
            Address::Parsed(parsed) => parsed,
            Address::Raw { kind, is_account, bytes } => {
                let mut word = [0u8; 8];
                word.copy_from_slice(&bytes[..8]);
                let amount = Amount::from_units(u64::from_le_bytes(word));
                let target = if is_account {
                    let mut account = [0u8; ACCOUNT_SIZE];
                    account.copy_from_slice(&bytes[8..8 + ACCOUNT_SIZE]);
                    Target::Account(AccountAddress::from_bytes(account))
                } else {
                    let mut hash = [0u8; 32];
                    hash[8..].copy_from_slice(&bytes[8..]);
                    Target::Block(Hash::from_bytes(hash))
                };
                ParsedAddress { kind, target, amount }
            }
        }
    }

    /// Consumes the raw form, leaving the parsed one.
    pub fn into_parsed(self) -> Self {
        Address::Parsed(self.parse())
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, Address::Parsed(_))
    }

    pub fn to_raw(&self) -> [u8; RAW_FIELD_SIZE] {
        match self {
            Address::Raw { bytes, .. } => *bytes,
            Address::Parsed(parsed) => parsed.to_raw(),
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Address::Raw { kind, .. } => *kind,
            Address::Parsed(parsed) => parsed.kind,
        }
    }

    pub fn is_account(&self) -> bool {
        match self {
            Address::Raw { is_account, .. } => *is_account,
            Address::Parsed(parsed) => parsed.is_account(),
        }
    }

    pub fn amount(&self) -> Amount {
        self.parse().amount
    }

    pub fn target(&self) -> Target {
        self.parse().target
    }
}

impl From<ParsedAddress> for Address {
    fn from(parsed: ParsedAddress) -> Self {
        Address::Parsed(parsed)
    }
}

/// Account transaction sequence number carried by a nonce field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxNonce {
    Raw([u8; RAW_FIELD_SIZE]),
    Parsed(u64),
}

impl TxNonce {
    pub fn new(nonce: u64) -> Self {
        TxNonce::Parsed(nonce)
    }

    pub fn parse(&self) -> u64 {
        match self {
            TxNonce::Parsed(nonce) => *nonce,
            TxNonce::Raw(bytes) => {
                let mut word = [0u8; 8];
                word.copy_from_slice(&bytes[..8]);
                u64::from_le_bytes(word)
            }
        }
    }

    pub fn into_parsed(self) -> Self {
        TxNonce::Parsed(self.parse())
    }

    pub fn to_raw(&self) -> [u8; RAW_FIELD_SIZE] {
        match self {
            TxNonce::Raw(bytes) => *bytes,
            TxNonce::Parsed(nonce) => {
                let mut raw = [0u8; RAW_FIELD_SIZE];
                raw[..8].copy_from_slice(&nonce.to_le_bytes());
                raw
            }
        }
    }
}
