use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::address::{AccountAddress, Address, FieldKind, ParsedAddress, Target, TxNonce};
use crate::constants::SIGNATURE_FIELDS;
use crate::errors::ValidationError;
use crate::sign::BlockSignature;
use crate::{Amount, Hash};
use secp256k1::SecretKey;

/// Link storage sized for the common case of a handful of links
pub type Links = SmallVec<[Address; 8]>;

/// A DAG node. Immutable once built; derived state lives in [`crate::BlockInfo`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Block time in 1/1024 s units
    pub timestamp: u64,
    /// Weight of the proof attached by the producer
    pub difficulty: u64,
    /// Ordered link records
    pub links: Links,
    /// Account transaction sequence number, for account-spending blocks
    pub nonce: Option<TxNonce>,
    /// Declared per-output fee; zero means the protocol minimum
    pub fee: Amount,
    pub signatures: Vec<BlockSignature>,
}

impl Block {
    pub fn new(timestamp: u64, difficulty: u64) -> Self {
        Self {
            timestamp,
            difficulty,
            links: Links::new(),
            nonce: None,
            fee: Amount::ZERO,
            signatures: Vec::new(),
        }
    }

    /// Canonical bytes covered by signatures
    fn signing_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(32 * (self.links.len() + 2));
        out.extend_from_slice(&self.timestamp.to_le_bytes());
        out.extend_from_slice(&self.difficulty.to_le_bytes());
        out.extend_from_slice(&self.fee.units().to_le_bytes());
        for link in &self.links {
            out.push(link.kind().code());
            out.push(link.is_account() as u8);
            out.extend_from_slice(&link.to_raw());
        }
        if let Some(nonce) = &self.nonce {
            out.push(0xff);
            out.extend_from_slice(&nonce.to_raw());
        }
        out
    }

    /// Digest every signature commits to
    pub fn signing_digest(&self) -> Hash {
        Hash::double_sha256(&self.signing_bytes())
    }

    /// Block identity (hashlow of the full block bytes)
    pub fn hash(&self) -> Hash {
        let mut bytes = self.signing_bytes();
        for sig in &self.signatures {
            bytes.extend_from_slice(&sig.public_key);
            bytes.extend_from_slice(&sig.signature);
        }
        Hash::double_sha256(&bytes).hash_low()
    }

    /// Header, links, nonce and signature fields
    pub fn field_count(&self) -> usize {
        1 + self.links.len() + self.nonce.is_some() as usize + SIGNATURE_FIELDS * self.signatures.len()
    }

    /// Rejects blocks with more than `max_fields` fields
    pub fn check_field_count(&self, max_fields: usize) -> Result<(), ValidationError> {
        let count = self.field_count();
        if count > max_fields {
            return Err(ValidationError::TooManyFields(count, max_fields));
        }
        Ok(())
    }

    pub fn parsed_links(&self) -> impl Iterator<Item = ParsedAddress> + '_ {
        self.links.iter().map(Address::parse)
    }

    pub fn inputs(&self) -> impl Iterator<Item = ParsedAddress> + '_ {
        self.parsed_links().filter(|l| l.kind == FieldKind::Input)
    }

    pub fn outputs(&self) -> impl Iterator<Item = ParsedAddress> + '_ {
        self.parsed_links().filter(|l| l.kind == FieldKind::Output)
    }

    /// Every block this block links to, in link order
    pub fn block_links(&self) -> impl Iterator<Item = Hash> + '_ {
        self.parsed_links().filter_map(|l| l.block_hash())
    }

    pub fn has_inputs(&self) -> bool {
        self.inputs().next().is_some()
    }

    /// Reward recipient, present on main-chain candidates
    pub fn coinbase(&self) -> Option<AccountAddress> {
        self.parsed_links()
            .find(|l| l.kind == FieldKind::Coinbase)
            .and_then(|l| l.account())
    }

    /// First account spent from, the owner of the nonce
    pub fn sender(&self) -> Option<AccountAddress> {
        self.inputs().find_map(|l| match l.target {
            Target::Account(account) => Some(account),
            Target::Block(_) => None,
        })
    }

    pub fn tx_nonce(&self) -> Option<u64> {
        self.nonce.map(|n| n.parse())
    }

    /// Appends a signature over the current signing digest
    pub fn sign(&mut self, secret_key: &SecretKey) -> Result<(), ValidationError> {
        let digest = self.signing_digest();
        self.signatures.push(BlockSignature::sign(&digest, secret_key)?);
        Ok(())
    }
}

/// Fluent construction of blocks
pub struct BlockBuilder {
    block: Block,
}

impl BlockBuilder {
    pub fn new(timestamp: u64) -> Self {
        Self { block: Block::new(timestamp, 1) }
    }

    pub fn difficulty(mut self, difficulty: u64) -> Self {
        self.block.difficulty = difficulty;
        self
    }

    pub fn link(mut self, hash: Hash) -> Self {
        self.block.links.push(Address::block(FieldKind::Link, hash, Amount::ZERO));
        self
    }

    pub fn input_block(mut self, hash: Hash, amount: Amount) -> Self {
        self.block.links.push(Address::block(FieldKind::Input, hash, amount));
        self
    }

    pub fn input_account(mut self, account: AccountAddress, amount: Amount) -> Self {
        self.block.links.push(Address::account(FieldKind::Input, account, amount));
        self
    }

    pub fn output_account(mut self, account: AccountAddress, amount: Amount) -> Self {
        self.block.links.push(Address::account(FieldKind::Output, account, amount));
        self
    }

    pub fn output_block(mut self, hash: Hash, amount: Amount) -> Self {
        self.block.links.push(Address::block(FieldKind::Output, hash, amount));
        self
    }

    pub fn coinbase(mut self, account: AccountAddress) -> Self {
        self.block.links.push(Address::account(FieldKind::Coinbase, account, Amount::ZERO));
        self
    }

    pub fn nonce(mut self, nonce: u64) -> Self {
        self.block.nonce = Some(TxNonce::new(nonce));
        self
    }

    pub fn fee(mut self, fee: Amount) -> Self {
        self.block.fee = fee;
        self
    }

    pub fn signed(mut self, secret_key: &SecretKey) -> Result<Self, ValidationError> {
        self.block.sign(secret_key)?;
        Ok(self)
    }

    /// Fields the block would take if built now
    pub fn field_count(&self) -> usize {
        self.block.field_count()
    }

    pub fn build(self) -> Block {
        self.block
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sign::account_of;
    use crate::constants::MAX_BLOCK_FIELDS;

    fn key(seed: u8) -> SecretKey {
        SecretKey::from_slice(&[seed; 32]).unwrap()
    }

    #[test]
    fn hash_is_hash_low_and_covers_signatures() {
        let unsigned = BlockBuilder::new(1000).link(Hash::from_le_u64([0, 1, 2, 3])).build();
        let signed = BlockBuilder::new(1000)
            .link(Hash::from_le_u64([0, 1, 2, 3]))
            .signed(&key(1))
            .unwrap()
            .build();
        assert_eq!(&unsigned.hash().as_bytes()[..8], &[0u8; 8]);
        assert_ne!(unsigned.hash(), signed.hash());
        assert_eq!(unsigned.signing_digest(), signed.signing_digest());
    }

    #[test]
    fn field_count_includes_signature_fields() {
        let sender = account_of(&key(2));
        let block = BlockBuilder::new(0)
            .input_account(sender, Amount::from_coins(1))
            .output_account(AccountAddress::default(), Amount::from_coins(1))
            .nonce(1)
            .signed(&key(2))
            .unwrap()
            .build();
        assert_eq!(block.field_count(), 1 + 2 + 1 + SIGNATURE_FIELDS);
        assert!(block.check_field_count(MAX_BLOCK_FIELDS).is_ok());
        assert_eq!(block.sender(), Some(sender));
        assert_eq!(block.tx_nonce(), Some(1));
    }

    #[test]
    fn field_cap_rejects_oversized_block() {
        let mut builder = BlockBuilder::new(0);
        for i in 0..MAX_BLOCK_FIELDS as u64 {
            builder = builder.link(Hash::from_le_u64([0, i, 0, 0]));
        }
        let block = builder.build();
        assert_eq!(
            block.check_field_count(MAX_BLOCK_FIELDS),
            Err(ValidationError::TooManyFields(MAX_BLOCK_FIELDS + 1, MAX_BLOCK_FIELDS))
        );
    }

    #[test]
    fn coinbase_and_block_links() {
        let miner = account_of(&key(3));
        let prev = Hash::from_le_u64([0, 5, 0, 0]);
        let block = BlockBuilder::new(0).coinbase(miner).link(prev).build();
        assert_eq!(block.coinbase(), Some(miner));
        assert_eq!(block.block_links().collect::<Vec<_>>(), vec![prev]);
        assert!(!block.has_inputs());
    }

    #[test]
    fn serde_keeps_identity() {
        let block = BlockBuilder::new(77).link(Hash::from_le_u64([0, 9, 9, 9])).build();
        let bytes = bincode::serialize(&block).unwrap();
        let back: Block = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back.hash(), block.hash());
    }
}
