//! Orphan index in RocksDB
//!
//! Key: `0x00 ‖ hashlow[8..32] ‖ nonce (BE) ‖ is_tx`. Value:
//! `time (BE) ‖ fee (BE) ‖ account`, an all-zero account meaning none.

use crate::db::CF_ORPHANS;
use crate::errors::DbError;
use crate::stores::MetadataStore;
use crate::{Database, DbResult};
use consensus_core::address::ACCOUNT_SIZE;
use consensus_core::errors::StoreResult;
use consensus_core::hash::HASH_LOW_FRAGMENT;
use consensus_core::stores::{OrphanEntry, OrphanStore};
use consensus_core::{AccountAddress, Amount, Hash};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::trace;

const ORPHAN_PREFIX: u8 = 0x00;
const KEY_SIZE: usize = 1 + HASH_LOW_FRAGMENT + 8 + 1;
const VALUE_SIZE: usize = 8 + 8 + ACCOUNT_SIZE;

fn key_prefix(hash: &Hash) -> [u8; 1 + HASH_LOW_FRAGMENT] {
    let mut prefix = [0u8; 1 + HASH_LOW_FRAGMENT];
    prefix[0] = ORPHAN_PREFIX;
    prefix[1..].copy_from_slice(&hash.low_fragment());
    prefix
}

pub(crate) fn encode_key(entry: &OrphanEntry) -> [u8; KEY_SIZE] {
    let mut key = [0u8; KEY_SIZE];
    key[..1 + HASH_LOW_FRAGMENT].copy_from_slice(&key_prefix(&entry.hash));
    key[1 + HASH_LOW_FRAGMENT..KEY_SIZE - 1].copy_from_slice(&entry.nonce.to_be_bytes());
    key[KEY_SIZE - 1] = entry.is_tx as u8;
    key
}

fn encode_value(entry: &OrphanEntry) -> [u8; VALUE_SIZE] {
    let mut value = [0u8; VALUE_SIZE];
    value[..8].copy_from_slice(&entry.time.to_be_bytes());
    value[8..16].copy_from_slice(&entry.fee.units().to_be_bytes());
    if let Some(account) = entry.account {
        value[16..].copy_from_slice(account.as_bytes());
    }
    value
}

pub(crate) fn decode_entry(key: &[u8], value: &[u8]) -> DbResult<OrphanEntry> {
    if key.len() != KEY_SIZE || key[0] != ORPHAN_PREFIX || value.len() != VALUE_SIZE {
        return Err(DbError::InvalidData(format!("orphan record {}+{} bytes", key.len(), value.len())));
    }
    let hash = Hash::from_low_fragment(&key[1..1 + HASH_LOW_FRAGMENT])
        .ok_or_else(|| DbError::InvalidData("orphan hash fragment".to_string()))?;
    let account = AccountAddress::try_from_slice(&value[16..])
        .filter(|account| *account != AccountAddress::default());
    Ok(OrphanEntry {
        hash,
        nonce: super::decode_u64(&key[1 + HASH_LOW_FRAGMENT..KEY_SIZE - 1])?,
        is_tx: key[KEY_SIZE - 1] != 0,
        time: super::decode_u64(&value[..8])?,
        fee: Amount::from_units(super::decode_u64(&value[8..16])?),
        account,
    })
}

/// Orphan entries with a persisted size counter
pub struct DbOrphanStore {
    db: Arc<Database>,
    metadata: MetadataStore,
    // Serializes the read-modify-write of the size counter
    write_lock: Mutex<()>,
}

impl DbOrphanStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { metadata: MetadataStore::new(db.clone()), db, write_lock: Mutex::new(()) }
    }

    fn keys_for(&self, hash: &Hash) -> DbResult<Vec<Box<[u8]>>> {
        Ok(self.db.scan_prefix(CF_ORPHANS, &key_prefix(hash))?.into_iter().map(|(key, _)| key).collect())
    }
}

impl OrphanStore for DbOrphanStore {
    fn add(&self, entry: &OrphanEntry) -> StoreResult<()> {
        let _guard = self.write_lock.lock();
        let fresh = self.keys_for(&entry.hash)?.is_empty();
        self.db.put(CF_ORPHANS, &encode_key(entry), &encode_value(entry))?;
        if fresh {
            let size = self.metadata.orphan_size()?;
            self.metadata.set_orphan_size(size + 1)?;
        }
        trace!("orphan added {}", entry.hash);
        Ok(())
    }

    fn remove(&self, hash: &Hash) -> StoreResult<bool> {
        let _guard = self.write_lock.lock();
        let keys = self.keys_for(hash)?;
        if keys.is_empty() {
            return Ok(false);
        }
        for key in keys {
            self.db.delete(CF_ORPHANS, &key)?;
        }
        let size = self.metadata.orphan_size()?;
        self.metadata.set_orphan_size(size.saturating_sub(1))?;
        Ok(true)
    }

    fn contains(&self, hash: &Hash) -> StoreResult<bool> {
        Ok(!self.keys_for(hash)?.is_empty())
    }

    fn entries(&self) -> StoreResult<Vec<OrphanEntry>> {
        let records = self.db.scan_prefix(CF_ORPHANS, &[ORPHAN_PREFIX])?;
        let mut entries = Vec::with_capacity(records.len());
        for (key, value) in records {
            entries.push(decode_entry(&key, &value)?);
        }
        Ok(entries)
    }

    fn count(&self) -> StoreResult<u64> {
        Ok(self.metadata.orphan_size()?)
    }
}
