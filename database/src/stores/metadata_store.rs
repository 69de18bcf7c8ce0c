use crate::db::CF_METADATA;
use crate::{Database, DbResult};
use consensus_core::ChainStats;
use std::sync::Arc;

const STATS_KEY: &str = "stats";
const ORPHAN_SIZE_KEY: &str = "ORPHAN_SIZE";

/// Named singleton records: chain statistics and the orphan counter
pub struct MetadataStore {
    db: Arc<Database>,
}

impl MetadataStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn put(&self, key: &str, value: &[u8]) -> DbResult<()> {
        self.db.put(CF_METADATA, key.as_bytes(), value)
    }

    pub fn get(&self, key: &str) -> DbResult<Option<Vec<u8>>> {
        self.db.get(CF_METADATA, key.as_bytes())
    }

    pub fn delete(&self, key: &str) -> DbResult<()> {
        self.db.delete(CF_METADATA, key.as_bytes())
    }

    pub fn put_stats(&self, stats: &ChainStats) -> DbResult<()> {
        self.put(STATS_KEY, &bincode::serialize(stats)?)
    }

    pub fn get_stats(&self) -> DbResult<Option<ChainStats>> {
        match self.get(STATS_KEY)? {
            Some(data) => Ok(Some(bincode::deserialize(&data)?)),
            None => Ok(None),
        }
    }

    pub fn orphan_size(&self) -> DbResult<u64> {
        Ok(self.get(ORPHAN_SIZE_KEY)?.as_deref().map(super::decode_u64).transpose()?.unwrap_or(0))
    }

    pub fn set_orphan_size(&self, size: u64) -> DbResult<()> {
        self.put(ORPHAN_SIZE_KEY, &size.to_be_bytes())
    }
}
