use crate::cache::WriteThroughCache;
use crate::db::{CF_BLOCKS, CF_BLOCK_INFO, CF_HEIGHTS, CF_TIME_INDEX};
use crate::errors::DbError;
use crate::stores::MetadataStore;
use crate::{Database, DbResult};
use consensus_core::errors::StoreResult;
use consensus_core::hash::HASH_SIZE;
use consensus_core::stores::BlockStore;
use consensus_core::{Block, BlockInfo, ChainStats, Hash, TimeDigest};
use std::sync::Arc;

const TIME_KEY_SIZE: usize = 8 + HASH_SIZE;

fn time_key(timestamp: u64, hash: &Hash) -> [u8; TIME_KEY_SIZE] {
    let mut key = [0u8; TIME_KEY_SIZE];
    key[..8].copy_from_slice(&timestamp.to_be_bytes());
    key[8..].copy_from_slice(hash.as_bytes());
    key
}

fn parse_time_key(key: &[u8]) -> DbResult<(u64, Hash)> {
    if key.len() != TIME_KEY_SIZE {
        return Err(DbError::InvalidData(format!("time index key of {} bytes", key.len())));
    }
    let timestamp = super::decode_u64(&key[..8])?;
    let hash = Hash::try_from_slice(&key[8..]).map_err(|e| DbError::InvalidData(e.to_string()))?;
    Ok((timestamp, hash))
}

/// Blocks, block info, the height index and the time index in RocksDB
pub struct DbBlockStore {
    db: Arc<Database>,
    metadata: MetadataStore,
    blocks: WriteThroughCache<Hash, Block>,
    infos: WriteThroughCache<Hash, BlockInfo>,
}

impl DbBlockStore {
    pub fn new(db: Arc<Database>, cache_size: usize) -> Self {
        Self {
            metadata: MetadataStore::new(db.clone()),
            db,
            blocks: WriteThroughCache::new(cache_size),
            infos: WriteThroughCache::new(cache_size),
        }
    }

    fn read_block(&self, hash: &Hash) -> DbResult<Option<Block>> {
        if let Some(block) = self.blocks.get(hash) {
            return Ok(Some(block));
        }
        match self.db.get(CF_BLOCKS, hash.as_bytes())? {
            Some(data) => {
                let block: Block = bincode::deserialize(&data)?;
                self.blocks.insert(*hash, block.clone());
                Ok(Some(block))
            }
            None => Ok(None),
        }
    }

    fn read_info(&self, hash: &Hash) -> DbResult<Option<BlockInfo>> {
        if let Some(info) = self.infos.get(hash) {
            return Ok(Some(info));
        }
        match self.db.get(CF_BLOCK_INFO, hash.as_bytes())? {
            Some(data) => {
                let info: BlockInfo = bincode::deserialize(&data)?;
                self.infos.insert(*hash, info.clone());
                Ok(Some(info))
            }
            None => Ok(None),
        }
    }

    /// Time index entries in `[from, to)`
    fn time_range(&self, from: u64, to: u64) -> DbResult<Vec<(u64, Hash)>> {
        let start = time_key(from, &Hash::zeroed());
        let to_prefix = to.to_be_bytes();
        self.db
            .scan_from(CF_TIME_INDEX, &start, |key| key.len() >= 8 && key[..8] < to_prefix[..])?
            .iter()
            .map(|(key, _)| parse_time_key(key))
            .collect()
    }

    pub fn count(&self) -> DbResult<usize> {
        Ok(self.db.scan_from(CF_BLOCKS, &[], |_| true)?.len())
    }
}

impl BlockStore for DbBlockStore {
    fn put_block(&self, block: &Block) -> StoreResult<()> {
        let hash = block.hash();
        let mut batch = self.db.batch();
        batch.put_cf(self.db.cf_handle(CF_BLOCKS)?, hash.as_bytes(), bincode::serialize(block).map_err(DbError::from)?);
        batch.put_cf(self.db.cf_handle(CF_TIME_INDEX)?, time_key(block.timestamp, &hash), b"");
        self.db.write_batch(batch)?;
        self.blocks.insert(hash, block.clone());
        Ok(())
    }

    fn get_block(&self, hash: &Hash) -> StoreResult<Option<Block>> {
        Ok(self.read_block(hash)?)
    }

    fn has_block(&self, hash: &Hash) -> StoreResult<bool> {
        if self.blocks.contains(hash) {
            return Ok(true);
        }
        Ok(self.db.exists(CF_BLOCKS, hash.as_bytes())?)
    }

    fn put_info(&self, info: &BlockInfo) -> StoreResult<()> {
        let data = bincode::serialize(info).map_err(DbError::from)?;
        self.db.put(CF_BLOCK_INFO, info.hash.as_bytes(), &data)?;
        self.infos.insert(info.hash, info.clone());
        Ok(())
    }

    fn get_info(&self, hash: &Hash) -> StoreResult<Option<BlockInfo>> {
        Ok(self.read_info(hash)?)
    }

    fn set_height(&self, height: u64, hash: &Hash) -> StoreResult<()> {
        Ok(self.db.put(CF_HEIGHTS, &height.to_be_bytes(), hash.as_bytes())?)
    }

    fn remove_height(&self, height: u64) -> StoreResult<()> {
        Ok(self.db.delete(CF_HEIGHTS, &height.to_be_bytes())?)
    }

    fn hash_by_height(&self, height: u64) -> StoreResult<Option<Hash>> {
        match self.db.get(CF_HEIGHTS, &height.to_be_bytes())? {
            Some(data) => {
                let hash = Hash::try_from_slice(&data).map_err(|e| DbError::InvalidData(e.to_string()))?;
                Ok(Some(hash))
            }
            None => Ok(None),
        }
    }

    fn load_time_digest(&self, from: u64, dt: u64) -> StoreResult<TimeDigest> {
        let mut digest = TimeDigest::default();
        for (timestamp, hash) in self.time_range(from, from.saturating_add(dt))? {
            digest.add(from, dt, timestamp, &hash);
        }
        Ok(digest)
    }

    fn hashes_in_range(&self, from: u64, to: u64) -> StoreResult<Vec<Hash>> {
        Ok(self.time_range(from, to)?.into_iter().map(|(_, hash)| hash).collect())
    }

    fn save_stats(&self, stats: &ChainStats) -> StoreResult<()> {
        Ok(self.metadata.put_stats(stats)?)
    }

    fn load_stats(&self) -> StoreResult<Option<ChainStats>> {
        Ok(self.metadata.get_stats()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use consensus_core::block::BlockBuilder;
    use consensus_core::BlockFlags;
    use tempfile::TempDir;

    fn store(tmp: &TempDir) -> DbBlockStore {
        DbBlockStore::new(Arc::new(Database::open(tmp.path()).unwrap()), 16)
    }

    #[test]
    fn time_range_queries() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let a = BlockBuilder::new(10).build();
        let b = BlockBuilder::new(20).difficulty(2).build();
        let c = BlockBuilder::new(40).difficulty(3).build();
        for block in [&a, &b, &c] {
            store.put_block(block).unwrap();
        }

        assert_eq!(store.hashes_in_range(10, 40).unwrap(), vec![a.hash(), b.hash()]);
        let digest = store.load_time_digest(0, 32).unwrap();
        assert_eq!(digest.block_count(), 2);
        assert_eq!(digest.buckets[5].count, 1);
        assert_eq!(digest.buckets[10].count, 1);
        assert!(store.load_time_digest(64, 64).unwrap().is_empty());
        assert_eq!(store.count().unwrap(), 3);
    }

    #[test]
    fn info_and_heights() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let block = BlockBuilder::new(7).build();
        let mut info = BlockInfo::new(block.hash(), 7);
        info.flags.insert(BlockFlags::MAIN | BlockFlags::MAIN_CHAIN);
        info.height = Some(1);

        store.put_block(&block).unwrap();
        store.put_info(&info).unwrap();
        store.set_height(1, &block.hash()).unwrap();

        assert_eq!(store.get_info(&block.hash()).unwrap(), Some(info));
        assert_eq!(store.hash_by_height(1).unwrap(), Some(block.hash()));
        store.remove_height(1).unwrap();
        assert_eq!(store.hash_by_height(1).unwrap(), None);
    }
}
