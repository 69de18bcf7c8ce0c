use crate::errors::{DbError, DbResult};
use parking_lot::RwLock;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, Direction, IteratorMode, Options, WriteBatch, DB};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub const CF_BLOCKS: &str = "blocks";
pub const CF_BLOCK_INFO: &str = "block_info";
pub const CF_HEIGHTS: &str = "heights";
pub const CF_TIME_INDEX: &str = "time_index";
pub const CF_ORPHANS: &str = "orphans";
pub const CF_ACCOUNTS: &str = "accounts";
pub const CF_METADATA: &str = "metadata";

const COLUMN_FAMILIES: [&str; 7] =
    [CF_BLOCKS, CF_BLOCK_INFO, CF_HEIGHTS, CF_TIME_INDEX, CF_ORPHANS, CF_ACCOUNTS, CF_METADATA];

/// Tuning knobs for the RocksDB instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// Block and block-info records kept in the write-through caches
    pub cache_size: usize,
    pub max_open_files: i32,
    pub write_buffer_size: usize,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self { cache_size: 4096, max_open_files: 10000, write_buffer_size: 64 * 1024 * 1024 }
    }
}

pub struct Database {
    db: Arc<DB>,
    is_closed: Arc<RwLock<bool>>,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        Self::open_with(path, &DbConfig::default())
    }

    pub fn open_with<P: AsRef<Path>>(path: P, config: &DbConfig) -> DbResult<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_max_open_files(config.max_open_files);
        opts.set_keep_log_file_num(10);
        opts.set_max_background_jobs(4);
        opts.set_bytes_per_sync(1048576);
        opts.increase_parallelism(4);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_max_write_buffer_number(3);

        let cf_descriptors: Vec<_> = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect();

        let db = DB::open_cf_descriptors(&opts, path.as_ref(), cf_descriptors)?;
        info!("opened database at {}", path.as_ref().display());
        Ok(Self { db: Arc::new(db), is_closed: Arc::new(RwLock::new(false)) })
    }

    fn check_closed(&self) -> DbResult<()> {
        if *self.is_closed.read() {
            return Err(DbError::DatabaseClosed);
        }
        Ok(())
    }

    pub fn cf_handle(&self, cf_name: &str) -> DbResult<&ColumnFamily> {
        self.db.cf_handle(cf_name).ok_or_else(|| DbError::ColumnFamilyNotFound(cf_name.to_string()))
    }

    pub fn put(&self, cf_name: &str, key: &[u8], value: &[u8]) -> DbResult<()> {
        self.check_closed()?;
        let cf = self.cf_handle(cf_name)?;
        self.db.put_cf(cf, key, value)?;
        Ok(())
    }

    pub fn get(&self, cf_name: &str, key: &[u8]) -> DbResult<Option<Vec<u8>>> {
        self.check_closed()?;
        let cf = self.cf_handle(cf_name)?;
        Ok(self.db.get_cf(cf, key)?)
    }

    pub fn delete(&self, cf_name: &str, key: &[u8]) -> DbResult<()> {
        self.check_closed()?;
        let cf = self.cf_handle(cf_name)?;
        self.db.delete_cf(cf, key)?;
        Ok(())
    }

    pub fn exists(&self, cf_name: &str, key: &[u8]) -> DbResult<bool> {
        self.check_closed()?;
        let cf = self.cf_handle(cf_name)?;
        Ok(self.db.get_pinned_cf(cf, key)?.is_some())
    }

    pub fn batch(&self) -> WriteBatch {
        WriteBatch::default()
    }

    pub fn write_batch(&self, batch: WriteBatch) -> DbResult<()> {
        self.check_closed()?;
        self.db.write(batch)?;
        Ok(())
    }

    /// Key/value pairs from `start` onward, in key order, while `keep` holds
    pub fn scan_from(
        &self,
        cf_name: &str,
        start: &[u8],
        mut keep: impl FnMut(&[u8]) -> bool,
    ) -> DbResult<Vec<(Box<[u8]>, Box<[u8]>)>> {
        self.check_closed()?;
        let cf = self.cf_handle(cf_name)?;
        let mut out = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::From(start, Direction::Forward)) {
            let (key, value) = item?;
            if !keep(&key) {
                break;
            }
            out.push((key, value));
        }
        Ok(out)
    }

    /// All pairs whose key starts with `prefix`
    pub fn scan_prefix(&self, cf_name: &str, prefix: &[u8]) -> DbResult<Vec<(Box<[u8]>, Box<[u8]>)>> {
        self.scan_from(cf_name, prefix, |key| key.starts_with(prefix))
    }

    pub fn close(&self) {
        *self.is_closed.write() = true;
        info!("database closed");
    }

    pub fn is_closed(&self) -> bool {
        *self.is_closed.read()
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), is_closed: self.is_closed.clone() }
    }
}
