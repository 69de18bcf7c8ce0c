//! RocksDB-backed storage for the block-DAG node
//!
//! Implements the consensus store traits over one RocksDB instance with a
//! column family per table.

pub mod cache;
pub mod db;
pub mod errors;
pub mod stores;

pub use db::{Database, DbConfig};
pub use errors::{DbError, DbResult};
pub use stores::{DbAccountStore, DbBlockStore, DbOrphanStore, MetadataStore};

use std::path::Path;
use std::sync::Arc;

/// Every store the consensus engine needs, sharing one database
pub struct DbStores {
    pub db: Arc<Database>,
    pub blocks: Arc<DbBlockStore>,
    pub accounts: Arc<DbAccountStore>,
    pub orphans: Arc<DbOrphanStore>,
}

impl DbStores {
    pub fn open<P: AsRef<Path>>(path: P, config: &DbConfig) -> DbResult<Self> {
        let db = Arc::new(Database::open_with(path, config)?);
        Ok(Self {
            blocks: Arc::new(DbBlockStore::new(db.clone(), config.cache_size)),
            accounts: Arc::new(DbAccountStore::new(db.clone())),
            orphans: Arc::new(DbOrphanStore::new(db.clone())),
            db,
        })
    }

    pub fn close(&self) {
        self.db.close();
    }
}
