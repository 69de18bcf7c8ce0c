use crate::config::StorageConfig;
use consensus::consensus::storage::ConsensusStorage;
use database::DbStores;
use std::path::Path;
use tracing::info;

/// Opens the stores the consensus engine runs on
pub struct StorageManager {
    config: StorageConfig,
    consensus_storage: ConsensusStorage,
    db: Option<DbStores>,
}

impl StorageManager {
    pub fn new(config: &StorageConfig) -> Result<Self, String> {
        if config.in_memory {
            info!("using in-memory storage");
            return Ok(Self { config: config.clone(), consensus_storage: ConsensusStorage::in_memory(), db: None });
        }

        if !config.data_dir.exists() {
            std::fs::create_dir_all(&config.data_dir)
                .map_err(|e| format!("Failed to create data directory: {}", e))?;
        }
        let stores = DbStores::open(&config.data_dir, &config.db).map_err(|e| format!("Failed to open DB: {}", e))?;
        let consensus_storage =
            ConsensusStorage::new(stores.blocks.clone(), stores.accounts.clone(), stores.orphans.clone());

        Ok(Self { config: config.clone(), consensus_storage, db: Some(stores) })
    }

    pub fn consensus_storage(&self) -> ConsensusStorage {
        self.consensus_storage.clone()
    }

    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    pub fn is_persistent(&self) -> bool {
        self.db.is_some()
    }

    pub fn close(&self) {
        if let Some(stores) = &self.db {
            stores.close();
        }
    }
}
