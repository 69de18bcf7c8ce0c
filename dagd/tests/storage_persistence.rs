use consensus::pipeline::BlockProcessor;
use consensus_core::block::BlockBuilder;
use consensus_core::{AccountAddress, Amount};
use dagd::config::Config;
use dagd::storage_manager::StorageManager;
use secp256k1::SecretKey;
use tempfile::TempDir;

fn config(dir: &TempDir) -> Config {
    let mut config = Config::for_network("devnet").unwrap();
    config.storage.data_dir = dir.path().join("chain");
    config
}

#[test]
fn chain_state_survives_restart() {
    let tmp = TempDir::new().unwrap();
    let config = config(&tmp);
    let miner = AccountAddress::from_bytes([4; 20]);
    let key = SecretKey::from_slice(&[6; 32]).unwrap();

    let mut last = {
        let storage = StorageManager::new(&config.storage).unwrap();
        assert!(storage.is_persistent());
        let processor = BlockProcessor::new(config.params().unwrap(), storage.consensus_storage()).unwrap();

        let root = BlockBuilder::new(1).signed(&key).unwrap().build();
        processor.process_block(&root).unwrap();
        let mut last = root.hash();
        for t in 1..=4u64 {
            let block = BlockBuilder::new(t * 1000).link(last).coinbase(miner).build();
            assert!(processor.process_block(&block).unwrap().result.is_accepted());
            last = block.hash();
        }
        assert_eq!(processor.stats().nmain, 3);
        storage.close();
        last
    };

    let storage = StorageManager::new(&config.storage).unwrap();
    let processor = BlockProcessor::new(config.params().unwrap(), storage.consensus_storage()).unwrap();
    let stats = processor.stats();
    assert_eq!(stats.nblocks, 5);
    assert_eq!(stats.nmain, 3);
    assert_eq!(stats.top, Some(last));
    assert_eq!(processor.supply(), Amount::from_coins(3 * 1024));

    let next = BlockBuilder::new(5000).link(last).coinbase(miner).build();
    assert!(processor.process_block(&next).unwrap().result.is_accepted());
    last = next.hash();
    assert_eq!(processor.stats().top, Some(last));
    assert_eq!(processor.stats().nmain, 4);
}

#[test]
fn in_memory_storage_creates_nothing_on_disk() {
    let tmp = TempDir::new().unwrap();
    let mut config = config(&tmp);
    config.storage.in_memory = true;

    let storage = StorageManager::new(&config.storage).unwrap();
    assert!(!storage.is_persistent());
    assert!(!config.storage.data_dir.exists());
}
