#[cfg(test)]
mod integration_tests {
    use crate::consensus::storage::memory::MemoryBlockStore;
    use crate::process::sync::*;
    use async_trait::async_trait;
    use consensus_core::block::BlockBuilder;
    use consensus_core::errors::StoreResult;
    use consensus_core::state::NodeState;
    use consensus_core::stores::BlockStore;
    use consensus_core::{NetworkType, TimeDigest};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::{Arc, Weak};
    use std::time::Duration;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Sent {
        Sums(u64, u64),
        Blocks(u64, u64),
    }

    struct TestChain {
        store: MemoryBlockStore,
        last_main: AtomicU64,
        state: Mutex<NodeState>,
    }

    impl TestChain {
        fn with_blocks(times: &[u64]) -> Arc<Self> {
            let store = MemoryBlockStore::new();
            for (i, t) in times.iter().enumerate() {
                store.put_block(&BlockBuilder::new(*t).difficulty(i as u64 + 1).build()).unwrap();
            }
            Arc::new(Self {
                store,
                last_main: AtomicU64::new(0),
                state: Mutex::new(NodeState::Connected(NetworkType::Devnet)),
            })
        }
    }

    impl LocalChain for TestChain {
        fn load_time_digest(&self, from: u64, dt: u64) -> StoreResult<TimeDigest> {
            self.store.load_time_digest(from, dt)
        }

        fn last_main_time(&self) -> StoreResult<u64> {
            Ok(self.last_main.load(Ordering::SeqCst))
        }

        fn node_state(&self) -> NodeState {
            *self.state.lock()
        }

        fn set_sync_old(&self) {
            *self.state.lock() = NodeState::SyncingOld(NetworkType::Devnet);
        }
    }

    /// Peer answering from its own block store, or staying silent
    struct TestPeer {
        remote: MemoryBlockStore,
        responsive: bool,
        active: AtomicBool,
        sent: Mutex<Vec<Sent>>,
        process: Mutex<Weak<SyncProcess>>,
    }

    impl TestPeer {
        fn new(times: &[u64], responsive: bool) -> Arc<Self> {
            let remote = MemoryBlockStore::new();
            for (i, t) in times.iter().enumerate() {
                remote.put_block(&BlockBuilder::new(*t).difficulty(i as u64 + 1).build()).unwrap();
            }
            Arc::new(Self {
                remote,
                responsive,
                active: AtomicBool::new(true),
                sent: Mutex::new(Vec::new()),
                process: Mutex::new(Weak::new()),
            })
        }

        fn sent(&self) -> Vec<Sent> {
            self.sent.lock().clone()
        }

        fn reply(&self, request_id: u64, reply: Reply) {
            if let Some(process) = self.process.lock().upgrade() {
                process.complete(request_id, reply);
            }
        }
    }

    #[async_trait]
    impl SyncChannel for TestPeer {
        fn id(&self) -> String {
            "test-peer".to_string()
        }

        fn is_active(&self) -> bool {
            self.active.load(Ordering::SeqCst)
        }

        async fn send_get_sums(&self, request_id: u64, from: u64, to: u64) -> Result<(), SyncError> {
            self.sent.lock().push(Sent::Sums(from, to));
            if self.responsive {
                let digest = self.remote.load_time_digest(from, to - from)?;
                self.reply(request_id, Reply::Sums(digest));
            }
            Ok(())
        }

        async fn send_get_blocks(&self, request_id: u64, from: u64, to: u64) -> Result<(), SyncError> {
            self.sent.lock().push(Sent::Blocks(from, to));
            if self.responsive {
                self.reply(request_id, Reply::BlocksDone);
            }
            Ok(())
        }
    }

    struct Peers(Vec<Arc<TestPeer>>);

    impl ChannelProvider for Peers {
        fn active_channels(&self) -> Vec<Arc<dyn SyncChannel>> {
            self.0.iter().filter(|p| p.is_active()).map(|p| p.clone() as Arc<dyn SyncChannel>).collect()
        }
    }

    fn process(chain: Arc<TestChain>, peer: &Arc<TestPeer>) -> Arc<SyncProcess> {
        let config = SyncConfig { request_timeout: Duration::from_secs(2), ..SyncConfig::default() };
        let process = Arc::new(SyncProcess::new(config, chain, Arc::new(Peers(vec![peer.clone()]))));
        *peer.process.lock() = Arc::downgrade(&process);
        process.begin();
        process
    }

    const BUCKET: u64 = 1 << 44;

    #[tokio::test]
    async fn test_probe_descends_only_into_differing_bucket() {
        let shared = 5 * BUCKET + 100;
        let chain = TestChain::with_blocks(&[shared, 2 * BUCKET + 7]);
        let peer = TestPeer::new(&[shared, 2 * BUCKET + 7, 5 * BUCKET + 300], true);
        let sync = process(chain.clone(), &peer);

        sync.probe(0, SYNC_TIME_DOMAIN).await;

        let sent = peer.sent();
        assert_eq!(sent[0], Sent::Sums(0, SYNC_TIME_DOMAIN));
        assert_eq!(sent[1], Sent::Sums(5 * BUCKET, 6 * BUCKET));
        // 2^48 down to 2^24 in steps of 16, then 2^20 is fetched
        assert_eq!(sent.len(), 7);
        for request in &sent[1..] {
            match request {
                Sent::Sums(from, to) => assert!(*from >= 5 * BUCKET && *to <= 6 * BUCKET),
                Sent::Blocks(..) => panic!("probe must not fetch"),
            }
        }
        assert_eq!(sync.queued_times(), vec![5 * BUCKET]);
        assert!(chain.node_state().is_syncing_old());
        assert!(sync.requests().is_empty());
    }

    #[tokio::test]
    async fn test_identical_peers_queue_nothing() {
        let chain = TestChain::with_blocks(&[10, 20, BUCKET]);
        let peer = TestPeer::new(&[10, 20, BUCKET], true);
        let sync = process(chain.clone(), &peer);

        sync.probe(0, SYNC_TIME_DOMAIN).await;
        assert_eq!(peer.sent().len(), 1);
        assert!(sync.queued_times().is_empty());
        assert_eq!(chain.node_state(), NodeState::Connected(NetworkType::Devnet));
    }

    #[tokio::test]
    async fn test_empty_local_range_aborts_probe() {
        let chain = TestChain::with_blocks(&[]);
        let peer = TestPeer::new(&[42], true);
        let sync = process(chain, &peer);

        sync.probe(0, SYNC_TIME_DOMAIN).await;
        assert!(peer.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_request_leaves_no_pending_entry() {
        let chain = TestChain::with_blocks(&[10]);
        let peer = TestPeer::new(&[10, 11], false);
        let sync = process(chain, &peer);

        sync.probe(0, SYNC_TIME_DOMAIN).await;
        assert_eq!(peer.sent().len(), 1);
        assert!(sync.requests().is_empty());
        assert!(sync.queued_times().is_empty());
    }

    #[tokio::test]
    async fn test_stop_ignores_late_completions() {
        let chain = TestChain::with_blocks(&[10]);
        let peer = TestPeer::new(&[10], false);
        let sync = process(chain, &peer);
        let (id, _rx) = sync.requests().register().unwrap();

        sync.stop();
        assert_eq!(sync.status(), SyncStatus::SyncDone);
        assert!(!sync.complete(id, Reply::BlocksDone));
        assert!(sync.requests().is_empty());

        sync.probe(0, SYNC_TIME_DOMAIN).await;
        assert!(peer.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_inflight_wait() {
        let chain = TestChain::with_blocks(&[10]);
        let peer = TestPeer::new(&[10, 11], false);
        let sync = process(chain, &peer);

        let probing = {
            let sync = sync.clone();
            tokio::spawn(async move { sync.probe(0, SYNC_TIME_DOMAIN).await })
        };
        tokio::task::yield_now().await;
        sync.stop();
        probing.await.unwrap();
        assert!(sync.requests().is_empty());
    }

    #[tokio::test]
    async fn test_drain_skips_old_ranges_and_requests_the_rest() {
        let chain = TestChain::with_blocks(&[]);
        let peer = TestPeer::new(&[], true);
        let sync = process(chain.clone(), &peer);
        let span = REQUEST_BLOCKS_MAX_TIME;
        for i in 1..=4 {
            sync.enqueue(i * span);
        }
        sync.enqueue(span);
        assert_eq!(sync.queued_times().len(), 4);

        chain.last_main.store(2 * span + 1, Ordering::SeqCst);
        sync.drain().await;

        assert_eq!(sync.queued_times(), vec![3 * span, 4 * span]);
        assert_eq!(
            peer.sent(),
            vec![Sent::Blocks(3 * span, 4 * span), Sent::Blocks(4 * span, 5 * span)]
        );

        sync.drain().await;
        assert_eq!(peer.sent().len(), 3);
    }

    /// Hands out its peer whether or not the peer is still active
    struct Pinned(Arc<TestPeer>);

    impl ChannelProvider for Pinned {
        fn active_channels(&self) -> Vec<Arc<dyn SyncChannel>> {
            vec![self.0.clone() as Arc<dyn SyncChannel>]
        }
    }

    #[tokio::test]
    async fn test_drain_aborts_on_inactive_channel() {
        let peer = TestPeer::new(&[], true);
        peer.active.store(false, Ordering::SeqCst);
        let sync = SyncProcess::new(SyncConfig::default(), TestChain::with_blocks(&[]), Arc::new(Pinned(peer.clone())));
        sync.begin();
        sync.enqueue(REQUEST_BLOCKS_MAX_TIME);

        sync.drain().await;

        assert!(peer.sent().is_empty());
        assert_eq!(sync.queued_times(), vec![REQUEST_BLOCKS_MAX_TIME]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_runs_after_initial_delay() {
        let chain = TestChain::with_blocks(&[10]);
        let peer = TestPeer::new(&[10], true);
        let config = SyncConfig {
            initial_delay: Duration::from_secs(32),
            period: Duration::from_secs(10),
            ..SyncConfig::default()
        };
        let sync = Arc::new(SyncProcess::new(config, chain, Arc::new(Peers(vec![peer.clone()]))));
        *peer.process.lock() = Arc::downgrade(&sync);

        let handle = sync.start();
        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(peer.sent().is_empty());
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(peer.sent(), vec![Sent::Sums(0, SYNC_TIME_DOMAIN)]);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(peer.sent().len(), 2);

        sync.stop();
        handle.await.unwrap();
    }
}
