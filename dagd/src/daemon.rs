use crate::config::Config;
use crate::storage_manager::StorageManager;
use crate::ui;
use consensus::pipeline::BlockProcessor;
use consensus::process::sync::{LocalChain, SyncProcess};
use consensus_core::state::NodeState;
use consensus_core::NetworkType;
use network::{connection, Hub, MessageHandler};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::signal;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};
use tracing::{info, warn};

const STATUS_PERIOD: Duration = Duration::from_secs(30);

pub struct Daemon {
    config: Config,
    network: NetworkType,
    storage: StorageManager,
    processor: Arc<BlockProcessor>,
    hub: Arc<Hub>,
    sync: Arc<SyncProcess>,
    handler: Arc<MessageHandler>,
    shutdown_tx: watch::Sender<bool>,
}

impl Daemon {
    /// Opens storage and wires the node together
    pub fn new(config: Config) -> Result<Self, String> {
        ui::print_section("Initializing Components");
        let network = config.network_type()?;
        let params = config.params()?;

        info!("Initializing storage at {:?}", config.storage.data_dir);
        let storage = StorageManager::new(&config.storage)?;

        info!("Loading chain state");
        let processor = Arc::new(
            BlockProcessor::new(params, storage.consensus_storage())
                .map_err(|e| format!("Failed to load chain state: {}", e))?,
        );
        processor.set_node_state(NodeState::Loading);
        let stats = processor.stats();
        info!("chain loaded: {} blocks, {} main", stats.nblocks, stats.nmain);

        let hub = Arc::new(Hub::new());
        let sync = Arc::new(SyncProcess::new(config.sync.clone(), processor.clone(), hub.clone()));
        let handler = Arc::new(MessageHandler::new(processor.clone(), sync.clone(), hub.clone()));
        let (shutdown_tx, _) = watch::channel(false);

        ui::print_status("✓", "All components initialized successfully", ui::StatusType::Success);
        Ok(Self { config, network, storage, processor, hub, sync, handler, shutdown_tx })
    }

    pub fn processor(&self) -> &Arc<BlockProcessor> {
        &self.processor
    }

    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    pub fn sync(&self) -> &Arc<SyncProcess> {
        &self.sync
    }

    /// Run the daemon until Ctrl+C
    pub async fn run(self) -> Result<(), String> {
        let handles = self.start().await?;
        ui::print_status("ℹ", "Press Ctrl+C to stop the daemon", ui::StatusType::Info);

        if let Err(e) = signal::ctrl_c().await {
            warn!("cannot listen for Ctrl+C: {}", e);
        }
        ui::print_status("ℹ", "Received Ctrl+C, shutting down gracefully...", ui::StatusType::Warning);
        info!("Received Ctrl+C, shutting down");

        self.shutdown(handles).await;
        Ok(())
    }

    /// Binds the listener, dials bootstrap peers and starts the background tasks
    pub async fn start(&self) -> Result<Vec<JoinHandle<()>>, String> {
        ui::print_section("Starting Services");
        let bind: SocketAddr = format!("{}:{}", self.config.p2p.listen_address, self.config.p2p.port)
            .parse()
            .map_err(|e| format!("Invalid listen address: {}", e))?;
        let (bound, listener) = connection::listen(bind, self.handler.clone(), self.shutdown_tx.subscribe())
            .await
            .map_err(|e| format!("Failed to bind {}: {}", bind, e))?;
        info!("P2P listening on {}", bound);

        let mut handles = vec![listener];
        for peer in &self.config.p2p.bootstrap_peers {
            match peer.parse::<SocketAddr>() {
                Ok(address) => match connection::connect(address, self.handler.clone()).await {
                    Ok(handle) => handles.push(handle),
                    Err(e) => warn!("Failed to connect to bootstrap peer {}: {}", peer, e),
                },
                Err(e) => warn!("Invalid bootstrap peer {}: {}", peer, e),
            }
        }

        self.refresh_state();
        handles.push(self.sync.start());
        handles.push(self.spawn_status());
        ui::print_status("✓", "dagd is now running", ui::StatusType::Success);
        Ok(handles)
    }

    /// Stops sync, the listener and every peer, then closes storage
    pub async fn shutdown(&self, handles: Vec<JoinHandle<()>>) {
        info!("Stopping components");
        self.sync.stop();
        let _ = self.shutdown_tx.send(true);
        self.hub.close();
        for handle in handles {
            handle.abort();
            let _ = handle.await;
        }
        self.storage.close();
        info!("All components stopped");
    }

    /// Waiting while no peer is connected, connected once one is
    fn refresh_state(&self) {
        refresh_state(&self.processor, &self.hub, self.network);
    }

    fn spawn_status(&self) -> JoinHandle<()> {
        let processor = self.processor.clone();
        let hub = self.hub.clone();
        let sync = self.sync.clone();
        let network = self.network;
        let mut shutdown = self.shutdown_tx.subscribe();
        let start_time = Instant::now();

        tokio::spawn(async move {
            let mut ticker = interval(STATUS_PERIOD);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown.changed() => break,
                }
                refresh_state(&processor, &hub, network);
                let status = ui::NodeStatus {
                    uptime: start_time.elapsed(),
                    state: processor.node_state(),
                    stats: processor.stats(),
                    supply: processor.supply(),
                    peer_count: hub.len(),
                    syncing: sync.is_syncing(),
                };
                info!("{}", status);
            }
        })
    }
}

fn refresh_state(processor: &BlockProcessor, hub: &Hub, network: NetworkType) {
    match (processor.node_state(), hub.is_empty()) {
        (NodeState::SyncingOld(_) | NodeState::Synchronized(_), false) => {}
        (NodeState::Connected(_), false) | (NodeState::Waiting(_), true) => {}
        (_, false) => processor.set_node_state(NodeState::Connected(network)),
        (_, true) => processor.set_node_state(NodeState::Waiting(network)),
    }
}
