//! Time-segmented block synchronization
//!
//! Two nodes converge by comparing sixteen-bucket digests of their block
//! timestamps, narrowing into the buckets that differ until a range is
//! small enough to fetch whole.

pub mod channel;
pub mod requests;
#[cfg(test)]
mod integration_test;

pub use channel::{ChannelProvider, LocalChain, SyncChannel};
pub use requests::{Reply, RequestTable};

use consensus_core::errors::StoreError;
use consensus_core::time::DIGEST_BUCKETS;
use consensus_core::TimeDigest;
use parking_lot::{Mutex, RwLock};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Whole time domain compared when no fetch is pending
pub const SYNC_TIME_DOMAIN: u64 = 1 << 48;

/// Ranges at or below this width are fetched instead of probed
pub const REQUEST_BLOCKS_MAX_TIME: u64 = 1 << 20;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("request timed out")]
    Timeout,

    #[error("reply channel closed")]
    ChannelClosed,

    #[error("send failed: {0}")]
    Send(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("sync stopped")]
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Syncing,
    SyncDone,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Delay before the first loop iteration
    #[serde(with = "secs")]
    pub initial_delay: Duration,
    #[serde(with = "secs")]
    pub period: Duration,
    /// Bound on every wait for a peer reply
    #[serde(with = "secs")]
    pub request_timeout: Duration,
    pub fetch_granularity: u64,
    /// Queued ranges requested per drain
    pub max_fetch_per_drain: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(32),
            period: Duration::from_secs(10),
            request_timeout: Duration::from_secs(64),
            fetch_granularity: REQUEST_BLOCKS_MAX_TIME,
            max_fetch_per_drain: 128,
        }
    }
}

mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}

#[derive(Default)]
struct FetchWindow {
    times: VecDeque<u64>,
    last_request_time: u64,
}

/// Periodic divergence search and block fetch against random peers
pub struct SyncProcess {
    config: SyncConfig,
    chain: Arc<dyn LocalChain>,
    channels: Arc<dyn ChannelProvider>,
    requests: RequestTable,
    window: Mutex<FetchWindow>,
    status: RwLock<SyncStatus>,
    shutdown: watch::Sender<bool>,
}

impl SyncProcess {
    pub fn new(config: SyncConfig, chain: Arc<dyn LocalChain>, channels: Arc<dyn ChannelProvider>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            config,
            chain,
            channels,
            requests: RequestTable::new(),
            window: Mutex::new(FetchWindow::default()),
            status: RwLock::new(SyncStatus::SyncDone),
            shutdown,
        }
    }

    pub fn status(&self) -> SyncStatus {
        *self.status.read()
    }

    pub fn is_syncing(&self) -> bool {
        self.status() == SyncStatus::Syncing
    }

    pub fn requests(&self) -> &RequestTable {
        &self.requests
    }

    /// Snapshot of the queued fetch times
    pub fn queued_times(&self) -> Vec<u64> {
        self.window.lock().times.iter().copied().collect()
    }

    /// Marks the engine as syncing without scheduling the loop
    pub fn begin(&self) {
        *self.status.write() = SyncStatus::Syncing;
    }

    /// Spawns the periodic loop: one iteration after the initial delay,
    /// then one per period until [`Self::stop`].
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        self.begin();
        let this = Arc::clone(self);
        let mut cancel = self.shutdown.subscribe();
        info!("sync loop starting in {:?}, period {:?}", self.config.initial_delay, self.config.period);

        tokio::spawn(async move {
            tokio::select! {
                _ = time::sleep(this.config.initial_delay) => {}
                _ = cancel.changed() => return,
            }
            let mut interval = time::interval(this.config.period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if !this.is_syncing() {
                            break;
                        }
                        this.run_once().await;
                    }
                    _ = cancel.changed() => break,
                }
            }
            debug!("sync loop stopped");
        })
    }

    /// Ends the session; pending and later replies are ignored
    pub fn stop(&self) {
        *self.status.write() = SyncStatus::SyncDone;
        let _ = self.shutdown.send(true);
        self.requests.close();
        info!("sync stopped");
    }

    /// Hands a peer reply to whichever probe or fetch is waiting on it
    pub fn complete(&self, request_id: u64, reply: Reply) -> bool {
        if !self.is_syncing() {
            return false;
        }
        self.requests.complete(request_id, reply)
    }

    /// One loop iteration: search for divergence if nothing is queued, then fetch
    pub async fn run_once(&self) {
        if !self.is_syncing() {
            return;
        }
        if self.window.lock().times.is_empty() {
            debug!("searching for diverging time ranges");
            self.probe(0, SYNC_TIME_DOMAIN).await;
        }
        self.drain().await;
    }

    /// Depth-first divergence search over `[t, t + dt)`, lowest bucket first
    pub async fn probe(&self, t: u64, dt: u64) {
        let mut stack = vec![(t, dt)];
        while let Some((t, dt)) = stack.pop() {
            if !self.is_syncing() {
                return;
            }
            let Some(channel) = self.pick_channel() else {
                return;
            };

            if dt > self.config.fetch_granularity {
                match self.compare_sums(channel.as_ref(), t, dt).await {
                    Ok(differing) => {
                        let step = dt / DIGEST_BUCKETS as u64;
                        for i in differing.into_iter().rev() {
                            stack.push((t + i as u64 * step, step));
                        }
                    }
                    Err(SyncError::Stopped) => return,
                    Err(e) => debug!("abandoning range [{}, +{}) with {}: {}", t, dt, channel.id(), e),
                }
            } else {
                let state = self.chain.node_state();
                if !state.is_syncing_old() && !state.is_synchronized() {
                    self.chain.set_sync_old();
                }
                self.enqueue(t);
            }
        }
    }

    /// Buckets where the peer's digest of `[t, t + dt)` differs from ours.
    /// Empty when we hold nothing in the range.
    async fn compare_sums(&self, channel: &dyn SyncChannel, t: u64, dt: u64) -> Result<Vec<usize>, SyncError> {
        let local = self.chain.load_time_digest(t, dt)?;
        if local.is_empty() {
            return Ok(Vec::new());
        }

        let (request_id, rx) = self.requests.register()?;
        if let Err(e) = channel.send_get_sums(request_id, t, t + dt).await {
            self.requests.cancel(request_id);
            return Err(e);
        }
        let remote: TimeDigest = match self.await_reply(request_id, rx).await? {
            Reply::Sums(digest) => digest,
            Reply::BlocksDone => return Err(SyncError::ChannelClosed),
        };
        Ok(local.differing_buckets(&remote))
    }

    fn enqueue(&self, t: u64) {
        let last_main_time = match self.chain.last_main_time() {
            Ok(time) => time,
            Err(e) => {
                warn!("cannot read last main time: {}", e);
                return;
            }
        };
        if t <= last_main_time {
            return;
        }
        let mut window = self.window.lock();
        if !window.times.contains(&t) {
            window.times.push_back(t);
        }
    }

    /// Requests queued ranges from one random peer, dropping ranges already
    /// behind the last main block
    pub async fn drain(&self) {
        let Some(channel) = self.pick_channel() else {
            return;
        };
        let last_main_time = match self.chain.last_main_time() {
            Ok(time) => time,
            Err(e) => {
                warn!("cannot read last main time: {}", e);
                return;
            }
        };

        let batch: Vec<u64> = {
            let mut window = self.window.lock();
            while window.times.front().is_some_and(|&t| t < last_main_time) {
                window.times.pop_front();
            }
            window.times.iter().take(self.config.max_fetch_per_drain).copied().collect()
        };

        for time in batch {
            if !self.is_syncing() {
                return;
            }
            if !channel.is_active() {
                debug!("sync channel {} went inactive", channel.id());
                return;
            }
            if time < self.window.lock().last_request_time {
                continue;
            }
            match self.fetch(channel.as_ref(), time).await {
                Err(SyncError::Stopped) => return,
                Err(e) => debug!("fetch of {} from {} failed: {}", time, channel.id(), e),
                Ok(()) => {}
            }
            self.window.lock().last_request_time = time;
        }
    }

    async fn fetch(&self, channel: &dyn SyncChannel, time: u64) -> Result<(), SyncError> {
        let (request_id, rx) = self.requests.register()?;
        if let Err(e) = channel.send_get_blocks(request_id, time, time + self.config.fetch_granularity).await {
            self.requests.cancel(request_id);
            return Err(e);
        }
        self.await_reply(request_id, rx).await.map(|_| ())
    }

    async fn await_reply(&self, request_id: u64, rx: oneshot::Receiver<Reply>) -> Result<Reply, SyncError> {
        let mut cancel = self.shutdown.subscribe();
        if *cancel.borrow() {
            self.requests.cancel(request_id);
            return Err(SyncError::Stopped);
        }
        let result = tokio::select! {
            reply = time::timeout(self.config.request_timeout, rx) => match reply {
                Ok(Ok(reply)) => Ok(reply),
                Ok(Err(_)) => Err(SyncError::ChannelClosed),
                Err(_) => Err(SyncError::Timeout),
            },
            _ = cancel.changed() => Err(SyncError::Stopped),
        };
        if result.is_err() {
            self.requests.cancel(request_id);
        }
        result
    }

    fn pick_channel(&self) -> Option<Arc<dyn SyncChannel>> {
        let channels = self.channels.active_channels();
        channels.choose(&mut rand::thread_rng()).cloned()
    }
}
