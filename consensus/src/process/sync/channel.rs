//! Seams between the sync engine, the local chain and the peer layer

use super::SyncError;
use async_trait::async_trait;
use consensus_core::errors::StoreResult;
use consensus_core::state::NodeState;
use consensus_core::TimeDigest;
use std::sync::Arc;

/// One peer connection as seen by the sync engine
#[async_trait]
pub trait SyncChannel: Send + Sync {
    fn id(&self) -> String;

    fn is_active(&self) -> bool;

    /// Asks the peer for its time digest of `[from, to)`. The reply arrives
    /// through [`super::SyncProcess::complete`] under `request_id`.
    async fn send_get_sums(&self, request_id: u64, from: u64, to: u64) -> Result<(), SyncError>;

    /// Asks the peer for every block with time in `[from, to)`
    async fn send_get_blocks(&self, request_id: u64, from: u64, to: u64) -> Result<(), SyncError>;
}

pub trait ChannelProvider: Send + Sync {
    fn active_channels(&self) -> Vec<Arc<dyn SyncChannel>>;
}

/// Local chain state the sync engine reads
pub trait LocalChain: Send + Sync {
    fn load_time_digest(&self, from: u64, dt: u64) -> StoreResult<TimeDigest>;

    /// Timestamp of the highest main block, zero before the first one
    fn last_main_time(&self) -> StoreResult<u64>;

    fn node_state(&self) -> NodeState;

    /// Switches the display state to syncing-old unless already syncing old
    /// or synchronized
    fn set_sync_old(&self);
}
