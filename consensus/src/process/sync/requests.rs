//! Pending peer requests keyed by correlation id

use super::SyncError;
use consensus_core::TimeDigest;
use parking_lot::Mutex;
use rand::Rng;
use std::collections::HashMap;
use tokio::sync::oneshot;
use tracing::trace;

/// Payload completing a pending request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Sums(TimeDigest),
    BlocksDone,
}

#[derive(Default)]
struct Pending {
    senders: HashMap<u64, oneshot::Sender<Reply>>,
    closed: bool,
}

/// Correlation table between outbound requests and their replies
#[derive(Default)]
pub struct RequestTable {
    pending: Mutex<Pending>,
}

impl RequestTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh random id and the receiver its reply will arrive on
    pub fn register(&self) -> Result<(u64, oneshot::Receiver<Reply>), SyncError> {
        let mut pending = self.pending.lock();
        if pending.closed {
            return Err(SyncError::Stopped);
        }
        let mut rng = rand::thread_rng();
        let mut id: u64 = rng.gen();
        while pending.senders.contains_key(&id) {
            id = rng.gen();
        }
        let (tx, rx) = oneshot::channel();
        pending.senders.insert(id, tx);
        Ok((id, rx))
    }

    /// Delivers `reply` to the waiter for `id`. Unknown, expired or
    /// abandoned ids are ignored; returns whether a waiter received it.
    pub fn complete(&self, id: u64, reply: Reply) -> bool {
        let sender = self.pending.lock().senders.remove(&id);
        match sender {
            Some(sender) => sender.send(reply).is_ok(),
            None => {
                trace!("ignoring reply for unknown request {}", id);
                false
            }
        }
    }

    pub fn cancel(&self, id: u64) {
        self.pending.lock().senders.remove(&id);
    }

    /// Drops every waiter and refuses further registrations
    pub fn close(&self) {
        let mut pending = self.pending.lock();
        pending.closed = true;
        pending.senders.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.pending.lock().closed
    }

    pub fn len(&self) -> usize {
        self.pending.lock().senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
