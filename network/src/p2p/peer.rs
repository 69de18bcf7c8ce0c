use crate::errors::{NetworkError, NetworkResult};
use crate::protowire::Message;
use async_trait::async_trait;
use consensus::process::sync::{SyncChannel, SyncError};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

/// Outbound half of a connection; the writer task drains `tx`
pub struct Peer {
    pub id: String,
    pub address: SocketAddr,
    tx: mpsc::Sender<Message>,
    active: AtomicBool,
}

impl Peer {
    pub fn new(address: SocketAddr, tx: mpsc::Sender<Message>) -> Self {
        Self { id: address.to_string(), address, tx, active: AtomicBool::new(true) }
    }

    pub async fn send_message(&self, msg: Message) -> NetworkResult<()> {
        if !self.is_active() {
            return Err(NetworkError::ChannelClosed);
        }
        self.tx.send(msg).await.map_err(|_| {
            self.mark_inactive();
            NetworkError::ChannelClosed
        })
    }

    pub fn mark_inactive(&self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl SyncChannel for Peer {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst) && !self.tx.is_closed()
    }

    async fn send_get_sums(&self, request_id: u64, from: u64, to: u64) -> Result<(), SyncError> {
        self.send_message(Message::GetSums { request_id, from, to })
            .await
            .map_err(|e| SyncError::Send(e.to_string()))
    }

    async fn send_get_blocks(&self, request_id: u64, from: u64, to: u64) -> Result<(), SyncError> {
        self.send_message(Message::GetBlocks { request_id, from, to })
            .await
            .map_err(|e| SyncError::Send(e.to_string()))
    }
}
