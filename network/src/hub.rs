use crate::p2p::Peer;
use crate::protowire::Message;
use consensus::process::sync::{ChannelProvider, SyncChannel};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// The set of connected peers
#[derive(Default)]
pub struct Hub {
    peers: RwLock<HashMap<String, Arc<Peer>>>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_peer(&self, peer: Arc<Peer>) {
        info!("peer {} connected", peer.id);
        self.peers.write().insert(peer.id.clone(), peer);
    }

    pub fn remove_peer(&self, id: &str) -> Option<Arc<Peer>> {
        let removed = self.peers.write().remove(id);
        if let Some(peer) = &removed {
            peer.mark_inactive();
            info!("peer {} disconnected", id);
        }
        removed
    }

    pub fn get(&self, id: &str) -> Option<Arc<Peer>> {
        self.peers.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sends `msg` to every active peer except `skip`
    pub async fn broadcast(&self, msg: Message, skip: Option<&str>) {
        let targets: Vec<Arc<Peer>> = self
            .peers
            .read()
            .values()
            .filter(|p| p.is_active() && Some(p.id.as_str()) != skip)
            .cloned()
            .collect();
        for peer in targets {
            if let Err(e) = peer.send_message(msg.clone()).await {
                debug!("broadcast of {} to {} failed: {}", msg.kind(), peer.id, e);
            }
        }
    }

    /// Deactivates and forgets every peer
    pub fn close(&self) {
        for (_, peer) in self.peers.write().drain() {
            peer.mark_inactive();
        }
    }
}

impl ChannelProvider for Hub {
    fn active_channels(&self) -> Vec<Arc<dyn SyncChannel>> {
        self.peers
            .read()
            .values()
            .filter(|p| p.is_active())
            .map(|p| p.clone() as Arc<dyn SyncChannel>)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn peer(port: u16) -> (Arc<Peer>, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(8);
        (Arc::new(Peer::new(format!("127.0.0.1:{}", port).parse().unwrap(), tx)), rx)
    }

    #[tokio::test]
    async fn broadcast_skips_origin_and_inactive() {
        let hub = Hub::new();
        let (a, mut rx_a) = peer(1);
        let (b, mut rx_b) = peer(2);
        let (c, mut rx_c) = peer(3);
        for p in [&a, &b, &c] {
            hub.add_peer(p.clone());
        }
        c.mark_inactive();
        assert_eq!(hub.active_channels().len(), 2);

        hub.broadcast(Message::Ping { nonce: 1 }, Some(&a.id)).await;
        assert_eq!(rx_b.recv().await, Some(Message::Ping { nonce: 1 }));
        assert!(rx_a.try_recv().is_err());
        assert!(rx_c.try_recv().is_err());
    }

    #[test]
    fn close_deactivates_everything() {
        let hub = Hub::new();
        let (a, _rx) = peer(1);
        hub.add_peer(a.clone());
        assert!(hub.remove_peer("127.0.0.1:9").is_none());
        hub.close();
        assert!(hub.is_empty());
        assert!(!a.is_active());
        assert!(hub.active_channels().is_empty());
    }
}
