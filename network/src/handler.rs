//! Inbound message dispatch
//!
//! Blocks go to the block processor, requests are answered from local
//! state and replies are handed to the sync engine.

use crate::errors::NetworkResult;
use crate::hub::Hub;
use crate::p2p::Peer;
use crate::protowire::{decode_sums, Message};
use consensus::consensus::types::ImportResult;
use consensus::pipeline::BlockProcessor;
use consensus::process::sync::{LocalChain, Reply, SyncProcess, REQUEST_BLOCKS_MAX_TIME};
use consensus_core::Block;
use std::sync::Arc;
use tracing::{debug, trace, warn};

pub struct MessageHandler {
    processor: Arc<BlockProcessor>,
    sync: Arc<SyncProcess>,
    hub: Arc<Hub>,
}

impl MessageHandler {
    pub fn new(processor: Arc<BlockProcessor>, sync: Arc<SyncProcess>, hub: Arc<Hub>) -> Self {
        Self { processor, sync, hub }
    }

    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    /// Handles one message from `peer`. Errors mean the peer's outbound
    /// channel is gone.
    pub async fn handle(&self, peer: &Peer, msg: Message) -> NetworkResult<()> {
        trace!("{} from {}", msg.kind(), peer.id);
        match msg {
            Message::Ping { nonce } => peer.send_message(Message::Pong { nonce }).await?,
            Message::Pong { .. } => {}
            Message::NewBlock(block) => self.on_block(peer, block).await,
            Message::GetSums { request_id, from, to } => {
                match self.processor.load_time_digest(from, to.saturating_sub(from)) {
                    Ok(digest) => peer.send_message(Message::sums_reply(request_id, &digest)).await?,
                    Err(e) => warn!("cannot answer sums request from {}: {}", peer.id, e),
                }
            }
            Message::SumsReply { request_id, sums } => match decode_sums(&sums) {
                Ok(digest) => {
                    self.sync.complete(request_id, Reply::Sums(digest));
                }
                Err(e) => debug!("bad sums reply from {}: {}", peer.id, e),
            },
            Message::GetBlocks { request_id, from, to } => {
                // Never serve more than one fetch window per request
                let to = to.min(from.saturating_add(REQUEST_BLOCKS_MAX_TIME));
                match self.processor.blocks_in_range(from, to) {
                    Ok(blocks) => {
                        for block in blocks {
                            peer.send_message(Message::NewBlock(block)).await?;
                        }
                    }
                    Err(e) => warn!("cannot answer blocks request from {}: {}", peer.id, e),
                }
                peer.send_message(Message::BlocksReply { request_id }).await?;
            }
            Message::BlocksReply { request_id } => {
                self.sync.complete(request_id, Reply::BlocksDone);
            }
        }
        Ok(())
    }

    async fn on_block(&self, peer: &Peer, block: Block) {
        match self.processor.process_block(&block) {
            Ok(outcome) => match outcome.result {
                ImportResult::AcceptedBest => {
                    self.hub.broadcast(Message::NewBlock(block), Some(&peer.id)).await;
                }
                ImportResult::RejectedInvalid(reason) => {
                    debug!("block {} from {} rejected: {}", outcome.hash, peer.id, reason);
                }
                ImportResult::AcceptedNotBest | ImportResult::RejectedDuplicate => {}
            },
            Err(e) => warn!("failed to process block from {}: {}", peer.id, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use consensus::consensus::storage::ConsensusStorage;
    use consensus::process::sync::SyncConfig;
    use consensus_core::block::BlockBuilder;
    use consensus_core::config::Params;
    use tokio::sync::mpsc;

    struct Fixture {
        processor: Arc<BlockProcessor>,
        sync: Arc<SyncProcess>,
        hub: Arc<Hub>,
        handler: MessageHandler,
    }

    fn fixture() -> Fixture {
        let processor = Arc::new(BlockProcessor::new(Params::devnet(), ConsensusStorage::in_memory()).unwrap());
        let hub = Arc::new(Hub::new());
        let sync = Arc::new(SyncProcess::new(SyncConfig::default(), processor.clone(), hub.clone()));
        let handler = MessageHandler::new(processor.clone(), sync.clone(), hub.clone());
        Fixture { processor, sync, hub, handler }
    }

    fn peer(hub: &Hub, port: u16) -> (Arc<Peer>, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(64);
        let peer = Arc::new(Peer::new(format!("127.0.0.1:{}", port).parse().unwrap(), tx));
        hub.add_peer(peer.clone());
        (peer, rx)
    }

    #[tokio::test]
    async fn answers_ping_and_sums() {
        let f = fixture();
        let (peer, mut rx) = peer(&f.hub, 1);
        f.processor.process_block(&BlockBuilder::new(40).build()).unwrap();

        f.handler.handle(&peer, Message::Ping { nonce: 3 }).await.unwrap();
        assert_eq!(rx.recv().await, Some(Message::Pong { nonce: 3 }));

        f.handler.handle(&peer, Message::GetSums { request_id: 8, from: 0, to: 64 }).await.unwrap();
        let Some(Message::SumsReply { request_id, sums }) = rx.recv().await else {
            panic!("expected sums reply");
        };
        assert_eq!(request_id, 8);
        let digest = decode_sums(&sums).unwrap();
        assert_eq!(digest.buckets[10].count, 1);
    }

    #[tokio::test]
    async fn streams_blocks_then_reply() {
        let f = fixture();
        let (peer, mut rx) = peer(&f.hub, 1);
        let a = BlockBuilder::new(10).build();
        let b = BlockBuilder::new(20).link(a.hash()).build();
        f.processor.process_block(&a).unwrap();
        f.processor.process_block(&b).unwrap();

        f.handler.handle(&peer, Message::GetBlocks { request_id: 4, from: 0, to: 100 }).await.unwrap();
        assert_eq!(rx.recv().await, Some(Message::NewBlock(a)));
        assert_eq!(rx.recv().await, Some(Message::NewBlock(b)));
        assert_eq!(rx.recv().await, Some(Message::BlocksReply { request_id: 4 }));
    }

    #[tokio::test]
    async fn block_requests_are_capped_to_one_window() {
        let f = fixture();
        let (peer, mut rx) = peer(&f.hub, 1);
        let inside = BlockBuilder::new(REQUEST_BLOCKS_MAX_TIME - 1).build();
        let outside = BlockBuilder::new(REQUEST_BLOCKS_MAX_TIME + 5).build();
        f.processor.process_block(&inside).unwrap();
        f.processor.process_block(&outside).unwrap();

        f.handler.handle(&peer, Message::GetBlocks { request_id: 6, from: 0, to: u64::MAX }).await.unwrap();
        assert_eq!(rx.recv().await, Some(Message::NewBlock(inside)));
        assert_eq!(rx.recv().await, Some(Message::BlocksReply { request_id: 6 }));
    }

    #[tokio::test]
    async fn relays_new_best_blocks_to_other_peers() {
        let f = fixture();
        let (origin, mut from_origin) = peer(&f.hub, 1);
        let (_other, mut to_other) = peer(&f.hub, 2);
        let block = BlockBuilder::new(10).build();

        f.handler.handle(&origin, Message::NewBlock(block.clone())).await.unwrap();
        assert!(f.processor.has_block(&block.hash()).unwrap());
        assert_eq!(to_other.recv().await, Some(Message::NewBlock(block.clone())));
        assert!(from_origin.try_recv().is_err());

        f.handler.handle(&origin, Message::NewBlock(block)).await.unwrap();
        assert!(to_other.try_recv().is_err());
    }

    #[tokio::test]
    async fn replies_complete_pending_requests() {
        let f = fixture();
        let (peer, _rx) = peer(&f.hub, 1);
        f.sync.begin();
        let (id, reply) = f.sync.requests().register().unwrap();

        f.handler.handle(&peer, Message::BlocksReply { request_id: id }).await.unwrap();
        assert_eq!(reply.await.unwrap(), Reply::BlocksDone);
        assert!(f.sync.requests().is_empty());
    }
}
