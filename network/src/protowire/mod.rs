use crate::errors::{NetworkError, NetworkResult};
use consensus_core::time::DIGEST_BYTES;
use consensus_core::{Block, TimeDigest};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024; // 16 MiB

/// Protowire message exchanged between nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    Ping { nonce: u64 },
    Pong { nonce: u64 },
    NewBlock(Block),
    /// Ask for the time digest of `[from, to)`
    GetSums { request_id: u64, from: u64, to: u64 },
    /// Digest in its 256-byte wire form
    SumsReply { request_id: u64, sums: Vec<u8> },
    /// Ask for every block in `[from, to)`; answered by `NewBlock`s then `BlocksReply`
    GetBlocks { request_id: u64, from: u64, to: u64 },
    BlocksReply { request_id: u64 },
}

impl Message {
    pub fn sums_reply(request_id: u64, digest: &TimeDigest) -> Self {
        Message::SumsReply { request_id, sums: digest.to_bytes().to_vec() }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Message::Ping { .. } => "ping",
            Message::Pong { .. } => "pong",
            Message::NewBlock(_) => "new-block",
            Message::GetSums { .. } => "get-sums",
            Message::SumsReply { .. } => "sums-reply",
            Message::GetBlocks { .. } => "get-blocks",
            Message::BlocksReply { .. } => "blocks-reply",
        }
    }
}

pub fn decode_sums(sums: &[u8]) -> NetworkResult<TimeDigest> {
    TimeDigest::from_bytes(sums)
        .ok_or_else(|| NetworkError::Codec(format!("sums of {} bytes, expected {}", sums.len(), DIGEST_BYTES)))
}

pub async fn write_frame<W: AsyncWrite + Unpin>(stream: &mut W, msg: &Message) -> NetworkResult<()> {
    let payload = bincode::serialize(msg)?;
    if payload.len() > MAX_FRAME_SIZE {
        return Err(NetworkError::FrameTooLarge(payload.len()));
    }
    stream.write_u32_le(payload.len() as u32).await?;
    stream.write_all(&payload).await?;
    stream.flush().await?;
    Ok(())
}

pub async fn read_frame<R: AsyncRead + Unpin>(stream: &mut R) -> NetworkResult<Message> {
    let len = stream.read_u32_le().await? as usize;
    if len > MAX_FRAME_SIZE {
        return Err(NetworkError::FrameTooLarge(len));
    }
    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf).await?;
    Ok(bincode::deserialize(&buf)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use consensus_core::block::BlockBuilder;

    #[tokio::test]
    async fn frames_cross_a_stream() {
        let (mut a, mut b) = tokio::io::duplex(4096);
        let block = BlockBuilder::new(77).build();
        write_frame(&mut a, &Message::NewBlock(block.clone())).await.unwrap();
        write_frame(&mut a, &Message::GetSums { request_id: 9, from: 0, to: 1 << 48 }).await.unwrap();

        assert_eq!(read_frame(&mut b).await.unwrap(), Message::NewBlock(block));
        assert_eq!(
            read_frame(&mut b).await.unwrap(),
            Message::GetSums { request_id: 9, from: 0, to: 1 << 48 }
        );
    }

    #[tokio::test]
    async fn oversized_length_is_rejected() {
        let (mut a, mut b) = tokio::io::duplex(64);
        a.write_u32_le((MAX_FRAME_SIZE + 1) as u32).await.unwrap();
        assert!(matches!(read_frame(&mut b).await, Err(NetworkError::FrameTooLarge(_))));
    }

    #[test]
    fn sums_keep_wire_width() {
        let mut digest = TimeDigest::default();
        digest.buckets[3].count = 2;
        let Message::SumsReply { sums, .. } = Message::sums_reply(1, &digest) else {
            panic!("wrong message");
        };
        assert_eq!(sums.len(), DIGEST_BYTES);
        assert_eq!(decode_sums(&sums).unwrap(), digest);
        assert!(decode_sums(&sums[1..]).is_err());
    }
}
