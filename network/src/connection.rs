//! Peer connections over byte streams
//!
//! Every connection runs a reader loop feeding the message handler and a
//! writer task draining the peer's outbound queue.

use crate::errors::{NetworkError, NetworkResult};
use crate::handler::MessageHandler;
use crate::p2p::Peer;
use crate::protowire::{read_frame, write_frame};
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Outbound messages buffered per peer
pub const OUTBOUND_QUEUE: usize = 1024;

/// Runs one peer until the stream ends or fails
pub async fn serve<S>(stream: S, address: SocketAddr, handler: Arc<MessageHandler>) -> NetworkResult<()>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (mut reader, mut writer) = tokio::io::split(stream);
    let (tx, mut rx) = mpsc::channel(OUTBOUND_QUEUE);
    let peer = Arc::new(Peer::new(address, tx));
    handler.hub().add_peer(peer.clone());

    let writer_peer = peer.clone();
    let writer_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = write_frame(&mut writer, &msg).await {
                debug!("writer for {} stopped: {}", writer_peer.id, e);
                break;
            }
        }
        writer_peer.mark_inactive();
    });

    let result = loop {
        match read_frame(&mut reader).await {
            Ok(msg) => {
                if let Err(e) = handler.handle(&peer, msg).await {
                    break Err(e);
                }
            }
            Err(NetworkError::Io(e)) if e.kind() == ErrorKind::UnexpectedEof => break Ok(()),
            Err(e) => break Err(e),
        }
    };

    handler.hub().remove_peer(&peer.id);
    writer_task.abort();
    result
}

/// Dials `address` and serves the connection in the background
pub async fn connect(address: SocketAddr, handler: Arc<MessageHandler>) -> NetworkResult<JoinHandle<()>> {
    let stream = TcpStream::connect(address).await?;
    stream.set_nodelay(true)?;
    info!("connected to {}", address);
    Ok(tokio::spawn(async move {
        if let Err(e) = serve(stream, address, handler).await {
            debug!("connection to {} ended: {}", address, e);
        }
    }))
}

/// Accepts peers on `bind` until `shutdown` fires. Returns the bound
/// address and the accept task.
pub async fn listen(
    bind: SocketAddr,
    handler: Arc<MessageHandler>,
    mut shutdown: watch::Receiver<bool>,
) -> NetworkResult<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind(bind).await?;
    let local = listener.local_addr()?;
    info!("listening for peers on {}", local);

    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, address)) => {
                        if let Err(e) = stream.set_nodelay(true) {
                            debug!("set_nodelay for {} failed: {}", address, e);
                        }
                        let handler = handler.clone();
                        tokio::spawn(async move {
                            if let Err(e) = serve(stream, address, handler).await {
                                debug!("connection from {} ended: {}", address, e);
                            }
                        });
                    }
                    Err(e) => warn!("failed to accept connection: {}", e),
                },
                _ = shutdown.changed() => break,
            }
        }
        debug!("listener on {} stopped", local);
    });
    Ok((local, task))
}
