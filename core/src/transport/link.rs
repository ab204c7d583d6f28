// Connection liveness tracking and the libp2p-backed peer stream

use crate::session::PeerStream;
use async_trait::async_trait;
use futures::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use libp2p::PeerId;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

#[derive(Debug, Default)]
struct PeerLink {
    /// Open connections right now
    established: u32,
    /// Shared with every stream accepted while this link was up
    closed: Arc<AtomicBool>,
}

/// Tracks which peers currently have a live connection.
///
/// Updated by the swarm task. A peer's entry is dropped when its last
/// connection goes away; streams keep their own handle to the closed flag.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    peers: Arc<RwLock<HashMap<PeerId, PeerLink>>>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new connection; `num_established` counts it.
    pub fn connection_established(&self, peer_id: PeerId, num_established: u32) {
        let mut peers = self.peers.write();
        peers.entry(peer_id).or_default().established = num_established;
    }

    /// Record a closed connection; `remaining` is how many are still open.
    pub fn connection_closed(&self, peer_id: PeerId, remaining: u32) {
        let mut peers = self.peers.write();
        if remaining > 0 {
            if let Some(link) = peers.get_mut(&peer_id) {
                link.established = remaining;
            }
            return;
        }
        if let Some(link) = peers.remove(&peer_id) {
            link.closed.store(true, Ordering::Release);
        }
    }

    /// Closed flag for the peer's current link.
    ///
    /// A stream can be accepted before the swarm task has recorded its
    /// connection, so a missing entry is created here.
    fn closed_flag(&self, peer_id: PeerId) -> Arc<AtomicBool> {
        let mut peers = self.peers.write();
        peers.entry(peer_id).or_default().closed.clone()
    }

    pub fn is_connected(&self, peer_id: &PeerId) -> bool {
        self.peers
            .read()
            .get(peer_id)
            .map(|p| p.established > 0)
            .unwrap_or(false)
    }

    pub fn connected_peers(&self) -> Vec<PeerId> {
        self.peers
            .read()
            .iter()
            .filter(|(_, p)| p.established > 0)
            .map(|(peer_id, _)| *peer_id)
            .collect()
    }

    /// Peers with an entry, connected or not.
    pub fn tracked_peers(&self) -> usize {
        self.peers.read().len()
    }
}

/// An inbound stream handed to a session.
///
/// Reports itself closed once the peer has dropped every connection since the
/// stream was accepted.
pub struct LinkStream<S = libp2p::Stream> {
    inner: S,
    peer_id: PeerId,
    closed: Arc<AtomicBool>,
}

impl<S> LinkStream<S> {
    pub fn new(peer_id: PeerId, inner: S, tracker: &ConnectionTracker) -> Self {
        Self {
            inner,
            peer_id,
            closed: tracker.closed_flag(peer_id),
        }
    }

    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for LinkStream<S> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

#[async_trait]
impl<S> PeerStream for LinkStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    async fn close(&mut self) -> io::Result<()> {
        self.inner.close().await
    }
}
