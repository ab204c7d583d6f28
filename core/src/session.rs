// Peer session: per-stream read / decode / override / emit loop
//
// One session runs per inbound stream. It owns the stream and its buffers;
// the only shared state is the read-only override table.
//
// Each frame gets the read deadline twice: once for the length prefix, then
// afresh for the body.
//
// Cycle:
//   AwaitingLength -> ReadingPayload -> Decoding -> Emitting -> AwaitingLength
// Exits: Closed / EndOfStream / SinkClosed (graceful) or Failed (I/O error).

use crate::overrides::LocationOverrides;
use crate::wire::{read_exact, read_length_prefix, SensorObservation, WireError};
use async_trait::async_trait;
use futures::io::AsyncRead;
use libp2p::PeerId;
use serde::{Serialize, Serializer};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};

/// Deadline for the next frame to start arriving.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// A readable byte stream from a connected peer.
///
/// The session arms its own read deadline, so implementors only need to
/// report connection liveness and support closing.
#[async_trait]
pub trait PeerStream: AsyncRead + Unpin + Send {
    /// Whether the underlying connection is already known to be gone.
    fn is_closed(&self) -> bool {
        false
    }

    /// Release the stream.
    async fn close(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Captured feeds replayed from memory.
impl<T> PeerStream for futures::io::Cursor<T> where T: AsRef<[u8]> + Unpin + Send {}

/// Session tuning
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Re-armed before every length-prefix read
    pub read_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// A decoded observation tagged with the peer that delivered it.
#[derive(Debug, Clone, Serialize)]
pub struct ObservationEvent {
    #[serde(serialize_with = "serialize_peer_id")]
    pub peer_id: PeerId,
    pub observation: SensorObservation,
    /// Position came from the override table, not the wire
    pub location_overridden: bool,
}

fn serialize_peer_id<S: Serializer>(peer_id: &PeerId, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(peer_id)
}

/// Why a session ended.
#[derive(Debug)]
pub enum SessionOutcome {
    /// The connection reported itself closed before the next read
    Closed,
    /// The peer finished the stream
    EndOfStream,
    /// Nobody is receiving observations any more
    SinkClosed,
    /// Unrecoverable read error
    Failed(WireError),
}

impl SessionOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, SessionOutcome::Failed(_))
    }
}

/// Per-session counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Length prefixes read
    pub frames: u64,
    /// Observations handed to the sink
    pub emitted: u64,
    /// Zero-length and too-short frames dropped
    pub skipped: u64,
}

#[derive(Debug)]
pub struct SessionReport {
    pub peer_id: PeerId,
    pub outcome: SessionOutcome,
    pub stats: SessionStats,
}

/// Reads frames from one peer until the stream ends.
pub struct PeerSession<S> {
    peer_id: PeerId,
    stream: S,
    overrides: Arc<LocationOverrides>,
    sink: mpsc::Sender<ObservationEvent>,
    config: SessionConfig,
    stats: SessionStats,
}

impl<S: PeerStream> PeerSession<S> {
    pub fn new(
        peer_id: PeerId,
        stream: S,
        overrides: Arc<LocationOverrides>,
        sink: mpsc::Sender<ObservationEvent>,
        config: SessionConfig,
    ) -> Self {
        Self {
            peer_id,
            stream,
            overrides,
            sink,
            config,
            stats: SessionStats::default(),
        }
    }

    /// Run the session on its own task.
    pub fn spawn(self) -> JoinHandle<SessionReport>
    where
        S: 'static,
    {
        tokio::spawn(self.run())
    }

    /// Drive the loop to completion, then close the stream.
    pub async fn run(mut self) -> SessionReport {
        let peer = self.peer_id;
        tracing::info!(peer = %peer, "Stream established");

        let outcome = self.read_loop().await;

        if let Err(e) = self.stream.close().await {
            tracing::debug!(peer = %peer, "Error closing stream: {}", e);
        }

        match &outcome {
            SessionOutcome::Closed => tracing::info!(peer = %peer, "Stream seems to be closed"),
            SessionOutcome::EndOfStream => tracing::info!(peer = %peer, "Peer ended the stream"),
            SessionOutcome::SinkClosed => {
                tracing::info!(peer = %peer, "Observation sink closed; dropping stream")
            }
            SessionOutcome::Failed(e) => tracing::warn!(peer = %peer, "Session failed: {}", e),
        }

        SessionReport {
            peer_id: peer,
            outcome,
            stats: self.stats,
        }
    }

    async fn read_loop(&mut self) -> SessionOutcome {
        let peer = self.peer_id;

        loop {
            // AwaitingLength
            if self.stream.is_closed() {
                return SessionOutcome::Closed;
            }

            let deadline = Instant::now() + self.config.read_timeout;
            let length = match timeout_at(deadline, read_length_prefix(&mut self.stream)).await {
                Err(_) => {
                    // Idle peer, not a broken one
                    tracing::debug!(peer = %peer, "No frame before read deadline; waiting again");
                    continue;
                }
                Ok(Err(WireError::EndOfStream)) => return SessionOutcome::EndOfStream,
                Ok(Err(e)) => {
                    tracing::warn!(peer = %peer, "Error reading length byte: {}", e);
                    return SessionOutcome::Failed(e);
                }
                Ok(Ok(length)) => length as usize,
            };
            self.stats.frames += 1;

            // ReadingPayload
            if length == 0 {
                tracing::info!(peer = %peer, "Got a 0-length payload; ignoring");
                self.stats.skipped += 1;
                continue;
            }

            // Idle time spent waiting for the prefix does not count against the body
            let body_deadline = Instant::now() + self.config.read_timeout;
            let mut body = vec![0u8; length];
            match timeout_at(body_deadline, read_exact(&mut self.stream, &mut body)).await {
                Err(_) => {
                    tracing::warn!(peer = %peer, "Read deadline expired inside a {}-byte frame", length);
                    return SessionOutcome::Failed(WireError::Timeout);
                }
                Ok(Err(WireError::EndOfStream)) => return SessionOutcome::EndOfStream,
                Ok(Err(e)) => {
                    tracing::warn!(peer = %peer, "Error reading packet: {}", e);
                    return SessionOutcome::Failed(e);
                }
                Ok(Ok(())) => {}
            }

            // Decoding
            let mut observation = match SensorObservation::decode(&body) {
                Ok(observation) => observation,
                Err(e) => {
                    tracing::warn!(peer = %peer, "Packet ignored: {}", e);
                    self.stats.skipped += 1;
                    continue;
                }
            };

            // Emitting
            let location_overridden = self.overrides.apply(&peer, &mut observation);
            if location_overridden {
                tracing::debug!(peer = %peer, "Applied location override");
            }

            let event = ObservationEvent {
                peer_id: peer,
                observation,
                location_overridden,
            };
            if self.sink.send(event).await.is_err() {
                return SessionOutcome::SinkClosed;
            }
            self.stats.emitted += 1;
        }
    }
}
