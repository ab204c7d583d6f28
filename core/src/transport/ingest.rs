// Ingest wiring: one session task per inbound ADS-B stream

use super::link::LinkStream;
use super::swarm::{NodeHandle, ADSB_PROTOCOL};
use crate::overrides::LocationOverrides;
use crate::session::{ObservationEvent, PeerSession, SessionConfig};
use anyhow::{Context, Result};
use futures::StreamExt;
use libp2p::multiaddr::Protocol;
use libp2p::{Multiaddr, PeerId};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Accept ADS-B streams and run a [`PeerSession`] for each.
///
/// Sessions are independent; all of them emit into `sink`. The returned task
/// ends when the node shuts down.
pub fn spawn_ingest(
    node: &NodeHandle,
    overrides: Arc<LocationOverrides>,
    sink: mpsc::Sender<ObservationEvent>,
    config: SessionConfig,
) -> Result<JoinHandle<()>> {
    let mut incoming = node.accept(ADSB_PROTOCOL)?;
    let tracker = node.tracker();

    Ok(tokio::spawn(async move {
        while let Some((peer_id, stream)) = incoming.next().await {
            let link = LinkStream::new(peer_id, stream, &tracker);
            let session = PeerSession::new(
                peer_id,
                link,
                overrides.clone(),
                sink.clone(),
                config.clone(),
            );

            tokio::spawn(async move {
                let report = session.run().await;
                tracing::debug!(
                    peer = %report.peer_id,
                    frames = report.stats.frames,
                    emitted = report.stats.emitted,
                    skipped = report.stats.skipped,
                    "Session finished"
                );
            });
        }
        tracing::debug!("Inbound stream registration dropped");
    }))
}

/// Peer id embedded in a `/p2p/<id>` multiaddr suffix.
pub fn peer_id_of(addr: &Multiaddr) -> Option<PeerId> {
    addr.iter().find_map(|protocol| match protocol {
        Protocol::P2p(peer_id) => Some(peer_id),
        _ => None,
    })
}

/// Dial a buyer and open an ADS-B stream to it (seller side).
///
/// `addr` must end in `/p2p/<peer id>`.
pub async fn open_feed(node: &NodeHandle, addr: Multiaddr) -> Result<libp2p::Stream> {
    let peer_id = peer_id_of(&addr)
        .with_context(|| format!("Address {} has no /p2p/<peer id> component", addr))?;

    node.dial(addr).await?;
    node.open_stream(peer_id, ADSB_PROTOCOL).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_id_of_multiaddr() {
        let peer = PeerId::random();
        let addr: Multiaddr = format!("/ip4/127.0.0.1/tcp/6653/p2p/{}", peer).parse().unwrap();
        assert_eq!(peer_id_of(&addr), Some(peer));

        let bare: Multiaddr = "/ip4/127.0.0.1/tcp/6653".parse().unwrap();
        assert_eq!(peer_id_of(&bare), None);
    }
}
