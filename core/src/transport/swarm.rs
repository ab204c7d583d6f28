// libp2p swarm setup: the running ADS-B node
//
// This creates and manages the libp2p Swarm with:
// - TCP transport
// - Noise encryption
// - Yamux multiplexing
// - libp2p-stream for raw protocol streams (accept inbound, open outbound)

use super::link::ConnectionTracker;
use anyhow::{Context, Result};
use futures::StreamExt;
use libp2p::{identity::Keypair, swarm::SwarmEvent, Multiaddr, PeerId, StreamProtocol};
use std::time::Duration;
use tokio::sync::mpsc;

/// Application protocol sellers open streams on.
pub const ADSB_PROTOCOL: StreamProtocol = StreamProtocol::new("/neuron/ADSB/0.0.2");

/// Commands that can be sent to the swarm task
#[derive(Debug)]
pub enum NodeCommand {
    /// Dial a peer at a specific address
    Dial {
        addr: Multiaddr,
        reply: mpsc::Sender<Result<(), String>>,
    },
    /// Start listening on an additional address
    Listen {
        addr: Multiaddr,
        reply: mpsc::Sender<Result<(), String>>,
    },
    /// Addresses the swarm is currently listening on
    GetListenAddrs { reply: mpsc::Sender<Vec<Multiaddr>> },
    /// Shutdown the swarm
    Shutdown,
}

/// Events emitted by the swarm to the application layer
#[derive(Debug, Clone)]
pub enum NodeEvent {
    /// We started listening on an address
    ListeningOn(Multiaddr),
    /// First connection to a peer came up
    PeerConnected(PeerId),
    /// Last connection to a peer went away
    PeerDisconnected(PeerId),
}

/// Handle to communicate with the running swarm task
#[derive(Clone)]
pub struct NodeHandle {
    local_peer_id: PeerId,
    command_tx: mpsc::Sender<NodeCommand>,
    control: libp2p_stream::Control,
    tracker: ConnectionTracker,
}

impl NodeHandle {
    pub fn local_peer_id(&self) -> PeerId {
        self.local_peer_id
    }

    /// Connection liveness as seen by the swarm task
    pub fn tracker(&self) -> ConnectionTracker {
        self.tracker.clone()
    }

    /// Dial a peer at a multiaddress
    pub async fn dial(&self, addr: Multiaddr) -> Result<()> {
        let (reply_tx, mut reply_rx) = mpsc::channel(1);
        self.command_tx
            .send(NodeCommand::Dial {
                addr,
                reply: reply_tx,
            })
            .await
            .map_err(|_| anyhow::anyhow!("Swarm task not running"))?;

        reply_rx
            .recv()
            .await
            .ok_or_else(|| anyhow::anyhow!("No reply from swarm"))?
            .map_err(|e| anyhow::anyhow!(e))
    }

    /// Start listening on an address
    pub async fn listen(&self, addr: Multiaddr) -> Result<()> {
        let (reply_tx, mut reply_rx) = mpsc::channel(1);
        self.command_tx
            .send(NodeCommand::Listen {
                addr,
                reply: reply_tx,
            })
            .await
            .map_err(|_| anyhow::anyhow!("Swarm task not running"))?;

        reply_rx
            .recv()
            .await
            .ok_or_else(|| anyhow::anyhow!("No reply from swarm"))?
            .map_err(|e| anyhow::anyhow!(e))
    }

    /// Addresses the swarm has reported as listening
    pub async fn listen_addrs(&self) -> Result<Vec<Multiaddr>> {
        let (reply_tx, mut reply_rx) = mpsc::channel(1);
        self.command_tx
            .send(NodeCommand::GetListenAddrs { reply: reply_tx })
            .await
            .map_err(|_| anyhow::anyhow!("Swarm task not running"))?;

        reply_rx
            .recv()
            .await
            .ok_or_else(|| anyhow::anyhow!("No reply from swarm"))
    }

    /// Get connected peers
    pub fn connected_peers(&self) -> Vec<PeerId> {
        self.tracker.connected_peers()
    }

    /// Register for inbound streams on `protocol`.
    ///
    /// Only one registration per protocol may exist at a time.
    pub fn accept(&self, protocol: StreamProtocol) -> Result<libp2p_stream::IncomingStreams> {
        self.control
            .clone()
            .accept(protocol)
            .map_err(|e| anyhow::anyhow!("Cannot accept streams: {}", e))
    }

    /// Open an outbound stream to a peer we are connected to (or can dial).
    pub async fn open_stream(&self, peer_id: PeerId, protocol: StreamProtocol) -> Result<libp2p::Stream> {
        self.control
            .clone()
            .open_stream(peer_id, protocol)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to open stream to {}: {}", peer_id, e))
    }

    /// Shut down the swarm
    pub async fn shutdown(&self) -> Result<()> {
        self.command_tx
            .send(NodeCommand::Shutdown)
            .await
            .map_err(|_| anyhow::anyhow!("Swarm task not running"))
    }
}

/// Build and start the libp2p swarm, returning a handle for communication.
///
/// This spawns a tokio task that runs the swarm event loop.
pub async fn start_node(
    keypair: Keypair,
    listen_addr: Option<Multiaddr>,
    event_tx: mpsc::Sender<NodeEvent>,
) -> Result<NodeHandle> {
    let local_peer_id = keypair.public().to_peer_id();

    let mut swarm = libp2p::SwarmBuilder::with_existing_identity(keypair)
        .with_tokio()
        .with_tcp(
            libp2p::tcp::Config::default(),
            libp2p::noise::Config::new,
            libp2p::yamux::Config::default,
        )
        .context("Failed to build TCP transport")?
        .with_behaviour(|_| libp2p_stream::Behaviour::new())?
        .with_swarm_config(|cfg| cfg.with_idle_connection_timeout(Duration::from_secs(300)))
        .build();

    if let Some(addr) = listen_addr {
        swarm
            .listen_on(addr.clone())
            .with_context(|| format!("Failed to listen on {}", addr))?;
    }

    let control = swarm.behaviour().new_control();
    let tracker = ConnectionTracker::new();

    let (command_tx, mut command_rx) = mpsc::channel::<NodeCommand>(64);
    let handle = NodeHandle {
        local_peer_id,
        command_tx,
        control,
        tracker: tracker.clone(),
    };

    tracing::info!("Local peer id: {}", local_peer_id);

    // Spawn the swarm event loop
    tokio::spawn(async move {
        let mut listen_addrs: Vec<Multiaddr> = Vec::new();

        loop {
            tokio::select! {
                event = swarm.select_next_some() => {
                    match event {
                        SwarmEvent::NewListenAddr { address, .. } => {
                            tracing::info!("Listening on {}", address);
                            listen_addrs.push(address.clone());
                            let _ = event_tx.send(NodeEvent::ListeningOn(address)).await;
                        }

                        SwarmEvent::ExpiredListenAddr { address, .. } => {
                            listen_addrs.retain(|a| a != &address);
                        }

                        SwarmEvent::ConnectionEstablished { peer_id, endpoint, num_established, .. } => {
                            tracing::info!("Connected to {} via {}", peer_id, endpoint.get_remote_address());
                            tracker.connection_established(peer_id, num_established.get());
                            if num_established.get() == 1 {
                                let _ = event_tx.send(NodeEvent::PeerConnected(peer_id)).await;
                            }
                        }

                        SwarmEvent::ConnectionClosed { peer_id, num_established, cause, .. } => {
                            match cause {
                                Some(cause) => tracing::info!("Disconnected from {}: {}", peer_id, cause),
                                None => tracing::info!("Disconnected from {}", peer_id),
                            }
                            tracker.connection_closed(peer_id, num_established);
                            if num_established == 0 {
                                let _ = event_tx.send(NodeEvent::PeerDisconnected(peer_id)).await;
                            }
                        }

                        SwarmEvent::OutgoingConnectionError { peer_id, error, .. } => {
                            tracing::warn!("Outgoing connection to {:?} failed: {}", peer_id, error);
                        }

                        SwarmEvent::IncomingConnectionError { send_back_addr, error, .. } => {
                            tracing::debug!("Incoming connection from {} failed: {}", send_back_addr, error);
                        }

                        _ => {}
                    }
                }

                // Process commands from the application layer
                command = command_rx.recv() => {
                    match command {
                        Some(NodeCommand::Dial { addr, reply }) => {
                            match swarm.dial(addr) {
                                Ok(_) => { let _ = reply.send(Ok(())).await; }
                                Err(e) => { let _ = reply.send(Err(e.to_string())).await; }
                            }
                        }

                        Some(NodeCommand::Listen { addr, reply }) => {
                            match swarm.listen_on(addr) {
                                Ok(_) => { let _ = reply.send(Ok(())).await; }
                                Err(e) => { let _ = reply.send(Err(e.to_string())).await; }
                            }
                        }

                        Some(NodeCommand::GetListenAddrs { reply }) => {
                            let _ = reply.send(listen_addrs.clone()).await;
                        }

                        Some(NodeCommand::Shutdown) | None => {
                            tracing::info!("Swarm shutting down");
                            break;
                        }
                    }
                }
            }
        }
    });

    Ok(handle)
}
