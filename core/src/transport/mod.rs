// Transport module: libp2p node, inbound ADS-B streams, outbound feeds

pub mod ingest;
pub mod link;
pub mod swarm;

pub use ingest::{open_feed, peer_id_of, spawn_ingest};
pub use link::{ConnectionTracker, LinkStream};
pub use swarm::{start_node, NodeCommand, NodeEvent, NodeHandle, ADSB_PROTOCOL};
