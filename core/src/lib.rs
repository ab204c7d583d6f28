// Sensorlink Core: ADS-B observation ingest over libp2p
//
// Sellers stream length-prefixed sensor frames to us; every inbound stream
// gets its own session that decodes frames, applies surveyed positions and
// emits structured observations.

pub mod overrides;
pub mod session;
pub mod transport;
pub mod wire;

pub use overrides::{peer_id_from_public_key, KeyError, LocationOverrides};
pub use session::{
    ObservationEvent, PeerSession, PeerStream, SessionConfig, SessionOutcome, SessionReport,
    SessionStats, DEFAULT_READ_TIMEOUT,
};
pub use transport::{spawn_ingest, start_node, NodeEvent, NodeHandle, ADSB_PROTOCOL};
pub use wire::{SensorLocation, SensorObservation, WireError};
