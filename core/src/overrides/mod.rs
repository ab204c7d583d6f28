//! Location overrides: authoritative sensor positions keyed by peer identity
//!
//! Some sellers report a wrong or missing position for their receiver. The
//! table maps the `PeerId` of such a seller to its surveyed position; every
//! observation arriving from that peer has its position replaced.
//!
//! The table is built once at start-up and never mutated afterwards, so it is
//! shared between sessions as a plain `Arc<LocationOverrides>`.

pub mod defaults;
pub mod keys;

pub use defaults::DEFAULT_OVERRIDES;
pub use keys::{keypair_from_private_key, parse_public_key, peer_id_from_public_key, KeyError};

use crate::wire::{SensorLocation, SensorObservation};
use libp2p::PeerId;
use std::collections::HashMap;

/// Read-only map from peer identity to surveyed sensor position.
#[derive(Debug, Clone, Default)]
pub struct LocationOverrides {
    entries: HashMap<PeerId, SensorLocation>,
}

impl LocationOverrides {
    /// Build the table, converting each public key with `convert`.
    ///
    /// Entries whose key cannot be converted are logged and skipped. When two
    /// entries resolve to the same peer the later one wins.
    pub fn build<'a, I, F, E>(entries: I, convert: F) -> Self
    where
        I: IntoIterator<Item = (&'a str, SensorLocation)>,
        F: Fn(&str) -> Result<PeerId, E>,
        E: std::fmt::Display,
    {
        let mut table = HashMap::new();
        for (public_key, location) in entries {
            match convert(public_key) {
                Ok(peer_id) => {
                    if table.insert(peer_id, location).is_some() {
                        tracing::debug!(peer = %peer_id, "Replacing earlier location override");
                    }
                }
                Err(e) => {
                    tracing::warn!("Skipping location override for key {}: {}", public_key, e);
                }
            }
        }

        tracing::info!("Initialized {} location overrides", table.len());
        Self { entries: table }
    }

    /// Build the table from hex-encoded secp256k1 public keys.
    pub fn from_public_keys<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, SensorLocation)>,
    {
        Self::build(entries, peer_id_from_public_key)
    }

    /// The shipped table of surveyed seller sites.
    pub fn with_defaults() -> Self {
        Self::from_public_keys(DEFAULT_OVERRIDES.iter().copied())
    }

    /// Surveyed position for `peer_id`, if it has one.
    pub fn lookup(&self, peer_id: &PeerId) -> Option<SensorLocation> {
        self.entries.get(peer_id).copied()
    }

    /// Replace the observation's position if `peer_id` has an override.
    ///
    /// Returns whether a substitution happened.
    pub fn apply(&self, peer_id: &PeerId, observation: &mut SensorObservation) -> bool {
        match self.lookup(peer_id) {
            Some(location) => {
                observation.set_location(location);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PeerId, &SensorLocation)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use libp2p::identity::secp256k1;

    fn random_key_hex() -> String {
        hex::encode(secp256k1::Keypair::generate().public().to_bytes())
    }

    #[test]
    fn test_lookup_hit_and_miss() {
        let known = random_key_hex();
        let table = LocationOverrides::from_public_keys([(
            known.as_str(),
            SensorLocation::new(50.0, -5.0, 100.0),
        )]);

        let peer = peer_id_from_public_key(&known).unwrap();
        assert_eq!(table.lookup(&peer), Some(SensorLocation::new(50.0, -5.0, 100.0)));
        assert_eq!(table.lookup(&PeerId::random()), None);
    }

    #[test]
    fn test_bad_entries_are_skipped() {
        let good_a = random_key_hex();
        let good_b = random_key_hex();
        let table = LocationOverrides::from_public_keys([
            (good_a.as_str(), SensorLocation::new(1.0, 2.0, 3.0)),
            ("zz-not-a-key", SensorLocation::new(0.0, 0.0, 0.0)),
            ("02abcdef", SensorLocation::new(0.0, 0.0, 0.0)),
            (good_b.as_str(), SensorLocation::new(4.0, 5.0, 6.0)),
        ]);

        assert_eq!(table.len(), 2);
        let peer_a = peer_id_from_public_key(&good_a).unwrap();
        let peer_b = peer_id_from_public_key(&good_b).unwrap();
        assert_eq!(table.lookup(&peer_a), Some(SensorLocation::new(1.0, 2.0, 3.0)));
        assert_eq!(table.lookup(&peer_b), Some(SensorLocation::new(4.0, 5.0, 6.0)));
    }

    #[test]
    fn test_injected_converter_failure() {
        let peer = PeerId::random();
        let table = LocationOverrides::build(
            [
                ("first", SensorLocation::new(1.0, 1.0, 1.0)),
                ("broken", SensorLocation::new(9.0, 9.0, 9.0)),
            ],
            |key| match key {
                "first" => Ok(peer),
                _ => Err("conversion refused"),
            },
        );

        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup(&peer), Some(SensorLocation::new(1.0, 1.0, 1.0)));
    }

    #[test]
    fn test_later_duplicate_wins() {
        let key = random_key_hex();
        let table = LocationOverrides::from_public_keys([
            (key.as_str(), SensorLocation::new(1.0, 1.0, 1.0)),
            (key.as_str(), SensorLocation::new(2.0, 2.0, 2.0)),
        ]);

        let peer = peer_id_from_public_key(&key).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup(&peer), Some(SensorLocation::new(2.0, 2.0, 2.0)));
    }

    #[test]
    fn test_default_table() {
        let table = LocationOverrides::with_defaults();
        assert_eq!(table.len(), DEFAULT_OVERRIDES.len());

        let (first_key, first_location) = DEFAULT_OVERRIDES[0];
        let peer = peer_id_from_public_key(first_key).unwrap();
        assert_eq!(table.lookup(&peer), Some(first_location));
    }

    #[test]
    fn test_apply_replaces_position_unconditionally() {
        let key = random_key_hex();
        let table = LocationOverrides::from_public_keys([(
            key.as_str(),
            SensorLocation::new(50.0, -5.0, 100.0),
        )]);
        let peer = peer_id_from_public_key(&key).unwrap();

        let mut observation = SensorObservation {
            sensor_id: 3,
            latitude: 0.0,
            longitude: 0.0,
            altitude: -1.0,
            seconds_since_midnight: 10,
            nanoseconds: 20,
            raw_payload: vec![0x5D],
        };
        assert!(table.apply(&peer, &mut observation));
        assert_eq!(observation.location(), SensorLocation::new(50.0, -5.0, 100.0));
        assert_eq!(observation.sensor_id, 3);
        assert_eq!(observation.raw_payload, vec![0x5D]);

        let mut untouched = observation.clone();
        untouched.set_location(SensorLocation::new(1.0, 2.0, 3.0));
        assert!(!table.apply(&PeerId::random(), &mut untouched));
        assert_eq!(untouched.location(), SensorLocation::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_empty_table() {
        let table = LocationOverrides::default();
        assert!(table.is_empty());
        assert_eq!(table.lookup(&PeerId::random()), None);
    }
}
