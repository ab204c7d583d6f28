// Sensor observation packet: fixed big-endian header plus raw Mode S bytes

use super::WireError;
use serde::{Deserialize, Serialize};

/// Fixed header: sensor id, lat, lon, alt, seconds since midnight, nanoseconds.
pub const HEADER_LEN: usize = 6 * 8;

/// Largest body a one-byte length prefix can announce.
pub const MAX_BODY_LEN: usize = u8::MAX as usize;

/// Largest raw Mode S payload the encoder emits: prefix, header and payload
/// together stay within 255 bytes. Longer bodies announced by a peer still decode.
pub const MAX_PAYLOAD_LEN: usize = MAX_BODY_LEN - 1 - HEADER_LEN;

/// A sensor position in WGS84 degrees and metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorLocation {
    pub lat: f64,
    pub lon: f64,
    pub alt: f64,
}

impl SensorLocation {
    pub const fn new(lat: f64, lon: f64, alt: f64) -> Self {
        Self { lat, lon, alt }
    }
}

/// One decoded frame body.
///
/// The capture time carries no calendar date; callers that need an absolute
/// timestamp must combine it with the date the feed was recorded on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorObservation {
    /// Identifier the sensor reports for itself
    pub sensor_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub seconds_since_midnight: u64,
    pub nanoseconds: u64,
    /// Embedded surveillance message, opaque at this layer
    #[serde(with = "hex::serde")]
    pub raw_payload: Vec<u8>,
}

impl SensorObservation {
    /// Decode a fully buffered frame body.
    ///
    /// Bodies shorter than [`HEADER_LEN`] are refused with
    /// [`WireError::FrameTooShort`]; nothing else can fail since there is no
    /// checksum or magic number to verify.
    pub fn decode(body: &[u8]) -> Result<Self, WireError> {
        if body.len() < HEADER_LEN {
            return Err(WireError::FrameTooShort {
                need: HEADER_LEN,
                got: body.len(),
            });
        }

        let (header, payload) = body.split_at(HEADER_LEN);
        let word = |index: usize| -> [u8; 8] {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&header[index * 8..(index + 1) * 8]);
            bytes
        };

        Ok(Self {
            sensor_id: i64::from_be_bytes(word(0)),
            latitude: f64::from_be_bytes(word(1)),
            longitude: f64::from_be_bytes(word(2)),
            altitude: f64::from_be_bytes(word(3)),
            seconds_since_midnight: u64::from_be_bytes(word(4)),
            nanoseconds: u64::from_be_bytes(word(5)),
            raw_payload: payload.to_vec(),
        })
    }

    /// Serialize the body (header + payload) without the length prefix.
    pub fn encode_body(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LEN + self.raw_payload.len());
        buf.extend_from_slice(&self.sensor_id.to_be_bytes());
        buf.extend_from_slice(&self.latitude.to_be_bytes());
        buf.extend_from_slice(&self.longitude.to_be_bytes());
        buf.extend_from_slice(&self.altitude.to_be_bytes());
        buf.extend_from_slice(&self.seconds_since_midnight.to_be_bytes());
        buf.extend_from_slice(&self.nanoseconds.to_be_bytes());
        buf.extend_from_slice(&self.raw_payload);
        buf
    }

    /// Serialize a complete frame: `[1 byte length][body]`.
    pub fn encode_frame(&self) -> Result<Vec<u8>, WireError> {
        if self.raw_payload.len() > MAX_PAYLOAD_LEN {
            return Err(WireError::PayloadTooLarge(self.raw_payload.len()));
        }

        let body = self.encode_body();
        let mut frame = Vec::with_capacity(1 + body.len());
        frame.push(body.len() as u8);
        frame.extend_from_slice(&body);
        Ok(frame)
    }

    /// Position as reported on the wire (or as overridden).
    pub fn location(&self) -> SensorLocation {
        SensorLocation::new(self.latitude, self.longitude, self.altitude)
    }

    /// Replace the reported position.
    pub fn set_location(&mut self, location: SensorLocation) {
        self.latitude = location.lat;
        self.longitude = location.lon;
        self.altitude = location.alt;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn make_observation(payload: Vec<u8>) -> SensorObservation {
        SensorObservation {
            sensor_id: -7_001,
            latitude: 50.102509,
            longitude: -5.68199,
            altitude: 192.8,
            seconds_since_midnight: 45_296,
            nanoseconds: 123_456_789,
            raw_payload: payload,
        }
    }

    #[test]
    fn test_decode_known_bytes() {
        let mut body = Vec::new();
        body.extend_from_slice(&1i64.to_be_bytes());
        body.extend_from_slice(&50.0f64.to_be_bytes());
        body.extend_from_slice(&(-5.0f64).to_be_bytes());
        body.extend_from_slice(&100.0f64.to_be_bytes());
        body.extend_from_slice(&3_600u64.to_be_bytes());
        body.extend_from_slice(&500u64.to_be_bytes());
        body.extend_from_slice(&[0x8D, 0x40, 0x62, 0x1D]);

        let obs = SensorObservation::decode(&body).unwrap();
        assert_eq!(obs.sensor_id, 1);
        assert_eq!(obs.latitude, 50.0);
        assert_eq!(obs.longitude, -5.0);
        assert_eq!(obs.altitude, 100.0);
        assert_eq!(obs.seconds_since_midnight, 3_600);
        assert_eq!(obs.nanoseconds, 500);
        assert_eq!(obs.raw_payload, vec![0x8D, 0x40, 0x62, 0x1D]);
    }

    #[test]
    fn test_big_endian_layout() {
        let mut obs = make_observation(vec![]);
        obs.sensor_id = 0x0102_0304_0506_0708;
        let body = obs.encode_body();

        assert_eq!(&body[..8], &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(&body[8..16], &50.102509f64.to_bits().to_be_bytes());
    }

    #[test]
    fn test_header_only_body_has_empty_payload() {
        let body = make_observation(vec![]).encode_body();
        assert_eq!(body.len(), HEADER_LEN);

        let obs = SensorObservation::decode(&body).unwrap();
        assert!(obs.raw_payload.is_empty());
    }

    #[test]
    fn test_one_byte_short_is_rejected() {
        let body = make_observation(vec![]).encode_body();

        match SensorObservation::decode(&body[..HEADER_LEN - 1]) {
            Err(WireError::FrameTooShort { need, got }) => {
                assert_eq!(need, HEADER_LEN);
                assert_eq!(got, 47);
            }
            other => panic!("Expected FrameTooShort, got {:?}", other),
        }
    }

    #[test]
    fn test_frame_length_prefix() {
        let obs = make_observation(vec![0xAB; 14]);
        let frame = obs.encode_frame().unwrap();

        assert_eq!(frame[0] as usize, HEADER_LEN + 14);
        assert_eq!(frame.len(), 1 + HEADER_LEN + 14);
        assert_eq!(SensorObservation::decode(&frame[1..]).unwrap(), obs);
    }

    #[test]
    fn test_largest_payload_fits() {
        let frame = make_observation(vec![0x11; MAX_PAYLOAD_LEN])
            .encode_frame()
            .unwrap();
        assert_eq!(frame[0], 254);
        assert_eq!(frame.len(), MAX_BODY_LEN);
    }

    #[test]
    fn test_full_body_from_peer_decodes() {
        let mut body = make_observation(vec![]).encode_body();
        body.resize(MAX_BODY_LEN, 0x22);

        let obs = SensorObservation::decode(&body).unwrap();
        assert_eq!(obs.raw_payload.len(), MAX_BODY_LEN - HEADER_LEN);
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let result = make_observation(vec![0; MAX_PAYLOAD_LEN + 1]).encode_frame();
        assert!(matches!(result, Err(WireError::PayloadTooLarge(207))));
    }

    #[test]
    fn test_set_location() {
        let mut obs = make_observation(vec![]);
        obs.set_location(SensorLocation::new(50.0, -5.0, 100.0));
        assert_eq!(obs.location(), SensorLocation::new(50.0, -5.0, 100.0));
    }

    #[test]
    fn test_json_payload_is_hex() {
        let obs = make_observation(vec![0x8D, 0x4C]);
        let json = serde_json::to_value(&obs).unwrap();
        assert_eq!(json["raw_payload"], "8d4c");
        assert_eq!(json["sensor_id"], -7_001);
    }

    proptest! {
        #[test]
        fn prop_frame_roundtrip(
            sensor_id in any::<i64>(),
            latitude in -90.0f64..90.0,
            longitude in -180.0f64..180.0,
            altitude in -500.0f64..15_000.0,
            seconds_since_midnight in 0u64..86_400,
            nanoseconds in 0u64..1_000_000_000,
            raw_payload in proptest::collection::vec(any::<u8>(), 0..=MAX_PAYLOAD_LEN),
        ) {
            let obs = SensorObservation {
                sensor_id,
                latitude,
                longitude,
                altitude,
                seconds_since_midnight,
                nanoseconds,
                raw_payload,
            };

            let frame = obs.encode_frame().unwrap();
            prop_assert_eq!(frame[0] as usize, frame.len() - 1);
            let decoded = SensorObservation::decode(&frame[1..]).unwrap();
            prop_assert_eq!(decoded, obs);
        }
    }
}
