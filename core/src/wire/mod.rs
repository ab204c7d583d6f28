//! ADS-B wire protocol: one-byte length prefix, fixed 48-byte sensor header,
//! opaque Mode S payload.
//!
//! This module provides:
//! - `read_exact`: exact-length reads that reassemble partial stream reads
//! - `SensorObservation`: big-endian header decoding and frame encoding
//! - `write_observation`: length-prefixed frame output for feeds
//!
//! Frame layout:
//! [1 byte]  body length N (0..=255)
//! [8 bytes] sensor id (BE i64)
//! [8 bytes] latitude, longitude, altitude (BE f64 each)
//! [8 bytes] seconds since midnight, nanoseconds (BE u64 each)
//! [N - 48]  raw Mode S message

pub mod packet;
pub mod reader;
pub mod writer;

pub use packet::{SensorLocation, SensorObservation, HEADER_LEN, MAX_BODY_LEN, MAX_PAYLOAD_LEN};
pub use reader::{read_exact, read_length_prefix};
pub use writer::write_observation;

use thiserror::Error;

/// Wire protocol errors
#[derive(Debug, Error)]
pub enum WireError {
    /// The peer finished the stream (zero-byte read or EOF).
    #[error("End of stream")]
    EndOfStream,

    #[error("Frame too short: need {need} bytes, got {got}")]
    FrameTooShort { need: usize, got: usize },

    /// The read deadline passed after a frame had started arriving.
    #[error("Read deadline expired mid-frame")]
    Timeout,

    #[error("Payload too large: {0} bytes (max {max})", max = MAX_PAYLOAD_LEN)]
    PayloadTooLarge(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WireError {
    /// Whether this error ends a session quietly rather than as a failure.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, WireError::EndOfStream)
    }
}
