// Key conversion: Hedera ECDSA (secp256k1) keys to libp2p identities

use libp2p::identity::{self, secp256k1, Keypair};
use libp2p::PeerId;
use thiserror::Error;

/// DER `SubjectPublicKeyInfo` prefix Hedera puts in front of a compressed
/// secp256k1 public key.
const DER_SECP256K1_PUBLIC_PREFIX: &[u8] = &[
    0x30, 0x2d, 0x30, 0x07, 0x06, 0x05, 0x2b, 0x81, 0x04, 0x00, 0x0a, 0x03, 0x22, 0x00,
];

/// DER `ECPrivateKey` prefix Hedera puts in front of a raw secp256k1 secret.
const DER_SECP256K1_PRIVATE_PREFIX: &[u8] = &[
    0x30, 0x30, 0x02, 0x01, 0x00, 0x30, 0x07, 0x06, 0x05, 0x2b, 0x81, 0x04, 0x00, 0x0a, 0x04,
    0x22, 0x04, 0x20,
];

const COMPRESSED_LEN: usize = 33;
const UNCOMPRESSED_LEN: usize = 65;
const SECRET_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("Invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("Unsupported key length: {0} bytes")]
    UnsupportedLength(usize),

    #[error("Invalid secp256k1 key: {0}")]
    InvalidKey(String),
}

fn decode_hex(input: &str) -> Result<Vec<u8>, KeyError> {
    let trimmed = input.trim();
    let trimmed = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    Ok(hex::decode(trimmed)?)
}

/// Normalise a SEC1 point to the 33-byte compressed form.
fn compressed_public_key(sec1: &[u8]) -> Result<[u8; COMPRESSED_LEN], KeyError> {
    let mut out = [0u8; COMPRESSED_LEN];
    match sec1.len() {
        COMPRESSED_LEN => out.copy_from_slice(sec1),
        UNCOMPRESSED_LEN if sec1[0] == 0x04 => {
            // 0x04 || X || Y  ->  (0x02 | parity(Y)) || X
            out[0] = 0x02 | (sec1[UNCOMPRESSED_LEN - 1] & 0x01);
            out[1..].copy_from_slice(&sec1[1..COMPRESSED_LEN]);
        }
        other => return Err(KeyError::UnsupportedLength(other)),
    }
    Ok(out)
}

/// Parse a hex-encoded secp256k1 public key.
///
/// Accepts compressed (33 bytes) or uncompressed (65 bytes) SEC1 points, with
/// or without Hedera's DER wrapper, and an optional `0x` prefix.
pub fn parse_public_key(input: &str) -> Result<secp256k1::PublicKey, KeyError> {
    let bytes = decode_hex(input)?;
    let sec1 = bytes
        .strip_prefix(DER_SECP256K1_PUBLIC_PREFIX)
        .unwrap_or(&bytes);

    let compressed = compressed_public_key(sec1)?;
    let public = secp256k1::PublicKey::try_from_bytes(&compressed)
        .map_err(|e| KeyError::InvalidKey(e.to_string()))?;

    // Compression drops Y; the decompressed point must match what was given
    if sec1.len() == UNCOMPRESSED_LEN && public.to_bytes_uncompressed()[..] != sec1[..] {
        return Err(KeyError::InvalidKey(
            "uncompressed point is not on the curve".to_string(),
        ));
    }
    Ok(public)
}

/// The libp2p `PeerId` a node holding this public key would present.
pub fn peer_id_from_public_key(input: &str) -> Result<PeerId, KeyError> {
    let public = parse_public_key(input)?;
    Ok(identity::PublicKey::from(public).to_peer_id())
}

/// Build a node keypair from a hex-encoded secp256k1 secret (raw or DER).
pub fn keypair_from_private_key(input: &str) -> Result<Keypair, KeyError> {
    let bytes = decode_hex(input)?;
    let mut secret = bytes
        .strip_prefix(DER_SECP256K1_PRIVATE_PREFIX)
        .unwrap_or(&bytes)
        .to_vec();
    if secret.len() != SECRET_LEN {
        return Err(KeyError::UnsupportedLength(secret.len()));
    }

    let secret = secp256k1::SecretKey::try_from_bytes(&mut secret)
        .map_err(|e| KeyError::InvalidKey(e.to_string()))?;
    Ok(secp256k1::Keypair::from(secret).into())
}
