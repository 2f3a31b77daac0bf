//! CB58 encoding and decoding.
//!
//! CB58 is Base58 with a 4-byte SHA-256 checksum appended, the standard
//! text form for identifiers in this codebase.

use thiserror::Error;

use crate::hashing::checksum;

const CHECKSUM_LEN: usize = 4;

/// Errors that can occur during CB58 encoding/decoding.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Cb58Error {
    /// Failed to decode the Base58 string.
    #[error("base58 decoding error: {0}")]
    Base58Decoding(String),

    /// The input string is too short to contain a checksum.
    #[error("input string is smaller than the checksum size")]
    MissingChecksum,

    /// The checksum in the input does not match the computed checksum.
    #[error("invalid checksum")]
    BadChecksum,
}

/// Encodes bytes to a CB58 string.
pub fn encode_cb58(bytes: &[u8]) -> Result<String, Cb58Error> {
    let mut checked = Vec::with_capacity(bytes.len() + CHECKSUM_LEN);
    checked.extend_from_slice(bytes);
    checked.extend_from_slice(&checksum(bytes, CHECKSUM_LEN));
    Ok(bs58::encode(checked).into_string())
}

/// Decodes a CB58 string, verifying the trailing 4-byte checksum.
///
/// # Errors
///
/// Returns an error if the string is not valid Base58, is too short to hold
/// a checksum, or the checksum does not match.
pub fn decode_cb58(s: &str) -> Result<Vec<u8>, Cb58Error> {
    let decoded = bs58::decode(s)
        .into_vec()
        .map_err(|e| Cb58Error::Base58Decoding(e.to_string()))?;

    if decoded.len() < CHECKSUM_LEN {
        return Err(Cb58Error::MissingChecksum);
    }

    let (payload, check) = decoded.split_at(decoded.len() - CHECKSUM_LEN);
    if check != checksum(payload, CHECKSUM_LEN).as_slice() {
        return Err(Cb58Error::BadChecksum);
    }

    Ok(payload.to_vec())
}
