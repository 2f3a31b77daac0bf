//! SHA-256 hashing helpers.

use sha2::{Digest, Sha256};

/// A 256-bit (32-byte) hash value.
pub type Hash256 = [u8; 32];

/// Computes the SHA-256 hash of the input bytes.
#[must_use]
pub fn compute_hash256(data: &[u8]) -> Hash256 {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Computes a checksum of the given length: the trailing `length` bytes of
/// the SHA-256 hash of `data`.
///
/// # Panics
///
/// Panics if `length` is greater than 32.
#[must_use]
pub fn checksum(data: &[u8], length: usize) -> Vec<u8> {
    assert!(length <= 32, "checksum length out of range");
    let hash = compute_hash256(data);
    hash[32 - length..].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash256_deterministic() {
        assert_eq!(compute_hash256(b"snow"), compute_hash256(b"snow"));
        assert_ne!(compute_hash256(b"snow"), compute_hash256(b"storm"));
    }

    #[test]
    fn test_checksum_length() {
        assert_eq!(checksum(b"snow", 4).len(), 4);
        assert_eq!(checksum(b"", 0).len(), 0);
    }
}
