//! Identifier types for the snow consensus engines.
//!
//! Everything the conflict graph and the vertex DAG track — transactions,
//! vertices, UTXOs, chains — is named by an [`Id`]: a 32-byte value that is
//! typically the SHA-256 hash of the entity's serialization. Ids render as
//! CB58 (Base58 with a 4-byte checksum) for human-readable output.

mod cb58;
mod hashing;
mod id;

pub use cb58::{decode_cb58, encode_cb58, Cb58Error};
pub use hashing::{checksum, compute_hash256, Hash256};
pub use id::{Id, IdError};

/// Length of an ID in bytes (32 bytes / 256 bits).
pub const ID_LEN: usize = 32;
