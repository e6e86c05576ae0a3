//! PostgreSQL advisory lock key encoding.

use std::sync::Arc;

use sha2::{Digest, Sha256};

/// Maps a lock key to an advisory lock id.
pub type KeyHasher = Arc<dyn Fn(&str) -> i64 + Send + Sync>;

/// Hashes a lock key to a signed 64-bit advisory lock id.
///
/// Takes the first 8 bytes of the key's SHA-256 digest as a big-endian
/// `i64`. Distinct keys can collide; two colliding keys exclude each other.
pub fn advisory_lock_id(key: &str) -> i64 {
    let digest = Sha256::digest(key.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    i64::from_be_bytes(prefix)
}

/// Returns the default [`KeyHasher`].
pub fn default_hasher() -> KeyHasher {
    Arc::new(advisory_lock_id)
}
