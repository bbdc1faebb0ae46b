//! Hashing utilities.

use sha2::{Digest, Sha256};

/// Compute the SHA256 hash of a byte slice as a hex string.
pub fn sha256_hex(data: impl AsRef<[u8]>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_ref());
    hex::encode(hasher.finalize())
}
