//! SHA-256 helpers.

use sha2::{Digest, Sha256};

/// Raw SHA-256 of arbitrary bytes.
pub fn sha256(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(bytes).into()
}

/// Short hex fingerprint of a license key.
///
/// Logs carry this instead of the key itself. 16 hex chars (64 bits) is
/// enough to correlate log lines without exposing a usable key.
pub fn key_fingerprint(license_key: &str) -> String {
    let hash = sha256(license_key.as_bytes());
    hex::encode(&hash[..8])
}
