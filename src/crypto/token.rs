//! URL-safe random tokens from the OS RNG.

use crate::LicenseError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::rngs::OsRng;
use rand::RngCore;

/// Draw `num_bytes` from the OS RNG and encode them as unpadded URL-safe
/// base64.
///
/// # Errors
/// * `Entropy` - the OS randomness source failed
pub fn random_token(num_bytes: usize) -> Result<String, LicenseError> {
    let mut buf = vec![0u8; num_bytes];
    OsRng
        .try_fill_bytes(&mut buf)
        .map_err(|e| LicenseError::Entropy(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(&buf))
}
