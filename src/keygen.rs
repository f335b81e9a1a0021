//! License key and admin secret generation.

use crate::admin::AdminSecret;
use crate::config::LicenseGateConfig;
use crate::crypto::token::random_token;
use crate::LicenseError;

/// Random bytes in an admin secret.
pub const ADMIN_SECRET_BYTES: usize = 32;

/// Produces license keys and the admin secret.
///
/// Keys are `prefix + UPPERCASE(base64url(random))`. Uniqueness against
/// stored keys is enforced by the store's primary key on insert.
#[derive(Debug, Clone)]
pub struct KeyGenerator {
    prefix: &'static str,
    entropy_bytes: usize,
}

impl KeyGenerator {
    /// Build a generator from config.
    pub fn new(config: &LicenseGateConfig) -> Self {
        Self {
            prefix: config.key_prefix,
            entropy_bytes: config.key_entropy_bytes,
        }
    }

    /// Generate a fresh license key.
    ///
    /// # Errors
    /// * `Entropy` - OS randomness unavailable
    pub fn new_license_key(&self) -> Result<String, LicenseError> {
        let token = random_token(self.entropy_bytes)?;
        Ok(format!("{}{}", self.prefix, token.to_uppercase()))
    }

    /// Generate the process-lifetime admin secret.
    ///
    /// # Errors
    /// * `Entropy` - OS randomness unavailable (fatal at start-up)
    pub fn new_admin_secret(&self) -> Result<AdminSecret, LicenseError> {
        random_token(ADMIN_SECRET_BYTES).map(AdminSecret::new)
    }

    /// Key prefix.
    pub fn prefix(&self) -> &str {
        self.prefix
    }
}

impl Default for KeyGenerator {
    fn default() -> Self {
        Self::new(&LicenseGateConfig::default())
    }
}
