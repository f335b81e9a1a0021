//! Admin secret and the bearer-credential gate.

use crate::crypto::compare::secrets_match;
use std::fmt;

/// In-memory admin secret.
///
/// Created once by the process entry point and moved into [`AdminGate`].
/// Never persisted; `Debug` output is redacted.
#[derive(Clone)]
pub struct AdminSecret(String);

impl AdminSecret {
    /// Wrap an existing secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw secret, for the one-time operator display.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AdminSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AdminSecret(<redacted>)")
    }
}

/// Checks presented credentials against the admin secret.
#[derive(Debug, Clone)]
pub struct AdminGate {
    secret: AdminSecret,
}

impl AdminGate {
    /// Create a gate owning `secret`.
    pub fn new(secret: AdminSecret) -> Self {
        Self { secret }
    }

    /// True only when `presented` equals the secret.
    ///
    /// Missing or empty credentials are `false`. The comparison is
    /// constant-time over fixed-size digests.
    pub fn authorize(&self, presented: Option<&str>) -> bool {
        match presented {
            Some(credential) if !credential.is_empty() => {
                secrets_match(credential, self.secret.expose())
            }
            _ => false,
        }
    }
}
