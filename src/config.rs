//! Licensegate configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Where the license database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// `dirs::data_dir()/<namespace>/licenses.db`.
    DataDir,
    /// Explicit database file path.
    Path(PathBuf),
    /// Private in-memory database (lost on drop).
    InMemory,
}

/// Configuration for the license engine and service facade.
#[derive(Debug, Clone)]
pub struct LicenseGateConfig {
    /// Namespace used for the data directory.
    /// Each deployment should use a unique namespace to avoid collisions.
    pub namespace: &'static str,

    /// Database location.
    pub store: StoreLocation,

    /// Prefix prepended to every generated license key (e.g., "LIC-").
    pub key_prefix: &'static str,

    /// Random bytes drawn per license key. Must be at least 16.
    pub key_entropy_bytes: usize,

    /// Plan assigned when a generate request omits one.
    pub default_plan: &'static str,

    /// Timeout for the geolocation lookup.
    pub geo_timeout: Duration,
}

impl Default for LicenseGateConfig {
    fn default() -> Self {
        Self {
            namespace: "licensegate",
            store: StoreLocation::DataDir,
            key_prefix: "LIC-",
            key_entropy_bytes: 16,
            default_plan: "basic",
            geo_timeout: Duration::from_secs(2),
        }
    }
}

impl LicenseGateConfig {
    /// Validate configuration for obvious errors.
    pub fn validate(&self) -> Result<(), crate::LicenseError> {
        if self.namespace.is_empty() {
            return Err(crate::LicenseError::ConfigError(
                "namespace cannot be empty".to_string(),
            ));
        }
        if self.key_prefix.is_empty() {
            return Err(crate::LicenseError::ConfigError(
                "key_prefix cannot be empty".to_string(),
            ));
        }
        if self.key_entropy_bytes < 16 {
            return Err(crate::LicenseError::ConfigError(format!(
                "key_entropy_bytes must be at least 16, got {}",
                self.key_entropy_bytes
            )));
        }
        if self.default_plan.is_empty() {
            return Err(crate::LicenseError::ConfigError(
                "default_plan cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the database file path, `None` for in-memory stores.
    pub fn database_path(&self) -> Result<Option<PathBuf>, crate::LicenseError> {
        match &self.store {
            StoreLocation::InMemory => Ok(None),
            StoreLocation::Path(path) => Ok(Some(path.clone())),
            StoreLocation::DataDir => {
                let base_dir = dirs::data_dir().ok_or_else(|| {
                    crate::LicenseError::ConfigError("Could not find data directory".to_string())
                })?;
                Ok(Some(base_dir.join(self.namespace).join("licenses.db")))
            }
        }
    }
}
