//! Licensegate error types.

use thiserror::Error;

/// Errors produced by the license engine and its collaborators.
///
/// Every variant except `Entropy`, `Storage` and `ConfigError` is an
/// expected outcome the caller maps to a response.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// A required request field is empty or absent.
    #[error("Missing required field: {field}")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
    },

    /// License key does not exist.
    #[error("Key not found")]
    InvalidKey,

    /// License is past its expiration date.
    #[error("License expired")]
    Expired,

    /// License is bound to a different hardware id.
    #[error("HWID mismatch")]
    HwidMismatch,

    /// Admin credential missing or wrong.
    #[error("Invalid admin key")]
    Unauthorized,

    /// Target of an admin operation does not exist.
    #[error("License key not found")]
    NotFound,

    /// Generated key collided with an existing one.
    #[error("Duplicate license key")]
    DuplicateKey,

    /// OS randomness source failed.
    #[error("Entropy source unavailable: {0}")]
    Entropy(String),

    /// Expiration date could not be parsed.
    #[error("Invalid date format. Use YYYY-MM-DD: {0}")]
    InvalidDate(String),

    /// Durable store failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}
