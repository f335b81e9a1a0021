//! Typed request payloads and transport metadata.
//!
//! Missing JSON fields deserialize to empty values so the engine reports
//! them as `MissingField` rather than the parser failing opaquely.

use serde::Deserialize;

/// Header value used when the client sends no User-Agent.
pub const UNKNOWN_USER_AGENT: &str = "Unknown";

/// `POST /verify` body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyRequest {
    /// License key.
    #[serde(default)]
    pub key: String,
    /// Client hardware id.
    #[serde(default)]
    pub hwid: String,
}

/// `POST /api/generate` body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateRequest {
    /// Optional hardware id to pre-bind.
    #[serde(default)]
    pub hwid: Option<String>,
    /// Expiration date, `YYYY-MM-DD`.
    #[serde(default)]
    pub expires_at: String,
    /// Plan label; the configured default when absent.
    #[serde(default)]
    pub plan: Option<String>,
}

/// Body (or query) naming a single license.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeyRequest {
    /// License key.
    #[serde(default)]
    pub key: String,
}

/// Transport metadata of the calling client.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    /// Peer socket address.
    pub remote_addr: String,
    /// `X-Forwarded-For` header, if present.
    pub forwarded_for: Option<String>,
    /// `User-Agent` header, if present.
    pub user_agent: Option<String>,
}

impl ClientInfo {
    /// Client IP: the first `X-Forwarded-For` hop when present, else the
    /// peer address.
    pub fn effective_ip(&self) -> &str {
        self.forwarded_for
            .as_deref()
            .and_then(|h| h.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .unwrap_or(self.remote_addr.as_str())
    }

    /// User agent or [`UNKNOWN_USER_AGENT`].
    pub fn user_agent(&self) -> &str {
        self.user_agent
            .as_deref()
            .filter(|ua| !ua.is_empty())
            .unwrap_or(UNKNOWN_USER_AGENT)
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
///
/// Anything else (missing header, other scheme, empty token) is `None`.
pub fn parse_bearer(header: Option<&str>) -> Option<&str> {
    header?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Parse a JSON request body.
pub fn parse_body<'a, T: Deserialize<'a>>(body: &'a [u8]) -> Result<T, crate::LicenseError> {
    serde_json::from_slice(body).map_err(|_| crate::LicenseError::MissingField { field: "body" })
}
