//! License and usage records plus the engine's result payloads.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Storage format for expiration dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A license row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    /// Opaque unique key (e.g., `LIC-...`).
    pub key: String,

    /// Bound hardware id; `None` until the first successful verify.
    pub hwid: Option<String>,

    /// Last valid date.
    pub expires_at: NaiveDate,

    /// Opaque tier label.
    pub plan: String,

    /// When the row was inserted.
    pub created_at: DateTime<Utc>,
}

/// Lifecycle state of a license at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicenseStatus {
    /// No hardware id bound yet.
    New,
    /// Bound and not expired.
    Bound,
    /// Past its expiration, whatever the binding.
    Expired,
}

impl License {
    /// True when `now` is strictly after the start of `expires_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > start_of_day(self.expires_at)
    }

    /// Lifecycle state at `now`.
    pub fn status_at(&self, now: DateTime<Utc>) -> LicenseStatus {
        if self.is_expired_at(now) {
            LicenseStatus::Expired
        } else if self.hwid.is_some() {
            LicenseStatus::Bound
        } else {
            LicenseStatus::New
        }
    }
}

/// Aggregated usage for one license.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Owning license key.
    pub key: String,
    /// Last client IP.
    pub ip: String,
    /// Last client user agent.
    pub user_agent: String,
    /// Last hardware id presented on success.
    pub hwid: String,
    /// Last resolved country code.
    pub geo_country: String,
    /// First successful verify.
    pub first_login: DateTime<Utc>,
    /// Most recent successful verify.
    pub last_login: DateTime<Utc>,
    /// Successful verifies so far.
    pub login_count: u64,
}

/// Caller-extracted attributes of a verify request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientAttributes {
    /// Client IP address.
    pub ip: String,
    /// Client user agent.
    pub user_agent: String,
    /// Country code from geolocation.
    pub geo_country: String,
}

/// Successful verify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyResult {
    /// Always true.
    pub valid: bool,
    /// Expiration date.
    #[serde(with = "date_format")]
    pub expires_at: NaiveDate,
    /// Plan label.
    pub plan: String,
}

/// Successful generate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerateResult {
    /// The new license key.
    pub key: String,
    /// Expiration date.
    #[serde(with = "date_format")]
    pub expires_at: NaiveDate,
}

/// Successful delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteResult {
    /// The removed key.
    pub key: String,
}

/// Successful HWID reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResetResult {
    /// The reset key.
    pub key: String,
    /// Always `None` after a reset.
    pub hwid: Option<String>,
}

/// Midnight UTC at the start of `date`.
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Result<NaiveDate, crate::LicenseError> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|e| crate::LicenseError::InvalidDate(format!("{} ({})", s, e)))
}

mod date_format {
    use super::DATE_FORMAT;
    use chrono::NaiveDate;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(DATE_FORMAT).to_string())
    }
}
