//! Durable license and usage storage on SQLite.
//!
//! Two tables: `licenses` (owned by [`LicenseStore`]) and `usage_records`
//! (owned by [`UsageLedger`], cascaded on license delete). Both stores share
//! one [`Database`] handle so the engine can span them in one transaction.

pub mod db;
pub mod licenses;
pub mod usage;

pub use db::Database;
pub use licenses::LicenseStore;
pub use usage::UsageLedger;

use crate::LicenseError;
use chrono::{DateTime, SecondsFormat, Utc};

/// Map a rusqlite error with context.
pub(crate) fn storage_err(context: &str, e: rusqlite::Error) -> LicenseError {
    LicenseError::Storage(format!("{}: {}", context, e))
}

/// True for UNIQUE / PRIMARY KEY / FOREIGN KEY violations.
pub(crate) fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub(crate) fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, LicenseError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| LicenseError::Storage(format!("Invalid stored timestamp {}: {}", s, e)))
}
