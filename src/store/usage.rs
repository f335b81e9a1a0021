//! The `usage_records` table: one aggregated row per license.

use crate::model::{ClientAttributes, UsageRecord};
use crate::store::{
    format_timestamp, is_constraint_violation, parse_timestamp, storage_err, Database,
};
use crate::LicenseError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

/// Insert-or-increment in a single statement.
const UPSERT: &str = "
    INSERT INTO usage_records
        (license_key, ip, user_agent, hwid, geo_country, first_login, last_login, login_count)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, 1)
    ON CONFLICT (license_key) DO UPDATE SET
        ip = excluded.ip,
        user_agent = excluded.user_agent,
        hwid = excluded.hwid,
        geo_country = excluded.geo_country,
        last_login = excluded.last_login,
        login_count = usage_records.login_count + 1
";

pub(crate) fn record(
    conn: &Connection,
    key: &str,
    hwid: &str,
    attrs: &ClientAttributes,
    now: DateTime<Utc>,
) -> Result<(), LicenseError> {
    conn.execute(
        UPSERT,
        params![
            key,
            attrs.ip,
            attrs.user_agent,
            hwid,
            attrs.geo_country,
            format_timestamp(&now),
        ],
    )
    .map_err(|e| {
        // Foreign key: no such license
        if is_constraint_violation(&e) {
            LicenseError::InvalidKey
        } else {
            storage_err("Failed to record usage", e)
        }
    })?;
    Ok(())
}

pub(crate) fn find(conn: &Connection, key: &str) -> Result<Option<UsageRecord>, LicenseError> {
    let row = conn
        .query_row(
            "SELECT license_key, ip, user_agent, hwid, geo_country, first_login, last_login, login_count
             FROM usage_records WHERE license_key = ?1",
            params![key],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, i64>(7)?,
                ))
            },
        )
        .optional()
        .map_err(|e| storage_err("Failed to load usage", e))?;

    let Some((key, ip, user_agent, hwid, geo_country, first_login, last_login, login_count)) = row
    else {
        return Ok(None);
    };

    Ok(Some(UsageRecord {
        key,
        ip,
        user_agent,
        hwid,
        geo_country,
        first_login: parse_timestamp(&first_login)?,
        last_login: parse_timestamp(&last_login)?,
        login_count: login_count.max(0) as u64,
    }))
}

pub(crate) fn delete_for(conn: &Connection, key: &str) -> Result<(), LicenseError> {
    conn.execute("DELETE FROM usage_records WHERE license_key = ?1", params![key])
        .map_err(|e| storage_err("Failed to delete usage", e))?;
    Ok(())
}

/// Per-license usage history.
#[derive(Debug, Clone)]
pub struct UsageLedger {
    db: Database,
}

impl UsageLedger {
    /// Create a ledger over a shared database handle.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Record one successful verify.
    ///
    /// The first call creates the record with `login_count = 1` and
    /// `first_login = last_login = now`; later calls overwrite the client
    /// attributes, move `last_login` and add exactly one to the count.
    ///
    /// # Errors
    /// * `InvalidKey` - no license row for `key`
    pub fn record_successful_verify(
        &self,
        key: &str,
        hwid: &str,
        attrs: &ClientAttributes,
        now: DateTime<Utc>,
    ) -> Result<(), LicenseError> {
        self.db.with_connection(|conn| record(conn, key, hwid, attrs, now))
    }

    /// Usage snapshot for a license.
    pub fn get(&self, key: &str) -> Result<Option<UsageRecord>, LicenseError> {
        self.db.with_connection(|conn| find(conn, key))
    }

    /// Remove the usage record for a license.
    pub fn delete_for(&self, key: &str) -> Result<(), LicenseError> {
        self.db.with_connection(|conn| delete_for(conn, key))
    }
}
