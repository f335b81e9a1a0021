//! The `licenses` table.
//!
//! Free functions take a `&Connection` so the engine can compose them inside
//! one transaction; [`LicenseStore`] wraps each in its own atomic call.

use crate::model::{parse_date, License, DATE_FORMAT};
use crate::store::{
    format_timestamp, is_constraint_violation, parse_timestamp, storage_err, usage, Database,
};
use crate::LicenseError;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};

pub(crate) fn insert(conn: &Connection, license: &License) -> Result<(), LicenseError> {
    conn.execute(
        "INSERT INTO licenses (key, hwid, expires_at, plan, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            license.key,
            license.hwid,
            license.expires_at.format(DATE_FORMAT).to_string(),
            license.plan,
            format_timestamp(&license.created_at),
        ],
    )
    .map_err(|e| {
        if is_constraint_violation(&e) {
            LicenseError::DuplicateKey
        } else {
            storage_err("Failed to insert license", e)
        }
    })?;
    Ok(())
}

pub(crate) fn find(conn: &Connection, key: &str) -> Result<Option<License>, LicenseError> {
    let row = conn
        .query_row(
            "SELECT key, hwid, expires_at, plan, created_at FROM licenses WHERE key = ?1",
            params![key],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            },
        )
        .optional()
        .map_err(|e| storage_err("Failed to load license", e))?;

    let Some((key, hwid, expires_at, plan, created_at)) = row else {
        return Ok(None);
    };

    Ok(Some(License {
        key,
        hwid,
        expires_at: parse_date(&expires_at)
            .map_err(|e| LicenseError::Storage(format!("Invalid stored expiry: {}", e)))?,
        plan,
        created_at: parse_timestamp(&created_at)?,
    }))
}

/// Bind `hwid` only if the license is currently unbound.
///
/// Returns true when this call performed the bind.
pub(crate) fn bind_if_unbound(
    conn: &Connection,
    key: &str,
    hwid: &str,
) -> Result<bool, LicenseError> {
    let affected = conn
        .execute(
            "UPDATE licenses SET hwid = ?2 WHERE key = ?1 AND hwid IS NULL",
            params![key, hwid],
        )
        .map_err(|e| storage_err("Failed to bind hwid", e))?;
    Ok(affected > 0)
}

pub(crate) fn update_hwid(
    conn: &Connection,
    key: &str,
    hwid: Option<&str>,
) -> Result<bool, LicenseError> {
    let affected = conn
        .execute(
            "UPDATE licenses SET hwid = ?2 WHERE key = ?1",
            params![key, hwid],
        )
        .map_err(|e| storage_err("Failed to update hwid", e))?;
    Ok(affected > 0)
}

pub(crate) fn remove(conn: &Connection, key: &str) -> Result<bool, LicenseError> {
    usage::delete_for(conn, key)?;
    let affected = conn
        .execute("DELETE FROM licenses WHERE key = ?1", params![key])
        .map_err(|e| storage_err("Failed to delete license", e))?;
    Ok(affected > 0)
}

/// License rows.
#[derive(Debug, Clone)]
pub struct LicenseStore {
    db: Database,
}

impl LicenseStore {
    /// Create a store over a shared database handle.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert a new license.
    ///
    /// # Errors
    /// * `DuplicateKey` - `key` already exists
    pub fn create(
        &self,
        key: &str,
        hwid: Option<&str>,
        expires_at: NaiveDate,
        plan: &str,
        created_at: DateTime<Utc>,
    ) -> Result<License, LicenseError> {
        let license = License {
            key: key.to_string(),
            hwid: hwid.map(String::from),
            expires_at,
            plan: plan.to_string(),
            created_at,
        };
        self.db.with_connection(|conn| insert(conn, &license))?;
        Ok(license)
    }

    /// Look up a license.
    pub fn get(&self, key: &str) -> Result<Option<License>, LicenseError> {
        self.db.with_connection(|conn| find(conn, key))
    }

    /// Delete a license and its usage record. Returns whether it existed.
    pub fn delete(&self, key: &str) -> Result<bool, LicenseError> {
        self.db.transaction(|tx| remove(tx, key))
    }

    /// Set or overwrite the bound hardware id.
    pub fn set_hwid(&self, key: &str, hwid: &str) -> Result<bool, LicenseError> {
        self.db.with_connection(|conn| update_hwid(conn, key, Some(hwid)))
    }

    /// Clear the bound hardware id.
    pub fn clear_hwid(&self, key: &str) -> Result<bool, LicenseError> {
        self.db.with_connection(|conn| update_hwid(conn, key, None))
    }

    /// Compare-and-set bind on an unbound license.
    pub fn bind_if_unbound(&self, key: &str, hwid: &str) -> Result<bool, LicenseError> {
        self.db.with_connection(|conn| bind_if_unbound(conn, key, hwid))
    }

    /// Number of stored licenses.
    pub fn count(&self) -> Result<u64, LicenseError> {
        self.db.with_connection(|conn| {
            conn.query_row("SELECT COUNT(*) FROM licenses", [], |row| row.get::<_, i64>(0))
                .map(|n| n as u64)
                .map_err(|e| storage_err("Failed to count licenses", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn store() -> LicenseStore {
        LicenseStore::new(Database::open_in_memory().unwrap())
    }

    fn created() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap()
    }

    fn expiry() -> NaiveDate {
        NaiveDate::from_ymd_opt(2099, 1, 1).unwrap()
    }

    #[test]
    fn test_create_and_get() {
        let store = store();
        let created = store
            .create("LIC-A1", None, expiry(), "premium", created())
            .unwrap();

        let loaded = store.get("LIC-A1").unwrap().unwrap();
        assert_eq!(loaded, created);
        assert_eq!(loaded.hwid, None);
        assert_eq!(loaded.plan, "premium");
    }

    #[test]
    fn test_get_missing() {
        assert!(store().get("LIC-NOPE").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let store = store();
        store.create("LIC-A1", None, expiry(), "basic", created()).unwrap();
        let result = store.create("LIC-A1", Some("hw-9"), expiry(), "basic", created());
        assert!(matches!(result, Err(LicenseError::DuplicateKey)));

        // Original row untouched
        assert_eq!(store.get("LIC-A1").unwrap().unwrap().hwid, None);
    }

    #[test]
    fn test_set_and_clear_hwid() {
        let store = store();
        store.create("LIC-A1", None, expiry(), "basic", created()).unwrap();

        assert!(store.set_hwid("LIC-A1", "hw-1").unwrap());
        assert_eq!(store.get("LIC-A1").unwrap().unwrap().hwid.as_deref(), Some("hw-1"));

        assert!(store.clear_hwid("LIC-A1").unwrap());
        assert_eq!(store.get("LIC-A1").unwrap().unwrap().hwid, None);

        assert!(!store.set_hwid("LIC-NOPE", "hw-1").unwrap());
        assert!(!store.clear_hwid("LIC-NOPE").unwrap());
    }

    #[test]
    fn test_bind_if_unbound_is_compare_and_set() {
        let store = store();
        store.create("LIC-A1", None, expiry(), "basic", created()).unwrap();

        assert!(store.bind_if_unbound("LIC-A1", "hw-1").unwrap());
        assert!(!store.bind_if_unbound("LIC-A1", "hw-2").unwrap());
        assert_eq!(store.get("LIC-A1").unwrap().unwrap().hwid.as_deref(), Some("hw-1"));
    }

    #[test]
    fn test_delete() {
        let store = store();
        store.create("LIC-A1", None, expiry(), "basic", created()).unwrap();
        assert_eq!(store.count().unwrap(), 1);

        assert!(store.delete("LIC-A1").unwrap());
        assert!(!store.delete("LIC-A1").unwrap());
        assert!(store.get("LIC-A1").unwrap().is_none());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_prebound_create() {
        let store = store();
        store
            .create("LIC-B2", Some("hw-7"), expiry(), "basic", created())
            .unwrap();
        assert_eq!(store.get("LIC-B2").unwrap().unwrap().hwid.as_deref(), Some("hw-7"));
    }
}
