//! Shared SQLite handle, schema and transactions.

use crate::config::LicenseGateConfig;
use crate::store::storage_err;
use crate::LicenseError;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS licenses (
        key TEXT PRIMARY KEY,
        hwid TEXT,
        expires_at TEXT NOT NULL,
        plan TEXT NOT NULL DEFAULT 'basic',
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS usage_records (
        license_key TEXT PRIMARY KEY
            REFERENCES licenses (key) ON DELETE CASCADE,
        ip TEXT NOT NULL,
        user_agent TEXT NOT NULL,
        hwid TEXT NOT NULL,
        geo_country TEXT NOT NULL,
        first_login TEXT NOT NULL,
        last_login TEXT NOT NULL,
        login_count INTEGER NOT NULL
    );
";

/// Cloneable handle to the license database.
///
/// Every clone shares one connection; each call holds it for the duration of
/// a single statement or transaction, so no caller observes a half-applied
/// operation.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) a database file, creating parent directories.
    pub fn open(path: &Path) -> Result<Self, LicenseError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    LicenseError::Storage(format!("Failed to create database dir: {}", e))
                })?;
            }
        }
        let conn = Connection::open(path).map_err(|e| storage_err("Failed to open database", e))?;
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(|e| storage_err("Failed to set busy timeout", e))?;
        Self::init(conn)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, LicenseError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| storage_err("Failed to open in-memory database", e))?;
        Self::init(conn)
    }

    /// Open the database described by `config.store`.
    pub fn from_config(config: &LicenseGateConfig) -> Result<Self, LicenseError> {
        match config.database_path()? {
            Some(path) => Self::open(&path),
            None => Self::open_in_memory(),
        }
    }

    fn init(conn: Connection) -> Result<Self, LicenseError> {
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(|e| storage_err("Failed to enable foreign keys", e))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| storage_err("Failed to init schema", e))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // A panicking holder's open transaction rolled back as it unwound
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against the connection in autocommit mode.
    pub fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, LicenseError>,
    ) -> Result<T, LicenseError> {
        let conn = self.lock();
        f(&conn)
    }

    /// Run `f` inside an immediate (write-locking) transaction.
    ///
    /// Commits when `f` returns `Ok`; any `Err` rolls back every write `f`
    /// made.
    pub fn transaction<T>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> Result<T, LicenseError>,
    ) -> Result<T, LicenseError> {
        let mut conn = self.lock();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| storage_err("Failed to begin transaction", e))?;
        let value = f(&tx)?;
        tx.commit()
            .map_err(|e| storage_err("Failed to commit transaction", e))?;
        Ok(value)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}
