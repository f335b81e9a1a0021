//! License engine - the core lifecycle and validation API.
//!
//! The `LicenseEngine` owns every invariant of a license:
//! - HWID binding on first verify (compare-and-set)
//! - Expiration checked before any binding logic
//! - Usage recorded only on success, in the same transaction
//! - Admin operations gated before any lookup
//!
//! It never logs and never touches the network; callers pass in `now` and
//! the client attributes they extracted.

use crate::admin::{AdminGate, AdminSecret};
use crate::config::LicenseGateConfig;
use crate::keygen::KeyGenerator;
use crate::model::{
    ClientAttributes, DeleteResult, GenerateResult, License, LicenseStatus, ResetResult,
    UsageRecord, VerifyResult,
};
use crate::store::{licenses, usage, Database, LicenseStore, UsageLedger};
use crate::LicenseError;
use chrono::{DateTime, NaiveDate, Utc};

/// Attempts at drawing a non-colliding key before giving up.
pub const MAX_KEY_ATTEMPTS: usize = 3;

/// Core license engine.
///
/// Cheap to share behind an `Arc`; all methods take `&self` and are safe to
/// call from many threads at once.
#[derive(Debug)]
pub struct LicenseEngine {
    db: Database,
    generator: KeyGenerator,
    gate: AdminGate,
}

impl LicenseEngine {
    /// Assemble an engine from its collaborators.
    pub fn new(db: Database, generator: KeyGenerator, gate: AdminGate) -> Self {
        Self { db, generator, gate }
    }

    /// Open the configured database and build an engine around `secret`.
    ///
    /// # Errors
    /// Returns an error if:
    /// - Configuration validation fails
    /// - The database cannot be opened or initialized
    pub fn from_config(
        config: &LicenseGateConfig,
        secret: AdminSecret,
    ) -> Result<Self, LicenseError> {
        config.validate()?;
        let db = Database::from_config(config)?;
        Ok(Self::new(
            db,
            KeyGenerator::new(config),
            AdminGate::new(secret),
        ))
    }

    /// Verify a license for a hardware id.
    ///
    /// 1. Reject empty `key` / `hwid`
    /// 2. Look up the key
    /// 3. Reject if expired (never rebinds an expired license)
    /// 4. Bind if unbound, otherwise compare
    /// 5. Record usage on success
    ///
    /// Steps 2-5 run in one transaction.
    ///
    /// # Errors
    /// - `MissingField` - empty key or hwid
    /// - `InvalidKey` - unknown key
    /// - `Expired` - `now` is past the expiry date
    /// - `HwidMismatch` - bound to a different hwid (usage untouched)
    pub fn verify(
        &self,
        key: &str,
        hwid: &str,
        attrs: &ClientAttributes,
        now: DateTime<Utc>,
    ) -> Result<VerifyResult, LicenseError> {
        if key.is_empty() {
            return Err(LicenseError::MissingField { field: "key" });
        }
        if hwid.is_empty() {
            return Err(LicenseError::MissingField { field: "hwid" });
        }

        self.db.transaction(|tx| {
            let license = licenses::find(tx, key)?.ok_or(LicenseError::InvalidKey)?;

            let bound = match (license.status_at(now), license.hwid.as_deref()) {
                (LicenseStatus::Expired, _) => return Err(LicenseError::Expired),
                (LicenseStatus::Bound, Some(bound)) => bound.to_string(),
                _ if licenses::bind_if_unbound(tx, key, hwid)? => hwid.to_string(),
                // Lost the bind; judge against whoever won
                _ => licenses::find(tx, key)?
                    .and_then(|l| l.hwid)
                    .ok_or(LicenseError::HwidMismatch)?,
            };

            if bound != hwid {
                return Err(LicenseError::HwidMismatch);
            }

            usage::record(tx, key, hwid, attrs, now)?;

            Ok(VerifyResult {
                valid: true,
                expires_at: license.expires_at,
                plan: license.plan,
            })
        })
    }

    /// Issue a new license.
    ///
    /// `hwid` pre-binds the license; `None` (or empty) leaves it for the
    /// first verify to bind.
    ///
    /// # Errors
    /// - `Unauthorized` - bad credential, nothing written
    /// - `DuplicateKey` - every generated key collided
    /// - `Entropy` - randomness unavailable
    pub fn generate(
        &self,
        hwid: Option<&str>,
        expires_at: NaiveDate,
        plan: &str,
        credential: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<GenerateResult, LicenseError> {
        self.require_admin(credential)?;
        self.create_with_keys(|| self.generator.new_license_key(), hwid, expires_at, plan, now)
    }

    fn create_with_keys(
        &self,
        mut next_key: impl FnMut() -> Result<String, LicenseError>,
        hwid: Option<&str>,
        expires_at: NaiveDate,
        plan: &str,
        now: DateTime<Utc>,
    ) -> Result<GenerateResult, LicenseError> {
        let hwid = hwid.filter(|h| !h.is_empty());

        for _ in 0..MAX_KEY_ATTEMPTS {
            let license = License {
                key: next_key()?,
                hwid: hwid.map(String::from),
                expires_at,
                plan: plan.to_string(),
                created_at: now,
            };

            match self.db.with_connection(|conn| licenses::insert(conn, &license)) {
                Ok(()) => {
                    return Ok(GenerateResult {
                        key: license.key,
                        expires_at,
                    })
                }
                Err(LicenseError::DuplicateKey) => continue,
                Err(e) => return Err(e),
            }
        }

        Err(LicenseError::DuplicateKey)
    }

    /// Delete a license and its usage record.
    ///
    /// # Errors
    /// - `Unauthorized` - bad credential
    /// - `MissingField` - empty key
    /// - `NotFound` - no such key
    pub fn delete(&self, key: &str, credential: Option<&str>) -> Result<DeleteResult, LicenseError> {
        self.require_admin(credential)?;
        require_key(key)?;

        if !self.db.transaction(|tx| licenses::remove(tx, key))? {
            return Err(LicenseError::NotFound);
        }

        Ok(DeleteResult {
            key: key.to_string(),
        })
    }

    /// Unbind a license so the next verify binds again.
    ///
    /// # Errors
    /// - `Unauthorized` - bad credential
    /// - `NotFound` - no such key
    pub fn reset_hwid(
        &self,
        key: &str,
        credential: Option<&str>,
    ) -> Result<ResetResult, LicenseError> {
        self.require_admin(credential)?;
        require_key(key)?;

        if !self
            .db
            .with_connection(|conn| licenses::update_hwid(conn, key, None))?
        {
            return Err(LicenseError::NotFound);
        }

        Ok(ResetResult {
            key: key.to_string(),
            hwid: None,
        })
    }

    /// Usage snapshot for a license.
    ///
    /// # Errors
    /// - `Unauthorized` - bad credential
    /// - `NotFound` - no usage recorded for `key`
    pub fn key_info(
        &self,
        key: &str,
        credential: Option<&str>,
    ) -> Result<UsageRecord, LicenseError> {
        self.require_admin(credential)?;
        require_key(key)?;

        self.db
            .with_connection(|conn| usage::find(conn, key))?
            .ok_or(LicenseError::NotFound)
    }

    /// Direct access to license rows.
    pub fn licenses(&self) -> LicenseStore {
        LicenseStore::new(self.db.clone())
    }

    /// Direct access to usage records.
    pub fn usage(&self) -> UsageLedger {
        UsageLedger::new(self.db.clone())
    }

    /// Check an admin credential.
    ///
    /// Every admin operation calls this before any lookup, so unauthorized
    /// callers learn nothing about which keys exist.
    pub fn require_admin(&self, credential: Option<&str>) -> Result<(), LicenseError> {
        if self.gate.authorize(credential) {
            Ok(())
        } else {
            Err(LicenseError::Unauthorized)
        }
    }
}

fn require_key(key: &str) -> Result<(), LicenseError> {
    if key.is_empty() {
        return Err(LicenseError::MissingField { field: "key" });
    }
    Ok(())
}
