//! # Licensegate
//!
//! **Hardware-bound license key issuance and validation.**
//!
//! Licensegate issues opaque license keys, binds each key to the first
//! hardware id (HWID) that verifies it, enforces expiration, and keeps a
//! per-license usage record (first/last login, login count, last client).
//!
//! ## Features
//!
//! - **First-use HWID binding**: an atomic compare-and-set, so racing
//!   clients can never bind two machines
//! - **Expiry before binding**: an expired license never rebinds
//! - **Idempotent usage ledger**: one upserted row per license
//! - **Admin gate**: constant-time bearer check before any lookup
//! - **Durable SQLite store**: every write committed before return
//!
//! ## Quickstart
//!
//! ```no_run
//! use licensegate::{ClientAttributes, KeyGenerator, LicenseEngine, LicenseGateConfig};
//! use chrono::{NaiveDate, Utc};
//!
//! fn main() -> Result<(), licensegate::LicenseError> {
//!     let config = LicenseGateConfig::default();
//!     let secret = KeyGenerator::new(&config).new_admin_secret()?;
//!     let credential = secret.expose().to_string();
//!
//!     let engine = LicenseEngine::from_config(&config, secret)?;
//!     let expires = NaiveDate::from_ymd_opt(2099, 1, 1).unwrap();
//!     let issued =
//!         engine.generate(None, expires, "premium", Some(credential.as_str()), Utc::now())?;
//!
//!     let attrs = ClientAttributes {
//!         ip: "203.0.113.7".into(),
//!         user_agent: "myapp/1.0".into(),
//!         geo_country: "US".into(),
//!     };
//!     let verified = engine.verify(&issued.key, "machine-1", &attrs, Utc::now())?;
//!     println!("valid until {} on plan {}", verified.expires_at, verified.plan);
//!     Ok(())
//! }
//! ```
//!
//! ## Layers
//!
//! - [`LicenseEngine`]: the core; never logs, never does network I/O
//! - [`LicenseService`]: caller-side facade: typed requests, bearer parsing,
//!   status mapping, geolocation, stats and logging
//!
//! See [`LicenseGateConfig`] for configuration.

#![warn(missing_docs)]

// Core modules
pub mod clock;
pub mod config;
pub mod errors;
pub mod model;

// Crypto layer
pub mod crypto;

// Key generation and admin gate
pub mod admin;
pub mod keygen;

// Storage layer
pub mod store;

// Engine (core public API)
pub mod engine;

// Caller-side facade
pub mod geo;
pub mod protocol;
pub mod service;
pub mod stats;

// Re-exports for public API
pub use admin::{AdminGate, AdminSecret};
pub use clock::{Clock, SystemClock};
pub use config::{LicenseGateConfig, StoreLocation};
pub use engine::LicenseEngine;
pub use errors::LicenseError;
pub use keygen::KeyGenerator;
pub use model::{
    ClientAttributes, DeleteResult, GenerateResult, License, LicenseStatus, ResetResult,
    UsageRecord, VerifyResult,
};
pub use service::{ApiResponse, LicenseService};
pub use store::{Database, LicenseStore, UsageLedger};

#[cfg(any(test, feature = "test-seams"))]
pub use clock::MockClock;
