//! Process entry point owning the admin secret lifecycle.
//!
//! Generates the admin secret once at start-up, shows it to the operator,
//! then walks one license through generate, verify, reset and key-info via
//! the service facade.
//!
//! # Running
//!
//! ```bash
//! cargo run --example admin_console
//! ```
//!
//! Set `LICENSEGATE_GEO=1` to resolve client countries through ip-api.com.

use licensegate::geo::{FixedCountry, GeoLookup, IpApiLookup};
use licensegate::protocol::requests::{ClientInfo, GenerateRequest, KeyRequest, VerifyRequest};
use licensegate::{KeyGenerator, LicenseEngine, LicenseGateConfig, LicenseService, StoreLocation};
use std::sync::Arc;

fn main() {
    let config = LicenseGateConfig {
        store: StoreLocation::InMemory,
        ..LicenseGateConfig::default()
    };

    // Entropy failure here is fatal: no secret, no admin surface
    let secret = match KeyGenerator::new(&config).new_admin_secret() {
        Ok(secret) => secret,
        Err(e) => {
            eprintln!("Startup failed: {}", e);
            std::process::exit(1);
        }
    };
    let bearer = format!("Bearer {}", secret.expose());

    println!("Admin Key: {}", secret.expose());
    println!("Keep this key secure! Use it in Authorization: Bearer <key>");

    let engine = match LicenseEngine::from_config(&config, secret) {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let geo: Arc<dyn GeoLookup> = if std::env::var("LICENSEGATE_GEO").as_deref() == Ok("1") {
        match IpApiLookup::new(config.geo_timeout) {
            Ok(lookup) => Arc::new(lookup),
            Err(e) => {
                eprintln!("Geo lookup disabled: {}", e);
                Arc::new(FixedCountry::default())
            }
        }
    } else {
        Arc::new(FixedCountry::default())
    };

    let service = LicenseService::new(engine, &config, geo);
    let client = ClientInfo {
        remote_addr: "127.0.0.1".to_string(),
        forwarded_for: None,
        user_agent: Some("admin-console/0.1".to_string()),
    };

    let generated = service.generate(
        Some(bearer.as_str()),
        &GenerateRequest {
            hwid: None,
            expires_at: "2099-01-01".to_string(),
            plan: Some("premium".to_string()),
        },
    );
    println!("generate -> {} {}", generated.status, generated.body);

    let key = generated.body["key"].as_str().unwrap_or_default().to_string();
    let verify = |hwid: &str| {
        service.verify(
            &VerifyRequest {
                key: key.clone(),
                hwid: hwid.to_string(),
            },
            &client,
        )
    };

    let first = verify("hw-1");
    println!("verify hw-1 -> {} {}", first.status, first.body);
    let mismatch = verify("hw-2");
    println!("verify hw-2 -> {} {}", mismatch.status, mismatch.body);

    let key_req = KeyRequest { key: key.clone() };
    let reset = service.reset_hwid(Some(bearer.as_str()), &key_req);
    println!("reset -> {} {}", reset.status, reset.body);
    let rebound = verify("hw-2");
    println!("verify hw-2 -> {} {}", rebound.status, rebound.body);

    let info = service.key_info(Some(bearer.as_str()), &key_req);
    println!("keyinfo -> {} {}", info.status, info.body);

    let stats = service.stats();
    println!(
        "requests: {} (verify {}, admin {}, errors {}), success rate {:.1}%",
        stats.total_requests,
        stats.verify_requests,
        stats.admin_requests,
        stats.error_count,
        stats.success_rate
    );
}
