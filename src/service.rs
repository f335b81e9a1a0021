//! Transport-agnostic service facade.
//!
//! Sits where an HTTP layer would: takes typed requests and client
//! metadata, fills in time and geolocation, calls the [`LicenseEngine`],
//! maps the outcome to a status code and JSON body, counts it and logs it.

use crate::clock::{Clock, SystemClock};
use crate::config::LicenseGateConfig;
use crate::crypto::digest::key_fingerprint;
use crate::engine::LicenseEngine;
use crate::geo::{GeoLookup, UNKNOWN_COUNTRY};
use crate::model::{parse_date, ClientAttributes, LicenseStatus};
use crate::protocol::requests::{
    parse_bearer, ClientInfo, GenerateRequest, KeyRequest, VerifyRequest,
};
use crate::stats::{ApiStats, RequestKind, StatsSnapshot};
use crate::LicenseError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Status code and JSON body for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// HTTP-equivalent status code.
    pub status: u16,
    /// JSON body.
    pub body: Value,
}

impl ApiResponse {
    fn ok<T: Serialize>(payload: &T) -> Self {
        match serde_json::to_value(payload) {
            Ok(body) => Self { status: 200, body },
            Err(e) => Self::from_error(&LicenseError::Storage(format!(
                "Failed to serialize response: {}",
                e
            ))),
        }
    }

    fn from_error(err: &LicenseError) -> Self {
        Self {
            status: status_for(err),
            body: json!({ "error": err.to_string() }),
        }
    }

    /// True for 2xx responses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP-equivalent status for an error kind.
pub fn status_for(err: &LicenseError) -> u16 {
    match err {
        LicenseError::MissingField { .. } | LicenseError::InvalidDate(_) => 400,
        LicenseError::InvalidKey | LicenseError::Unauthorized => 401,
        LicenseError::HwidMismatch => 403,
        LicenseError::NotFound => 404,
        LicenseError::Expired => 410,
        LicenseError::DuplicateKey
        | LicenseError::Entropy(_)
        | LicenseError::Storage(_)
        | LicenseError::ConfigError(_) => 500,
    }
}

/// License service facade.
pub struct LicenseService {
    engine: Arc<LicenseEngine>,
    clock: Arc<dyn Clock>,
    geo: Arc<dyn GeoLookup>,
    stats: ApiStats,
    default_plan: &'static str,
}

impl LicenseService {
    /// Create a service using the system clock.
    pub fn new(
        engine: Arc<LicenseEngine>,
        config: &LicenseGateConfig,
        geo: Arc<dyn GeoLookup>,
    ) -> Self {
        Self::with_clock(engine, config, geo, Arc::new(SystemClock))
    }

    /// Create a service with a custom clock (for testing).
    #[cfg(any(test, feature = "test-seams"))]
    pub fn new_with_clock(
        engine: Arc<LicenseEngine>,
        config: &LicenseGateConfig,
        geo: Arc<dyn GeoLookup>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::with_clock(engine, config, geo, clock)
    }

    fn with_clock(
        engine: Arc<LicenseEngine>,
        config: &LicenseGateConfig,
        geo: Arc<dyn GeoLookup>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let stats = ApiStats::new(clock.now_utc());
        Self {
            engine,
            clock,
            geo,
            stats,
            default_plan: config.default_plan,
        }
    }

    /// Handle a verify request.
    ///
    /// The country is looked up only when a plain read says the engine will
    /// accept the request; everything else records [`UNKNOWN_COUNTRY`]
    /// without touching the network.
    pub fn verify(&self, req: &VerifyRequest, client: &ClientInfo) -> ApiResponse {
        let now = self.clock.now_utc();
        let geo_country = if self.expects_success(req, now) {
            self.geo.country(client.effective_ip())
        } else {
            UNKNOWN_COUNTRY.to_string()
        };
        let attrs = ClientAttributes {
            ip: client.effective_ip().to_string(),
            user_agent: client.user_agent().to_string(),
            geo_country,
        };

        let result = self.engine.verify(&req.key, &req.hwid, &attrs, now);

        match result {
            Ok(verified) => {
                info!(
                    key = %key_fingerprint(&req.key),
                    ip = %attrs.ip,
                    country = %attrs.geo_country,
                    "license verified"
                );
                self.stats.record_success(RequestKind::Verify);
                ApiResponse::ok(&verified)
            }
            Err(e) => self.reject("verify", RequestKind::Verify, &req.key, e),
        }
    }

    /// Handle a generate request.
    pub fn generate(&self, authorization: Option<&str>, req: &GenerateRequest) -> ApiResponse {
        let credential = parse_bearer(authorization);

        let result = self.engine.require_admin(credential).and_then(|()| {
            if req.expires_at.trim().is_empty() {
                return Err(LicenseError::MissingField { field: "expires_at" });
            }
            let expires_at = parse_date(&req.expires_at)?;
            let plan = req
                .plan
                .as_deref()
                .filter(|p| !p.is_empty())
                .unwrap_or(self.default_plan);
            self.engine.generate(
                req.hwid.as_deref(),
                expires_at,
                plan,
                credential,
                self.clock.now_utc(),
            )
        });

        match result {
            Ok(generated) => {
                info!(
                    key = %key_fingerprint(&generated.key),
                    expires_at = %generated.expires_at,
                    prebound = req.hwid.as_deref().is_some_and(|h| !h.is_empty()),
                    "license generated"
                );
                self.stats.record_success(RequestKind::Admin);
                ApiResponse::ok(&generated)
            }
            Err(e) => self.reject("generate", RequestKind::Admin, "", e),
        }
    }

    /// Handle a delete request.
    pub fn delete(&self, authorization: Option<&str>, req: &KeyRequest) -> ApiResponse {
        match self.engine.delete(&req.key, parse_bearer(authorization)) {
            Ok(_) => {
                info!(key = %key_fingerprint(&req.key), "license deleted");
                self.stats.record_success(RequestKind::Admin);
                ApiResponse::ok(&json!({ "message": "successfully deleted" }))
            }
            Err(e) => self.reject("delete", RequestKind::Admin, &req.key, e),
        }
    }

    /// Handle an HWID reset request.
    pub fn reset_hwid(&self, authorization: Option<&str>, req: &KeyRequest) -> ApiResponse {
        match self.engine.reset_hwid(&req.key, parse_bearer(authorization)) {
            Ok(reset) => {
                info!(key = %key_fingerprint(&req.key), "hwid reset");
                self.stats.record_success(RequestKind::Admin);
                ApiResponse::ok(&json!({ "hwid": reset.hwid }))
            }
            Err(e) => self.reject("reset_hwid", RequestKind::Admin, &req.key, e),
        }
    }

    /// Handle a key-info request.
    pub fn key_info(&self, authorization: Option<&str>, req: &KeyRequest) -> ApiResponse {
        match self.engine.key_info(&req.key, parse_bearer(authorization)) {
            Ok(record) => {
                self.stats.record_success(RequestKind::Admin);
                ApiResponse::ok(&record)
            }
            Err(e) => self.reject("key_info", RequestKind::Admin, &req.key, e),
        }
    }

    /// Current request statistics.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot(self.clock.now_utc())
    }

    /// The underlying engine.
    pub fn engine(&self) -> &LicenseEngine {
        &self.engine
    }

    /// Read-only guess at whether the engine will accept `req`.
    ///
    /// Runs outside the transaction, so a concurrent bind or reset can still
    /// change the engine's answer.
    fn expects_success(&self, req: &VerifyRequest, now: DateTime<Utc>) -> bool {
        if req.key.is_empty() || req.hwid.is_empty() {
            return false;
        }
        match self.engine.licenses().get(&req.key) {
            Ok(Some(license)) => match license.status_at(now) {
                LicenseStatus::New => true,
                LicenseStatus::Bound => license.hwid.as_deref() == Some(req.hwid.as_str()),
                LicenseStatus::Expired => false,
            },
            _ => false,
        }
    }

    fn reject(
        &self,
        operation: &'static str,
        kind: RequestKind,
        key: &str,
        err: LicenseError,
    ) -> ApiResponse {
        // Admin requests count once they get past the gate
        let counted = match (kind, &err) {
            (RequestKind::Admin, LicenseError::Unauthorized) | (RequestKind::Verify, _) => None,
            (RequestKind::Admin, _) => Some(RequestKind::Admin),
        };
        self.stats.record_error(counted);
        let response = ApiResponse::from_error(&err);
        let key = if key.is_empty() {
            String::new()
        } else {
            key_fingerprint(key)
        };
        if response.status >= 500 {
            error!(operation, key = %key, error = %err, "request failed");
        } else {
            warn!(operation, key = %key, status = response.status, error = %err, "request rejected");
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::{AdminGate, AdminSecret};
    use crate::clock::MockClock;
    use crate::geo::FixedCountry;
    use crate::keygen::KeyGenerator;
    use crate::store::Database;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const ADMIN: &str = "service-admin-secret";
    const BEARER: &str = "Bearer service-admin-secret";

    /// Answers "DE" and counts how often it was asked.
    #[derive(Default)]
    struct CountingGeo {
        lookups: AtomicUsize,
    }

    impl GeoLookup for CountingGeo {
        fn country(&self, ip: &str) -> String {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            FixedCountry("DE".to_string()).country(ip)
        }
    }

    fn service() -> (LicenseService, Arc<MockClock>) {
        let (service, clock, _) = service_with_geo();
        (service, clock)
    }

    fn service_with_geo() -> (LicenseService, Arc<MockClock>, Arc<CountingGeo>) {
        let engine = LicenseEngine::new(
            Database::open_in_memory().unwrap(),
            KeyGenerator::default(),
            AdminGate::new(AdminSecret::new(ADMIN)),
        );
        let clock = Arc::new(MockClock::at_date(2025, 1, 15));
        let geo = Arc::new(CountingGeo::default());
        let service = LicenseService::new_with_clock(
            Arc::new(engine),
            &LicenseGateConfig::default(),
            geo.clone(),
            clock.clone(),
        );
        (service, clock, geo)
    }

    fn client() -> ClientInfo {
        ClientInfo {
            remote_addr: "10.0.0.1".to_string(),
            forwarded_for: Some("203.0.113.7".to_string()),
            user_agent: Some("client/1.0".to_string()),
        }
    }

    fn generate(service: &LicenseService, hwid: Option<&str>, expires_at: &str) -> String {
        let response = service.generate(
            Some(BEARER),
            &GenerateRequest {
                hwid: hwid.map(String::from),
                expires_at: expires_at.to_string(),
                plan: None,
            },
        );
        assert_eq!(response.status, 200, "{}", response.body);
        response.body["key"].as_str().unwrap().to_string()
    }

    fn verify(service: &LicenseService, key: &str, hwid: &str) -> ApiResponse {
        service.verify(
            &VerifyRequest {
                key: key.to_string(),
                hwid: hwid.to_string(),
            },
            &client(),
        )
    }

    fn key_req(key: &str) -> KeyRequest {
        KeyRequest {
            key: key.to_string(),
        }
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&LicenseError::MissingField { field: "key" }), 400);
        assert_eq!(status_for(&LicenseError::InvalidDate("x".into())), 400);
        assert_eq!(status_for(&LicenseError::InvalidKey), 401);
        assert_eq!(status_for(&LicenseError::Unauthorized), 401);
        assert_eq!(status_for(&LicenseError::HwidMismatch), 403);
        assert_eq!(status_for(&LicenseError::NotFound), 404);
        assert_eq!(status_for(&LicenseError::Expired), 410);
        assert_eq!(status_for(&LicenseError::DuplicateKey), 500);
    }

    #[test]
    fn test_generate_defaults_plan_and_verify_echoes_it() {
        let (service, _) = service();
        let key = generate(&service, None, "2099-01-01");
        assert!(key.starts_with("LIC-"));

        let response = verify(&service, &key, "hw-1");
        assert_eq!(response.status, 200);
        assert_eq!(
            response.body,
            json!({ "valid": true, "expires_at": "2099-01-01", "plan": "basic" })
        );
    }

    #[test]
    fn test_generate_rejects_bad_date() {
        let (service, _) = service();
        let response = service.generate(
            Some(BEARER),
            &GenerateRequest {
                hwid: None,
                expires_at: "01/01/2099".to_string(),
                plan: Some("premium".to_string()),
            },
        );
        assert_eq!(response.status, 400);
        assert!(response.body["error"]
            .as_str()
            .unwrap()
            .starts_with("Invalid date format"));
    }

    #[test]
    fn test_generate_unauthorized_before_validation() {
        let (service, _) = service();
        let response = service.generate(Some("Bearer wrong"), &GenerateRequest::default());
        assert_eq!(response.status, 401);

        let response = service.generate(Some(ADMIN), &GenerateRequest::default());
        assert_eq!(response.status, 401, "credential without Bearer scheme is absent");

        let response = service.generate(Some(BEARER), &GenerateRequest::default());
        assert_eq!(response.status, 400);
        assert_eq!(service.engine().licenses().count().unwrap(), 0);
    }

    #[test]
    fn test_verify_error_statuses() {
        let (service, clock) = service();
        let key = generate(&service, None, "2025-02-01");

        assert_eq!(verify(&service, "", "hw-1").status, 400);
        assert_eq!(verify(&service, "LIC-NOPE", "hw-1").status, 401);
        assert_eq!(verify(&service, &key, "hw-1").status, 200);
        assert_eq!(verify(&service, &key, "hw-2").status, 403);

        clock.advance(chrono::Duration::days(30));
        let response = verify(&service, &key, "hw-1");
        assert_eq!(response.status, 410);
        assert_eq!(response.body, json!({ "error": "License expired" }));
    }

    #[test]
    fn test_key_info_records_client_attributes() {
        let (service, clock) = service();
        let key = generate(&service, None, "2099-01-01");

        verify(&service, &key, "hw-1");
        clock.advance(chrono::Duration::hours(2));
        verify(&service, &key, "hw-1");

        let response = service.key_info(Some(BEARER), &key_req(&key));
        assert_eq!(response.status, 200);
        assert_eq!(response.body["login_count"], 2);
        assert_eq!(response.body["ip"], "203.0.113.7");
        assert_eq!(response.body["user_agent"], "client/1.0");
        assert_eq!(response.body["geo_country"], "DE");
        assert_eq!(response.body["first_login"], "2025-01-15T00:00:00Z");
        assert_eq!(response.body["last_login"], "2025-01-15T02:00:00Z");
    }

    #[test]
    fn test_reset_and_delete_bodies() {
        let (service, _) = service();
        let key = generate(&service, None, "2099-01-01");
        verify(&service, &key, "hw-1");

        let response = service.reset_hwid(Some(BEARER), &key_req(&key));
        assert_eq!(response.status, 200);
        assert_eq!(response.body, json!({ "hwid": null }));
        assert_eq!(verify(&service, &key, "hw-2").status, 200);

        let response = service.delete(Some(BEARER), &key_req(&key));
        assert_eq!(response.body, json!({ "message": "successfully deleted" }));

        assert_eq!(service.delete(Some(BEARER), &key_req(&key)).status, 404);
        assert_eq!(service.reset_hwid(Some(BEARER), &key_req(&key)).status, 404);
        assert_eq!(service.key_info(Some(BEARER), &key_req(&key)).status, 404);
        assert_eq!(service.key_info(Some(BEARER), &key_req("")).status, 400);
    }

    #[test]
    fn test_stats_counting() {
        let (service, clock) = service();
        let key = generate(&service, None, "2099-01-01");
        verify(&service, &key, "hw-1");
        verify(&service, &key, "hw-2");
        service.delete(None, &key_req(&key));

        clock.advance(chrono::Duration::minutes(10));
        let snap = service.stats();
        assert_eq!(snap.total_requests, 4);
        assert_eq!(snap.verify_requests, 1);
        assert_eq!(snap.admin_requests, 1);
        assert_eq!(snap.error_count, 2);
        assert_eq!(snap.success_rate, 50.0);
        assert_eq!(snap.uptime_secs, 600);
    }

    #[test]
    fn test_stats_count_authorized_admin_failures() {
        let (service, _) = service();
        service.delete(Some(BEARER), &key_req("LIC-GONE"));
        service.key_info(Some(BEARER), &key_req(""));
        service.reset_hwid(Some("Bearer wrong"), &key_req("LIC-GONE"));

        let snap = service.stats();
        assert_eq!(snap.total_requests, 3);
        assert_eq!(snap.admin_requests, 2);
        assert_eq!(snap.error_count, 3);
    }

    #[test]
    fn test_rejected_verifies_skip_geo_lookup() {
        let (service, clock, geo) = service_with_geo();
        let bound = generate(&service, Some("hw-1"), "2025-02-01");
        let unbound = generate(&service, None, "2025-02-01");

        for i in 0..50 {
            assert_eq!(verify(&service, &format!("LIC-BOGUS{}", i), "hw-1").status, 401);
        }
        assert_eq!(verify(&service, &bound, "hw-2").status, 403);
        assert_eq!(verify(&service, "", "hw-1").status, 400);
        assert_eq!(geo.lookups.load(Ordering::SeqCst), 0);

        assert_eq!(verify(&service, &bound, "hw-1").status, 200);
        assert_eq!(verify(&service, &unbound, "hw-9").status, 200);
        assert_eq!(geo.lookups.load(Ordering::SeqCst), 2);

        clock.advance(chrono::Duration::days(30));
        assert_eq!(verify(&service, &bound, "hw-1").status, 410);
        assert_eq!(verify(&service, &unbound, "hw-9").status, 410);
        assert_eq!(geo.lookups.load(Ordering::SeqCst), 2);
    }
}
