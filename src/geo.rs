//! IP geolocation for usage records.
//!
//! Lookups are best-effort: any failure resolves to [`UNKNOWN_COUNTRY`].

use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Country value used when a lookup fails.
pub const UNKNOWN_COUNTRY: &str = "Unknown";

/// Default ip-api.com endpoint (free tier, plain HTTP).
pub const IP_API_BASE_URL: &str = "http://ip-api.com/json";

/// Resolves an IP address to a country code.
pub trait GeoLookup: Send + Sync {
    /// Country code for `ip`, or [`UNKNOWN_COUNTRY`].
    fn country(&self, ip: &str) -> String;
}

/// Always answers with the same country. Useful offline and in tests.
#[derive(Debug, Clone)]
pub struct FixedCountry(pub String);

impl Default for FixedCountry {
    fn default() -> Self {
        Self(UNKNOWN_COUNTRY.to_string())
    }
}

impl GeoLookup for FixedCountry {
    fn country(&self, _ip: &str) -> String {
        self.0.clone()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IpApiResponse {
    #[serde(default)]
    country_code: Option<String>,
}

/// Extract `countryCode` from an ip-api.com JSON body.
pub fn parse_country(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<IpApiResponse>(body)
        .ok()
        .and_then(|r| r.country_code)
        .filter(|c| !c.is_empty())
}

/// ip-api.com lookup over blocking HTTP.
pub struct IpApiLookup {
    client: Client,
    base_url: String,
}

impl IpApiLookup {
    /// Create a lookup with the given request timeout.
    pub fn new(timeout: Duration) -> Result<Self, crate::LicenseError> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            crate::LicenseError::ConfigError(format!("Failed to create geo client: {}", e))
        })?;
        Ok(Self {
            client,
            base_url: IP_API_BASE_URL.to_string(),
        })
    }

    /// Point the lookup at a different endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Full request URL for `ip`.
    pub fn url_for(&self, ip: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), ip)
    }

    fn fetch(&self, ip: &str) -> Option<String> {
        let response = match self.client.get(self.url_for(ip)).send() {
            Ok(response) => response,
            Err(e) => {
                debug!(error = %e, "geo lookup transport failure");
                return None;
            }
        };
        if !response.status().is_success() {
            debug!(status = %response.status(), "geo lookup rejected");
            return None;
        }
        let body = response.bytes().ok()?;
        parse_country(&body)
    }
}

impl GeoLookup for IpApiLookup {
    fn country(&self, ip: &str) -> String {
        if ip.is_empty() {
            return UNKNOWN_COUNTRY.to_string();
        }
        self.fetch(ip)
            .unwrap_or_else(|| UNKNOWN_COUNTRY.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_country_success() {
        let body = br#"{"status":"success","country":"Germany","countryCode":"DE","query":"1.2.3.4"}"#;
        assert_eq!(parse_country(body), Some("DE".to_string()));
    }

    #[test]
    fn test_parse_country_failure_body() {
        let body = br#"{"status":"fail","message":"private range","query":"10.0.0.1"}"#;
        assert_eq!(parse_country(body), None);
        assert_eq!(parse_country(b"not json"), None);
        assert_eq!(parse_country(br#"{"countryCode":""}"#), None);
    }

    #[test]
    fn test_url_for() {
        let lookup = IpApiLookup::new(Duration::from_secs(2))
            .unwrap()
            .with_base_url("http://localhost:9/json/");
        assert_eq!(lookup.url_for("1.2.3.4"), "http://localhost:9/json/1.2.3.4");
    }

    #[test]
    fn test_unreachable_endpoint_is_unknown() {
        // Port 9 (discard) is closed on test hosts; the request fails fast.
        let lookup = IpApiLookup::new(Duration::from_millis(200))
            .unwrap()
            .with_base_url("http://127.0.0.1:9/json");
        assert_eq!(lookup.country("1.2.3.4"), UNKNOWN_COUNTRY);
        assert_eq!(lookup.country(""), UNKNOWN_COUNTRY);
    }

    #[test]
    fn test_fixed_country() {
        assert_eq!(FixedCountry("SE".to_string()).country("1.2.3.4"), "SE");
        assert_eq!(FixedCountry::default().country("1.2.3.4"), UNKNOWN_COUNTRY);
    }
}
