//! Request counters for the service facade.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Which counter a request lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// `/verify`
    Verify,
    /// Any admin route.
    Admin,
}

/// Live counters, safe to bump from many threads.
#[derive(Debug)]
pub struct ApiStats {
    started_at: DateTime<Utc>,
    requests: AtomicU64,
    verify_requests: AtomicU64,
    admin_requests: AtomicU64,
    errors: AtomicU64,
}

/// Point-in-time copy of [`ApiStats`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    /// Process start.
    pub started_at: DateTime<Utc>,
    /// Seconds since start.
    pub uptime_secs: i64,
    /// Every handled request.
    pub total_requests: u64,
    /// Successful verifies.
    pub verify_requests: u64,
    /// Admin requests that passed authorization, successful or not.
    pub admin_requests: u64,
    /// Rejected or failed requests.
    pub error_count: u64,
    /// Percentage of requests that did not error.
    pub success_rate: f64,
}

impl ApiStats {
    /// Start counting from `started_at`.
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            requests: AtomicU64::new(0),
            verify_requests: AtomicU64::new(0),
            admin_requests: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    /// Count a successful request.
    pub fn record_success(&self, kind: RequestKind) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.bump(kind);
    }

    /// Count a failed request.
    ///
    /// `kind` is `Some` when the request still counts toward its kind, as an
    /// authorized admin request that later failed does.
    pub fn record_error(&self, kind: Option<RequestKind>) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.errors.fetch_add(1, Ordering::Relaxed);
        if let Some(kind) = kind {
            self.bump(kind);
        }
    }

    fn bump(&self, kind: RequestKind) {
        match kind {
            RequestKind::Verify => self.verify_requests.fetch_add(1, Ordering::Relaxed),
            RequestKind::Admin => self.admin_requests.fetch_add(1, Ordering::Relaxed),
        };
    }

    /// Snapshot the counters at `now`.
    pub fn snapshot(&self, now: DateTime<Utc>) -> StatsSnapshot {
        let total = self.requests.load(Ordering::Relaxed);
        let errors = self.errors.load(Ordering::Relaxed);
        let success_rate = (total.saturating_sub(errors)) as f64 / total.max(1) as f64 * 100.0;

        StatsSnapshot {
            started_at: self.started_at,
            uptime_secs: (now - self.started_at).num_seconds().max(0),
            total_requests: total,
            verify_requests: self.verify_requests.load(Ordering::Relaxed),
            admin_requests: self.admin_requests.load(Ordering::Relaxed),
            error_count: errors,
            success_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_snapshot() {
        let stats = ApiStats::new(start());
        let snap = stats.snapshot(start());
        assert_eq!(snap.total_requests, 0);
        assert_eq!(snap.uptime_secs, 0);
        // Divisor clamps to 1, so an idle server reports 0%
        assert_eq!(snap.success_rate, 0.0);
    }

    #[test]
    fn test_counts_and_rate() {
        let stats = ApiStats::new(start());
        stats.record_success(RequestKind::Verify);
        stats.record_success(RequestKind::Verify);
        stats.record_success(RequestKind::Admin);
        stats.record_error(None);

        let snap = stats.snapshot(start() + Duration::seconds(90));
        assert_eq!(snap.total_requests, 4);
        assert_eq!(snap.verify_requests, 2);
        assert_eq!(snap.admin_requests, 1);
        assert_eq!(snap.error_count, 1);
        assert_eq!(snap.success_rate, 75.0);
        assert_eq!(snap.uptime_secs, 90);
    }

    #[test]
    fn test_authorized_admin_failure_counts_as_admin() {
        let stats = ApiStats::new(start());
        stats.record_error(Some(RequestKind::Admin));
        stats.record_error(None);

        let snap = stats.snapshot(start());
        assert_eq!(snap.total_requests, 2);
        assert_eq!(snap.admin_requests, 1);
        assert_eq!(snap.verify_requests, 0);
        assert_eq!(snap.error_count, 2);
    }
}
