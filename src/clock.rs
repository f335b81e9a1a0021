//! Time source for the service facade.
//!
//! The engine takes `now` as an argument; the facade reads it from a
//! [`Clock`] so expiry and login timestamps are deterministic in tests.

use chrono::{DateTime, Utc};

/// Source of the current UTC time.
pub trait Clock: Send + Sync {
    /// Get the current UTC time.
    fn now_utc(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable clock for tests. Interior mutability lets a shared
/// `Arc<MockClock>` be moved forward while a service holds it.
#[cfg(any(test, feature = "test-seams"))]
#[derive(Debug)]
pub struct MockClock {
    now: std::sync::Mutex<DateTime<Utc>>,
}

#[cfg(any(test, feature = "test-seams"))]
impl MockClock {
    /// Create a mock clock frozen at the given time.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: std::sync::Mutex::new(now),
        }
    }

    /// Create a mock clock at midnight UTC of the given date.
    pub fn at_date(year: i32, month: u32, day: u32) -> Self {
        let date =
            chrono::NaiveDate::from_ymd_opt(year, month, day).expect("valid calendar date");
        Self::new(crate::model::start_of_day(date))
    }

    /// Advance the clock by a duration.
    pub fn advance(&self, duration: chrono::Duration) {
        let mut now = self.now.lock().expect("mock clock lock");
        *now = *now + duration;
    }
}

#[cfg(any(test, feature = "test-seams"))]
impl Clock for MockClock {
    fn now_utc(&self) -> DateTime<Utc> {
        *self.now.lock().expect("mock clock lock")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn system_clock_returns_time() {
        let now = SystemClock.now_utc();
        assert!(now.year() >= 2024);
    }

    #[test]
    fn mock_clock_starts_at_midnight() {
        let clock = MockClock::at_date(2025, 1, 15);
        assert_eq!(clock.now_utc().to_rfc3339(), "2025-01-15T00:00:00+00:00");
    }

    #[test]
    fn mock_clock_advances_through_shared_reference() {
        let clock = std::sync::Arc::new(MockClock::at_date(2025, 1, 15));
        let handle = clock.clone();
        handle.advance(chrono::Duration::hours(36));
        assert_eq!(clock.now_utc().to_rfc3339(), "2025-01-16T12:00:00+00:00");
    }
}
