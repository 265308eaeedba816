//! Time sources
//!
//! All timestamps are seconds since the Unix epoch.

use chrono::{DateTime, Utc};

/// Source of the current time
pub trait Clock {
    fn now(&self) -> i64;
}

/// Wall clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// Clock that only moves when told to
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualClock {
    now: i64,
}

impl ManualClock {
    pub fn new(now: i64) -> Self {
        Self { now }
    }

    pub fn advance(&mut self, seconds: i64) {
        self.now = self.now.saturating_add(seconds);
    }

    pub fn set(&mut self, now: i64) {
        self.now = now;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.now
    }
}

/// Format a timestamp as an RFC 3339 UTC string, or the raw number if out of range
pub fn format_timestamp(timestamp: i64) -> String {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| timestamp.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let mut clock = ManualClock::new(1_000);
        clock.advance(500);
        assert_eq!(clock.now(), 1_500);
        clock.set(42);
        assert_eq!(clock.now(), 42);
    }

    #[test]
    fn test_manual_clock_saturates() {
        let mut clock = ManualClock::new(1_000);
        clock.advance(i64::MAX);
        assert_eq!(clock.now(), i64::MAX);
        clock.set(-10);
        clock.advance(i64::MIN);
        assert_eq!(clock.now(), i64::MIN);
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "1970-01-01T00:00:00+00:00");
    }
}
