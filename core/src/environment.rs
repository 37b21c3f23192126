//! Injected environment dependencies.

use chrono::{DateTime, Utc};

/// Source of the current time.
///
/// Injected rather than called directly (`Utc::now()`) so that coordinator
/// and dispatcher tests can control time deterministically.
pub trait Clock: Send + Sync {
    /// The current instant in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// The real wall-clock `Clock`, used outside of tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_reports_recent_time() {
        let before = Utc::now();
        let reported = SystemClock.now();
        let after = Utc::now();
        assert!(reported >= before && reported <= after);
    }
}
