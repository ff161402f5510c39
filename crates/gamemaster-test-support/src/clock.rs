//! Clock pinned to a single instant, so `created_at` columns are predictable.

use chrono::{DateTime, Utc};
use gamemaster_core::clock::Clock;

/// Returns the wrapped instant on every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Pins the clock to an RFC 3339 timestamp such as `2026-01-15T10:00:00Z`.
    ///
    /// # Panics
    ///
    /// Panics if `timestamp` is not valid RFC 3339.
    #[must_use]
    pub fn at(timestamp: &str) -> Self {
        let instant = DateTime::parse_from_rfc3339(timestamp)
            .unwrap_or_else(|e| panic!("invalid timestamp {timestamp:?}: {e}"));
        Self(instant.with_timezone(&Utc))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
