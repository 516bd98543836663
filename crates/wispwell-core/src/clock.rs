//! Wall-clock abstraction used to stamp lifecycle timestamps.

use chrono::{DateTime, Utc};

/// Source of the current time for `started_at`, `ended_at` and `stopped_at`.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
