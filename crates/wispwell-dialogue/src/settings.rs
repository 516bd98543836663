//! Polling cadence for turn participants.

use std::time::Duration;

use wispwell_scene::domain::graph::DEFAULT_WAIT;

/// How often a participant polls, how it slows down when polls fail, and how
/// long it pauses after lines that give no `wait`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Delay between ticks in normal operation.
    pub poll_interval: Duration,
    /// Delay used once `failure_threshold` consecutive polls have failed.
    pub error_backoff: Duration,
    /// Consecutive poll failures that trigger one backoff delay.
    pub failure_threshold: u32,
    /// Post-line pause for nodes without a `wait`.
    pub default_wait: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3),
            error_backoff: Duration::from_secs(5),
            failure_threshold: 2,
            default_wait: DEFAULT_WAIT,
        }
    }
}
