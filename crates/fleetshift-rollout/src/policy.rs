//! Poll policy — interval and time budget for readiness and drain loops.

use std::time::Duration;

use fleetshift_core::config::{DEFAULT_POLL_INTERVAL_SECS, DEFAULT_TIMEOUT_SECS};

/// How often to poll and how long to keep trying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PollPolicy {
    /// Seconds to sleep between predicate evaluations.
    pub interval_secs: u64,
    /// Seconds after which a phase gives up.
    pub timeout_secs: u64,
}

impl PollPolicy {
    pub fn new(interval_secs: u64, timeout_secs: u64) -> Self {
        Self {
            interval_secs: interval_secs.max(1),
            timeout_secs,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy() {
        let policy = PollPolicy::default();
        assert_eq!(policy.interval_secs, DEFAULT_POLL_INTERVAL_SECS);
        assert_eq!(policy.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(policy.interval(), Duration::from_secs(5));
    }

    #[test]
    fn zero_interval_is_clamped() {
        let policy = PollPolicy::new(0, 30);
        assert_eq!(policy.interval_secs, 1);
        assert_eq!(policy.timeout_secs, 30);
    }
}
