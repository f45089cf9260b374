use bazaar_domain::config::RealtimeConfig;
use std::time::Duration;

/// Linear reconnect backoff.
///
/// Attempt `n` (1-based) waits `n * interval`, optionally capped by `max_delay`.
/// After `max_attempts` failed attempts the client gives up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
    pub max_delay: Option<Duration>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_attempts: 5, interval: Duration::from_millis(3000), max_delay: None }
    }
}

impl ReconnectPolicy {
    #[must_use]
    pub const fn new(max_attempts: u32, interval: Duration) -> Self {
        Self { max_attempts, interval, max_delay: None }
    }

    #[must_use]
    pub const fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    /// Delay before attempt `attempt`, or `None` once attempts are exhausted.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_attempts {
            return None;
        }
        let delay = self.interval.saturating_mul(attempt);
        Some(self.max_delay.map_or(delay, |cap| delay.min(cap)))
    }
}

impl From<&RealtimeConfig> for ReconnectPolicy {
    fn from(config: &RealtimeConfig) -> Self {
        Self {
            max_attempts: config.max_reconnect_attempts,
            interval: config.reconnect_interval(),
            max_delay: config.max_reconnect_delay(),
        }
    }
}
