//! Idle detection for a running process.

use std::time::Duration;

use tokio::time::Instant;

/// Timestamp of the most recent line seen on either output stream.
#[derive(Debug, Clone, Copy)]
pub struct LivenessClock {
    last_activity: Instant,
}

impl LivenessClock {
    /// Start the clock now.
    #[must_use]
    pub fn start() -> Self {
        Self {
            last_activity: Instant::now(),
        }
    }

    /// Record activity.
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Time since the last activity.
    #[must_use]
    pub fn idle_for(&self) -> Duration {
        self.last_activity.elapsed()
    }

    /// Returns the idle time if it strictly exceeds `timeout`.
    #[must_use]
    pub fn stale(&self, timeout: Duration) -> Option<Duration> {
        let idle = self.idle_for();
        (idle > timeout).then_some(idle)
    }
}
