//! Fixed-window request pacing for the backend's per-stream quota.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

/// Requests per second the backend accepts for one stream.
pub const RPS_LIMIT: u32 = 5;

const STALL: Duration = Duration::from_secs(1);

/// Wall-clock source used to decide which second a request falls in.
#[cfg_attr(test, automock)]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Allows up to [`RPS_LIMIT`] requests per wall-clock second and stalls the
/// caller for a full second once the quota is spent.
///
/// This is not a token bucket: there is no smoothing, the quota simply refills
/// whenever a request lands in a different second than the previous one.
pub struct ThrottleGate {
    clock: Arc<dyn Clock>,
    limit: u32,
    remaining_requests: u32,
    window_start: DateTime<Utc>,
}

impl ThrottleGate {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let window_start = clock.now();
        Self {
            clock,
            limit: RPS_LIMIT,
            remaining_requests: RPS_LIMIT,
            window_start,
        }
    }

    /// Waits until a request may be sent. Only suspends the calling task.
    pub async fn acquire(&mut self) {
        let now = self.clock.now();
        let same_second = now.timestamp() == self.window_start.timestamp();

        if !same_second {
            self.remaining_requests = self.limit;
        } else if self.remaining_requests > 0 {
            self.remaining_requests -= 1;
        } else {
            debug!("Request quota of {} per second spent, stalling", self.limit);
            tokio::time::sleep(STALL).await;
            self.remaining_requests = self.limit;
        }

        self.window_start = self.clock.now();
    }

    pub fn remaining_requests(&self) -> u32 {
        self.remaining_requests
    }
}

impl Default for ThrottleGate {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ThrottleGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThrottleGate")
            .field("limit", &self.limit)
            .field("remaining_requests", &self.remaining_requests)
            .field("window_start", &self.window_start)
            .finish_non_exhaustive()
    }
}
