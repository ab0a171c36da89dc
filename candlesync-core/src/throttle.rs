//! Request pacing under the gateway's aggregate rate quota.
//!
//! The gateway tolerates a fixed number of history requests per rolling
//! window (observed: 60 per 30s). Spreading requests evenly at the implied
//! minimum spacing keeps a single-process sync under the quota without
//! tracking the window itself. An explicit "too frequent" rejection pushes
//! the next slot further out on top of the regular spacing.

use crate::clock::Clock;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Pacing parameters, expressed the way the provider publishes its quota.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrottleConfig {
    /// Requests allowed per window.
    pub max_requests: u32,
    /// Quota window length.
    pub window: Duration,
    /// Extra delay imposed after an explicit rate-limit rejection.
    pub penalty: Duration,
}

impl ThrottleConfig {
    /// Minimum spacing between consecutive requests implied by the quota.
    pub fn min_spacing(&self) -> Duration {
        self.window / self.max_requests.max(1)
    }
}

impl Default for ThrottleConfig {
    /// Observed gateway quota: 60 requests per 30s, 1s penalty on rejection.
    fn default() -> Self {
        Self {
            max_requests: 60,
            window: Duration::from_secs(30),
            penalty: Duration::from_secs(1),
        }
    }
}

/// Cooperative single-process rate limiter.
///
/// Callers block in `wait_turn` until the next slot opens. There is no
/// cross-process coordination; one engine process is assumed to be the only
/// client of its gateway connection.
pub struct RequestThrottle {
    config: ThrottleConfig,
    clock: Arc<dyn Clock>,
    next_slot: Mutex<Option<Instant>>,
}

impl RequestThrottle {
    pub fn new(config: ThrottleConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            next_slot: Mutex::new(None),
        }
    }

    /// Block until a request may be sent, then claim the slot.
    ///
    /// The first call never waits. Subsequent calls wait out whatever remains
    /// of the minimum spacing (plus any penalty) before returning.
    pub fn wait_turn(&self) {
        let mut slot = self.next_slot.lock().unwrap();
        let now = self.clock.now();
        if let Some(at) = *slot {
            if at > now {
                self.clock.sleep(at - now);
            }
        }
        let granted = self.clock.now();
        *slot = Some(granted + self.config.min_spacing());
    }

    /// Push the next slot out by the penalty delay after the gateway rejected
    /// a request as too frequent.
    pub fn penalize(&self) {
        let mut slot = self.next_slot.lock().unwrap();
        let now = self.clock.now();
        let base = match *slot {
            Some(at) if at > now => at,
            _ => now,
        };
        *slot = Some(base + self.config.penalty);
    }

    pub fn config(&self) -> &ThrottleConfig {
        &self.config
    }
}
