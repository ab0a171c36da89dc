//! Bounded retry budget with fixed or exponential backoff.
//!
//! The fetcher retries a failed page with the same cursor until the budget is
//! exhausted; the delay between attempts comes from the [`Backoff`] schedule.
//! Delays are pure arithmetic here — actually waiting is the caller's job,
//! through the injected clock.

use std::time::Duration;

/// Delay schedule between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Same delay before every retry.
    Fixed { delay: Duration },
    /// `base * factor^(retry - 1)`, capped at `max`.
    Exponential {
        base: Duration,
        factor: f64,
        max: Duration,
    },
}

impl Backoff {
    /// Delay before retry number `retry` (1-based: 1 is the first retry,
    /// i.e. the second attempt overall).
    pub fn delay_for(&self, retry: u32) -> Duration {
        match self {
            Backoff::Fixed { delay } => *delay,
            Backoff::Exponential { base, factor, max } => {
                let exp = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
                let secs = base.as_secs_f64() * factor.powi(exp);
                Duration::from_secs_f64(secs.min(max.as_secs_f64()))
            }
        }
    }
}

/// Retry budget for one remote page request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts allowed, including the first. Clamped to at least 1.
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// Exponential backoff from 1s, doubling, capped at 30s.
    pub fn exponential(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Backoff::Exponential {
                base: Duration::from_secs(1),
                factor: 2.0,
                max: Duration::from_secs(30),
            },
        }
    }

    /// Constant delay between attempts.
    pub fn fixed(delay: Duration, max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Backoff::Fixed { delay },
        }
    }

    /// Single attempt, no retries.
    pub fn no_retry() -> Self {
        Self::fixed(Duration::ZERO, 1)
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.backoff.delay_for(retry)
    }

    /// Retries available after the first attempt.
    pub fn max_retries(&self) -> u32 {
        self.max_attempts.saturating_sub(1)
    }
}

impl Default for RetryPolicy {
    /// 10 attempts, exponential backoff. Bounded on purpose: an endlessly
    /// retrying page request would hang a sync job forever on a dead gateway.
    fn default() -> Self {
        Self::exponential(10)
    }
}
