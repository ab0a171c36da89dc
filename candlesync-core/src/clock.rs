//! Injected time capability for throttling, retry backoff and sync pacing.
//!
//! Everything that waits or looks at the calendar goes through [`Clock`], so
//! tests drive pacing on a [`ManualClock`] in virtual time instead of
//! sleeping for real.

use chrono::NaiveDate;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Time as seen by the sync engine.
pub trait Clock: Send + Sync {
    /// Monotonic now, used for request-spacing arithmetic.
    fn now(&self) -> Instant;

    /// Wall-clock calendar date, used to compute sync windows.
    fn today(&self) -> NaiveDate;

    /// Block the calling thread for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Real time: `Instant::now`, the local calendar date, `thread::sleep`.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Virtual clock for tests: `sleep` advances time instead of blocking, and
/// every sleep is recorded for assertions.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    state: Mutex<ManualState>,
}

#[derive(Debug)]
struct ManualState {
    elapsed: Duration,
    today: NaiveDate,
    sleeps: Vec<Duration>,
}

impl ManualClock {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            base: Instant::now(),
            state: Mutex::new(ManualState {
                elapsed: Duration::ZERO,
                today,
                sleeps: Vec::new(),
            }),
        }
    }

    /// Move virtual time forward without recording a sleep.
    pub fn advance(&self, duration: Duration) {
        self.state.lock().unwrap().elapsed += duration;
    }

    pub fn set_today(&self, today: NaiveDate) {
        self.state.lock().unwrap().today = today;
    }

    /// Every duration passed to `sleep`, in call order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.state.lock().unwrap().sleeps.clone()
    }

    pub fn total_slept(&self) -> Duration {
        self.state.lock().unwrap().sleeps.iter().sum()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + self.state.lock().unwrap().elapsed
    }

    fn today(&self) -> NaiveDate {
        self.state.lock().unwrap().today
    }

    fn sleep(&self, duration: Duration) {
        let mut state = self.state.lock().unwrap();
        state.elapsed += duration;
        state.sleeps.push(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jan(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, day).unwrap()
    }

    #[test]
    fn manual_clock_advances_on_sleep() {
        let clock = ManualClock::new(jan(5));
        let t0 = clock.now();
        clock.sleep(Duration::from_millis(500));
        clock.sleep(Duration::from_secs(1));
        assert_eq!(clock.now() - t0, Duration::from_millis(1500));
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_millis(500), Duration::from_secs(1)]
        );
        assert_eq!(clock.total_slept(), Duration::from_millis(1500));
    }

    #[test]
    fn manual_clock_advance_is_not_a_sleep() {
        let clock = ManualClock::new(jan(5));
        clock.advance(Duration::from_secs(10));
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn manual_clock_pins_today() {
        let clock = ManualClock::new(jan(5));
        assert_eq!(clock.today(), jan(5));
        clock.set_today(jan(6));
        assert_eq!(clock.today(), jan(6));
    }

    #[test]
    fn system_clock_reports_monotonic_now() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
