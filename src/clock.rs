// src/clock.rs

//! Presentation clock.
//!
//! Every timestamp the engine records (onsets, stop times, response times) is a
//! [`Timestamp`]: the time elapsed since the clock's origin. Keeping time as an
//! offset rather than an `Instant` lets a [`ManualClock`] drive the whole
//! pipeline deterministically.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Time since the clock origin.
pub type Timestamp = Duration;

/// Source of presentation time.
pub trait Clock: Send + Sync {
    /// Current time since the clock origin.
    fn now(&self) -> Timestamp;

    /// Blocks the calling thread until `deadline` has been reached.
    fn sleep_until(&self, deadline: Timestamp);

    fn elapsed_since(&self, earlier: Timestamp) -> Duration {
        self.now().saturating_sub(earlier)
    }
}

/// Monotonic wall clock.
///
/// `sleep_until` sleeps coarsely until `spin_threshold` before the deadline and
/// spins (yielding) for the remainder, trading a little CPU for sub-millisecond
/// wake-up accuracy.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
    spin_threshold: Duration,
}

impl SystemClock {
    pub fn new(spin_threshold: Duration) -> Self {
        SystemClock {
            origin: Instant::now(),
            spin_threshold,
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        SystemClock::new(Duration::from_micros(1500))
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        self.origin.elapsed()
    }

    fn sleep_until(&self, deadline: Timestamp) {
        loop {
            let now = self.now();
            if now >= deadline {
                return;
            }
            let remaining = deadline - now;
            if remaining > self.spin_threshold {
                thread::sleep(remaining - self.spin_threshold);
            } else {
                thread::yield_now();
            }
        }
    }
}

/// A clock that only moves when told to.
///
/// `sleep_until` jumps straight to the deadline, so a show-list with multi-second
/// durations runs instantly while every recorded timestamp stays exact. Clones
/// share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.nanos.fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
    }

    pub fn set(&self, to: Timestamp) {
        self.nanos.store(to.as_nanos() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }

    fn sleep_until(&self, deadline: Timestamp) {
        self.nanos
            .fetch_max(deadline.as_nanos() as u64, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn manual_clock_never_moves_backwards() {
        let clock = ManualClock::new();
        clock.advance(Duration::from_millis(30));
        clock.sleep_until(Duration::from_millis(10));
        assert_eq!(clock.now(), Duration::from_millis(30));
        clock.sleep_until(Duration::from_millis(45));
        assert_eq!(clock.now(), Duration::from_millis(45));
    }

    #[test_log::test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new();
        let other = clock.clone();
        other.advance(Duration::from_millis(7));
        assert_eq!(clock.elapsed_since(Duration::from_millis(2)), Duration::from_millis(5));
    }

    #[test_log::test]
    fn system_clock_reaches_deadline() {
        let clock = SystemClock::new(Duration::from_micros(500));
        let deadline = clock.now() + Duration::from_millis(5);
        clock.sleep_until(deadline);
        assert!(clock.now() >= deadline);
    }
}
