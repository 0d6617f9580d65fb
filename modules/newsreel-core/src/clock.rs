//! Clock abstraction and jittered exponential backoff, spec.md §4.1.
//!
//! Time is injected everywhere the orchestration layer makes a
//! scheduling decision, following the teacher's pattern of passing
//! `chrono::Utc::now()` as a parameter rather than calling it inline, so
//! that tests can freeze time.

use chrono::{DateTime, Utc};
use rand::Rng;
use std::time::{Duration, Instant};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
    fn monotonic_now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn monotonic_now(&self) -> Instant {
        Instant::now()
    }
}

/// Test double that returns a fixed wall-clock time and an advancing
/// monotonic clock, so duration-based assertions (job elapsed time,
/// breaker open windows) still make sense under test.
pub struct FrozenClock {
    wall: std::sync::Mutex<DateTime<Utc>>,
    start: Instant,
}

impl FrozenClock {
    pub fn at(wall: DateTime<Utc>) -> Self {
        Self {
            wall: std::sync::Mutex::new(wall),
            start: Instant::now(),
        }
    }

    pub fn advance(&self, delta: chrono::Duration) {
        let mut wall = self.wall.lock().expect("clock mutex poisoned");
        *wall += delta;
    }
}

impl Clock for FrozenClock {
    fn now(&self) -> DateTime<Utc> {
        *self.wall.lock().expect("clock mutex poisoned")
    }

    fn monotonic_now(&self) -> Instant {
        self.start
    }
}

/// `min(cap, base * factor^attempt) * U(0.5, 1)` when `jitter` is
/// requested, else the deterministic `min(cap, base * factor^attempt)`.
/// Mirrors the teacher's `ChromeScraper` retry backoff
/// (`base * 3^attempt + jitter`), generalized to spec.md §4.1's signature.
pub fn backoff_delay(attempt: u32, base: Duration, factor: f64, cap: Duration, jitter: bool) -> Duration {
    let exp = factor.powi(attempt.min(32) as i32);
    let scaled = base.mul_f64(exp.max(0.0));
    let capped = scaled.min(cap);
    if jitter {
        let fraction = rand::rng().random_range(0.5..=1.0);
        capped.mul_f64(fraction)
    } else {
        capped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_and_respects_cap() {
        let base = Duration::from_secs(1);
        let cap = Duration::from_secs(30);
        let d0 = backoff_delay(0, base, 2.0, cap, false);
        let d3 = backoff_delay(3, base, 2.0, cap, false);
        assert_eq!(d0, Duration::from_secs(1));
        assert_eq!(d3, Duration::from_secs(8));
        let d_huge = backoff_delay(10, base, 2.0, cap, false);
        assert_eq!(d_huge, cap);
    }

    #[test]
    fn jitter_stays_within_half_to_full_of_deterministic_value() {
        let base = Duration::from_secs(1);
        let cap = Duration::from_secs(30);
        let deterministic = backoff_delay(2, base, 2.0, cap, false);
        for _ in 0..20 {
            let jittered = backoff_delay(2, base, 2.0, cap, true);
            assert!(jittered <= deterministic);
            assert!(jittered >= deterministic.mul_f64(0.5));
        }
    }

    #[test]
    fn frozen_clock_only_advances_when_told() {
        let clock = FrozenClock::at(Utc::now());
        let first = clock.now();
        let second = clock.now();
        assert_eq!(first, second);
        clock.advance(chrono::Duration::seconds(60));
        assert!(clock.now() > first);
    }
}
