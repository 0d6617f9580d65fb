//! Per-source circuit breaker, spec.md §4.2.
//!
//! Closed → Open on reaching a failure threshold; Open → HalfOpen after a
//! cooldown window elapses; HalfOpen admits a single trial call, which
//! closes the breaker on success or reopens it (with the cooldown reset)
//! on failure.

use crate::clock::Clock;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

struct BreakerEntry {
    state: BreakerState,
    consecutive_failures: u32,
    opened_at: Option<std::time::Instant>,
}

impl BreakerEntry {
    fn new() -> Self {
        Self {
            state: BreakerState::Closed,
            consecutive_failures: 0,
            opened_at: None,
        }
    }
}

/// Tracks one breaker per source key (spec.md's `BreakerState` is scoped
/// per source). Guarded by a single mutex: breaker transitions are rare
/// and cheap compared to the network calls they gate.
pub struct CircuitBreaker {
    clock: std::sync::Arc<dyn Clock>,
    failure_threshold: u32,
    open_duration: Duration,
    entries: Mutex<HashMap<String, BreakerEntry>>,
}

impl CircuitBreaker {
    pub fn new(clock: std::sync::Arc<dyn Clock>, failure_threshold: u32, open_duration: Duration) -> Self {
        Self {
            clock,
            failure_threshold,
            open_duration,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Whether a call against `source` is currently permitted. Transitions
    /// Open to HalfOpen as a side effect once the cooldown has elapsed, so
    /// repeated polling eventually admits a trial call without an external
    /// driver.
    pub fn is_call_permitted(&self, source: &str) -> bool {
        let mut entries = self.entries.lock().expect("breaker mutex poisoned");
        let entry = entries.entry(source.to_string()).or_insert_with(BreakerEntry::new);

        match entry.state {
            BreakerState::Closed => true,
            BreakerState::HalfOpen => true,
            BreakerState::Open => {
                let elapsed = entry
                    .opened_at
                    .map(|t| self.clock.monotonic_now().duration_since(t))
                    .unwrap_or(Duration::ZERO);
                if elapsed >= self.open_duration {
                    entry.state = BreakerState::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self, source: &str) {
        let mut entries = self.entries.lock().expect("breaker mutex poisoned");
        let entry = entries.entry(source.to_string()).or_insert_with(BreakerEntry::new);
        entry.state = BreakerState::Closed;
        entry.consecutive_failures = 0;
        entry.opened_at = None;
    }

    pub fn record_failure(&self, source: &str) {
        let mut entries = self.entries.lock().expect("breaker mutex poisoned");
        let entry = entries.entry(source.to_string()).or_insert_with(BreakerEntry::new);

        match entry.state {
            BreakerState::HalfOpen => {
                entry.state = BreakerState::Open;
                entry.opened_at = Some(self.clock.monotonic_now());
            }
            BreakerState::Closed => {
                entry.consecutive_failures += 1;
                if entry.consecutive_failures >= self.failure_threshold {
                    entry.state = BreakerState::Open;
                    entry.opened_at = Some(self.clock.monotonic_now());
                }
            }
            BreakerState::Open => {
                entry.opened_at = Some(self.clock.monotonic_now());
            }
        }
    }

    pub fn state_of(&self, source: &str) -> BreakerState {
        let mut entries = self.entries.lock().expect("breaker mutex poisoned");
        entries.entry(source.to_string()).or_insert_with(BreakerEntry::new).state
    }

    /// Current consecutive-failure count for `source` (spec.md §4.10's
    /// "per-source failure counters", part of the scheduler-stats
    /// snapshot alongside breaker state).
    pub fn failure_count(&self, source: &str) -> u32 {
        let mut entries = self.entries.lock().expect("breaker mutex poisoned");
        entries.entry(source.to_string()).or_insert_with(BreakerEntry::new).consecutive_failures
    }

    /// Closes a single source's breaker and zeros its failure counter, used
    /// by the control surface's per-source reset-failures operation.
    pub fn reset(&self, source: &str) {
        let mut entries = self.entries.lock().expect("breaker mutex poisoned");
        entries.insert(source.to_string(), BreakerEntry::new());
    }

    /// Closes every known breaker, used by the control surface's global
    /// reset-failures operation.
    pub fn reset_all(&self) {
        let mut entries = self.entries.lock().expect("breaker mutex poisoned");
        for entry in entries.values_mut() {
            *entry = BreakerEntry::new();
        }
    }

    /// Every source this breaker has ever seen a call for, used to build a
    /// full scheduler-stats snapshot.
    pub fn known_sources(&self) -> Vec<String> {
        let entries = self.entries.lock().expect("breaker mutex poisoned");
        entries.keys().cloned().collect()
    }
}
