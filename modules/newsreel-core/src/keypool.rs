//! Round-robin API key pool with daily quota reset, spec.md §4.3.
//!
//! Grounded in the original `YouTubeAPIPool`: keys advance only on
//! exhaustion, quotas reset at UTC midnight, and a key's identity in logs
//! is the first eight hex digits of its MD5 hash, never the key itself.

use chrono::{DateTime, NaiveDate, Utc};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub struct KeyEntry {
    pub key: String,
    pub request_count: u64,
    pub exhausted: bool,
    pub last_error: Option<String>,
    pub last_reset_date: NaiveDate,
}

impl KeyEntry {
    fn new(key: String, today: NaiveDate) -> Self {
        Self {
            key,
            request_count: 0,
            exhausted: false,
            last_error: None,
            last_reset_date: today,
        }
    }

    /// First eight hex digits of the key's MD5 hash, used as its identity
    /// in logs and metrics so the key itself never appears in output.
    pub fn identity(&self) -> String {
        let mut hasher = Md5::new();
        hasher.update(self.key.as_bytes());
        hex::encode(hasher.finalize())[..8].to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyStatusEntry {
    pub index: usize,
    pub identity: String,
    pub request_count: u64,
    pub exhausted: bool,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPoolStatus {
    pub entries: Vec<KeyStatusEntry>,
    pub available_count: usize,
    pub exhausted_count: usize,
    /// Next UTC midnight, when every exhausted key's quota reopens
    /// (spec.md §4.3's aggregate status: "next-reset instant").
    pub next_reset: DateTime<Utc>,
}

/// Whether an upstream failure indicates quota exhaustion (provider 403
/// with a quota marker) as opposed to some other transient failure. The
/// caller decides this — the pool only records the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyResult {
    Success,
    QuotaExceeded,
    OtherFailure,
}

/// The next UTC midnight strictly after `now` — the instant at which
/// quota-exhausted keys become available again (spec.md §4.1: "the
/// boundary is the next UTC midnight").
fn next_utc_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    let tomorrow = now.date_naive() + chrono::Duration::days(1);
    tomorrow.and_hms_opt(0, 0, 0).expect("midnight is a valid time").and_utc()
}

struct PoolState {
    entries: Vec<KeyEntry>,
    last_served_index: usize,
}

/// Thread-safe round-robin pool over a fixed set of API keys. Advances
/// lazily from the last-served index and resets every key's exhaustion
/// bit the first time it observes a new UTC date.
pub struct KeyPool {
    state: Mutex<PoolState>,
}

impl KeyPool {
    pub fn new(keys: Vec<String>, now: DateTime<Utc>) -> Self {
        let today = now.date_naive();
        let entries = keys.into_iter().map(|k| KeyEntry::new(k, today)).collect();
        Self {
            state: Mutex::new(PoolState {
                entries,
                last_served_index: 0,
            }),
        }
    }

    fn reset_if_new_day(entry: &mut KeyEntry, today: NaiveDate) {
        if entry.last_reset_date != today {
            entry.exhausted = false;
            entry.last_reset_date = today;
        }
    }

    /// Picks the next non-exhausted key using round-robin from the last
    /// served index, advancing lazily. Returns `None` (`allExhausted`) if
    /// every key is currently exhausted.
    pub fn acquire(&self, now: DateTime<Utc>) -> Option<KeyEntry> {
        let today = now.date_naive();
        let mut state = self.state.lock().expect("key pool mutex poisoned");
        let n = state.entries.len();
        if n == 0 {
            return None;
        }

        for step in 0..n {
            let idx = (state.last_served_index + step) % n;
            Self::reset_if_new_day(&mut state.entries[idx], today);
            if !state.entries[idx].exhausted {
                state.entries[idx].request_count += 1;
                state.last_served_index = (idx + 1) % n;
                return Some(state.entries[idx].clone());
            }
        }
        None
    }

    /// Records the outcome of a call made with `key`. A quota-exceeded
    /// failure marks the key exhausted until the pool next observes a new
    /// UTC day; any other failure only records the error, the key stays
    /// available.
    pub fn record_result(&self, key: &str, result: KeyResult, error: Option<String>) {
        let mut state = self.state.lock().expect("key pool mutex poisoned");
        if let Some(entry) = state.entries.iter_mut().find(|e| e.key == key) {
            match result {
                KeyResult::Success => {
                    entry.last_error = None;
                }
                KeyResult::QuotaExceeded => {
                    entry.exhausted = true;
                    entry.last_error = error;
                }
                KeyResult::OtherFailure => {
                    entry.last_error = error;
                }
            }
        }
    }

    /// Snapshot of per-key status plus the aggregate (spec.md §4.3):
    /// available count, exhausted count, and the next UTC-midnight
    /// instant at which every exhausted key's quota reopens.
    pub fn status(&self, now: DateTime<Utc>) -> KeyPoolStatus {
        let state = self.state.lock().expect("key pool mutex poisoned");
        let entries: Vec<KeyStatusEntry> = state
            .entries
            .iter()
            .enumerate()
            .map(|(index, e)| KeyStatusEntry {
                index,
                identity: e.identity(),
                request_count: e.request_count,
                exhausted: e.exhausted,
                last_error: e.last_error.clone(),
            })
            .collect();
        let exhausted_count = entries.iter().filter(|e| e.exhausted).count();
        let available_count = entries.len() - exhausted_count;
        KeyPoolStatus {
            entries,
            available_count,
            exhausted_count,
            next_reset: next_utc_midnight(now),
        }
    }

    /// Clears exhaustion state for every key, used by the control surface
    /// (spec.md §4.10's reset-failures operation).
    pub fn reset(&self) {
        let mut state = self.state.lock().expect("key pool mutex poisoned");
        for entry in state.entries.iter_mut() {
            entry.exhausted = false;
            entry.last_error = None;
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().expect("key pool mutex poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
