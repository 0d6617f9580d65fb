//! Correlation IDs, spec.md §4.11/C11: a 128-bit opaque token minted once
//! per job run and threaded through every downstream call so every log
//! line for a run can be joined on it.
//!
//! `SourceRunner::run` takes a `CorrelationId` and records it as a
//! `tracing` span field; every call it makes into the harvester, storage,
//! and classifier collaborators executes inside that span, so their own
//! log lines inherit the field without needing it threaded through each
//! trait method's signature. `BatchCoordinator::run_batch` mints one ID
//! per batch firing and shares it across every source task spawned from
//! that batch. This is the idiomatic equivalent of the original's
//! `ContextVar`-backed `set_correlation_id`/`get_correlation_id`
//! (`core/logging.py`): ambient context attached once, read implicitly by
//! everything nested under it, rather than a value passed explicitly into
//! every call.

use crate::breaker::CircuitBreaker;
use crate::control::BreakerStatus;
use crate::keypool::KeyPool;
use crate::storage::StorageGateway;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CorrelationId(pub Uuid);

impl CorrelationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Initializes the global `tracing` subscriber: JSON output honoring
/// `RUST_LOG`/`EnvFilter`, falling back to `info`. Matches
/// `rootsignal-server`'s startup sequence.
pub fn init_tracing(json: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);

    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// `/health` composition (spec.md §4.11): scheduler running flag, storage
/// reachability, every known source's breaker state, and key-pool
/// availability. Unlike `SchedulerStatus` this omits per-job statistics —
/// it answers "is the system healthy", not "what has it done".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub scheduler_running: bool,
    pub storage_reachable: bool,
    pub breakers: Vec<BreakerStatus>,
    pub key_pool_available: Option<bool>,
}

impl HealthReport {
    /// Whether the system is fit to serve traffic: storage reachable and
    /// the scheduler running. Breaker trips and key exhaustion degrade
    /// individual sources without making the whole process unhealthy.
    pub fn is_healthy(&self) -> bool {
        self.storage_reachable && self.scheduler_running
    }

    pub async fn compose(
        scheduler_running: bool,
        storage: &Arc<dyn StorageGateway>,
        breaker: &Arc<CircuitBreaker>,
        key_pool: Option<&Arc<KeyPool>>,
        now: DateTime<Utc>,
    ) -> Self {
        let storage_reachable = storage.is_reachable().await;
        let breakers = breaker
            .known_sources()
            .into_iter()
            .map(|source| {
                let state = match breaker.state_of(&source) {
                    crate::breaker::BreakerState::Closed => "closed",
                    crate::breaker::BreakerState::Open => "open",
                    crate::breaker::BreakerState::HalfOpen => "half_open",
                };
                let consecutive_failures = breaker.failure_count(&source);
                BreakerStatus {
                    source,
                    state: state.to_string(),
                    consecutive_failures,
                }
            })
            .collect();
        let key_pool_available = key_pool.map(|pool| pool.status(now).available_count > 0);
        Self {
            scheduler_running,
            storage_reachable,
            breakers,
            key_pool_available,
        }
    }
}
