//! Harvester adapter contract, spec.md §4.4/§4.5.
//!
//! Adapters live outside this crate's scope (spec.md §1's non-goal on
//! per-publisher parsing); this trait is the seam they implement against,
//! grounded in the teacher's `ContentFetcher` trait
//! (`rootsignal-scout/src/pipeline/traits.rs`) paired with a concrete impl
//! for the real collaborator type.

use async_trait::async_trait;
use newsreel_common::{NewsreelError, Query, RawItem};

#[async_trait]
pub trait Harvester: Send + Sync {
    /// Human-readable name used in logs and breaker keys, e.g. the
    /// publisher domain or channel handle.
    fn name(&self) -> &str;

    /// Fetches one page of items matching `query` (the runner advances
    /// `query.page` between calls). Transient upstream failures (rate
    /// limits, timeouts, 5xx) must be reported as
    /// `NewsreelError::UpstreamTransient`; permanent ones (404, malformed
    /// response) as `NewsreelError::UpstreamPermanent` — the runner relies
    /// on this distinction to decide whether to retry (spec.md §4.7). An
    /// empty result means end of results, never a transient error.
    async fn harvest(&self, query: &Query) -> Result<Vec<RawItem>, NewsreelError>;

    /// Whether this adapter needs a credential from the Key Pool (C3)
    /// before it can be called. Defaults to `false`.
    fn requires_credential(&self) -> bool {
        false
    }
}
