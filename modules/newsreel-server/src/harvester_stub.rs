//! Placeholder harvester, registered per configured source at startup.
//!
//! Per-publisher parsing (`news_scrapers/*.py`, `youtube_scrapers/*.py` in
//! the original) is explicitly out of scope (spec.md §1): this crate owns
//! orchestration, not site-specific extraction. `StubHarvester` implements
//! the `Harvester` contract honestly — it always reports end-of-results —
//! so the scheduler, breaker, and storage paths are exercisable end to end
//! before a real adapter crate is plugged into the registry under the
//! same name.

use async_trait::async_trait;
use newsreel_common::{NewsreelError, Query, RawItem};
use newsreel_core::Harvester;

pub struct StubHarvester {
    name: String,
}

impl StubHarvester {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Harvester for StubHarvester {
    fn name(&self) -> &str {
        &self.name
    }

    async fn harvest(&self, _query: &Query) -> Result<Vec<RawItem>, NewsreelError> {
        Ok(Vec::new())
    }
}
