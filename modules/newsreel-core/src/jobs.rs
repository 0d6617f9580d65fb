//! Binds the Scheduler (C9) to the Batch Coordinator (C8): one
//! `ScheduledJob` per content kind, firing a batch across every configured
//! source for that kind on each tick (spec.md §4.9 "each firing invokes
//! the Batch Coordinator with the configured source list and query
//! parameters").
//!
//! Grounded in the teacher's pattern of a thin trait impl that does
//! nothing but translate a tick into a call on the real collaborator,
//! e.g. `rootsignal-domains::clustering::ClusteringJobImpl` wrapping
//! `ClusteringJob::run`.

use crate::classifier::ClassifierClient;
use crate::clock::Clock;
use crate::coordinator::{BatchCoordinator, SourceTask};
use crate::registry::HarvesterRegistry;
use crate::runner::{RunnerConfig, SourceRunner};
use crate::scheduler::ScheduledJob;
use crate::{breaker::CircuitBreaker, keypool::KeyPool, storage::StorageGateway};
use async_trait::async_trait;
use newsreel_common::{ContentKind, NewsreelError, Query, SourceType};
use std::sync::Arc;

/// One configured publisher or channel this job fans out to on every
/// tick, paired with the harvester-registry name used to build its
/// adapter.
#[derive(Debug, Clone)]
pub struct SourceSpec {
    pub platform: String,
    pub base_url: String,
    pub harvester_name: String,
}

/// A `ScheduledJob` that resolves every configured source, builds one
/// `SourceTask` per source, and fans out through a `BatchCoordinator`.
/// Two instances exist in `newsreel-server`: one for article publishers,
/// one for video channels.
pub struct AcquisitionJob {
    source_type: SourceType,
    kind: ContentKind,
    sources: Vec<SourceSpec>,
    query: Query,
    registry: Arc<HarvesterRegistry>,
    storage: Arc<dyn StorageGateway>,
    coordinator: BatchCoordinator,
}

impl AcquisitionJob {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source_type: SourceType,
        kind: ContentKind,
        sources: Vec<SourceSpec>,
        query: Query,
        registry: Arc<HarvesterRegistry>,
        storage: Arc<dyn StorageGateway>,
        clock: Arc<dyn Clock>,
        breaker: Arc<CircuitBreaker>,
        classifier: Arc<dyn ClassifierClient>,
        key_pool: Option<Arc<KeyPool>>,
        runner_config: RunnerConfig,
        max_concurrent: usize,
    ) -> Self {
        let runner = Arc::new(SourceRunner::new(clock, breaker, storage.clone(), classifier, key_pool, runner_config));
        Self {
            source_type,
            kind,
            sources,
            query,
            registry,
            storage,
            coordinator: BatchCoordinator::new(runner, max_concurrent),
        }
    }

    async fn build_tasks(&self) -> Result<Vec<SourceTask>, NewsreelError> {
        let mut tasks = Vec::with_capacity(self.sources.len());
        for spec in &self.sources {
            let harvester = self.registry.create(&spec.harvester_name)?;
            let source = self.storage.resolve_source(self.source_type, &spec.platform, &spec.base_url).await?;
            tasks.push(SourceTask {
                source,
                harvester,
                kind: self.kind,
                query: self.query.clone(),
            });
        }
        Ok(tasks)
    }
}

#[async_trait]
impl ScheduledJob for AcquisitionJob {
    async fn run(&self, _clock: &dyn Clock) -> Result<String, String> {
        let tasks = self.build_tasks().await.map_err(|e| e.to_string())?;
        let summary = self.coordinator.run_batch(tasks).await;
        Ok(format!(
            "{kind:?}: {succ}/{total} sources ok, scraped={scraped} inserted={inserted} classified={classified}",
            kind = self.kind,
            succ = summary.sources_succeeded,
            total = summary.sources_processed,
            scraped = summary.total_scraped,
            inserted = summary.total_inserted,
            classified = summary.total_classified,
        ))
    }
}
