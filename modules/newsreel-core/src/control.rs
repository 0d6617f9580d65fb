//! Control surface, spec.md §4.10/§6: operator-facing operations over the
//! scheduler, breaker map, key pool, and storage, exposed as plain trait
//! methods and wired into HTTP by `newsreel-api`. Field shapes mirror the
//! original `POST /scheduler/configure/{news,youtube}` request bodies.

use crate::breaker::{BreakerState, CircuitBreaker};
use crate::classifier::ClassifierClient;
use crate::clock::Clock;
use crate::keypool::{KeyPool, KeyPoolStatus};
use crate::observability::HealthReport;
use crate::registry::HarvesterRegistry;
use crate::runner::{RunReport, RunnerConfig, SourceRunner};
use crate::scheduler::{JobConfig, Scheduler};
use crate::storage::{ActivityBucket, ArticleBatchOutcome, LanguageCount, PlatformCounts, StorageGateway, VideoInsertOutcome};
use async_trait::async_trait;
use newsreel_common::{Article, ContentId, ContentKind, JobStats, NewsreelError, Query, SourceId, SourceRecord, SourceType, Video};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobConfigUpdate {
    pub interval_minutes: Option<u64>,
    pub max_instances: Option<u32>,
    pub coalesce: Option<bool>,
    pub jitter_seconds: Option<u64>,
    pub misfire_grace_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerStatus {
    pub source: String,
    pub state: String,
    pub consecutive_failures: u32,
}

impl BreakerStatus {
    fn of(source: &str, state: BreakerState, consecutive_failures: u32) -> Self {
        let state = match state {
            BreakerState::Closed => "closed",
            BreakerState::Open => "open",
            BreakerState::HalfOpen => "half_open",
        };
        Self {
            source: source.to_string(),
            state: state.to_string(),
            consecutive_failures,
        }
    }
}

/// Full scheduler snapshot (spec.md §4.10 "get scheduler stats"): running
/// flag, per-job stats and next-fire instant, every known source's breaker
/// state, and key-pool availability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub jobs: Vec<JobStats>,
    pub next_fire_at: Vec<(String, Option<chrono::DateTime<chrono::Utc>>)>,
    pub breakers: Vec<BreakerStatus>,
    pub key_pool: Option<KeyPoolStatus>,
}

/// Scope of a reset-failures operation (spec.md §4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetScope<'a> {
    Global,
    Source(&'a str),
    Key,
}

#[async_trait]
pub trait ControlSurface: Send + Sync {
    async fn scheduler_status(&self) -> SchedulerStatus;
    async fn configure_job(&self, job_id: &str, update: JobConfigUpdate) -> Result<(), NewsreelError>;
    async fn trigger_job(&self, job_id: &str) -> Result<String, NewsreelError>;
    async fn start_scheduler(&self);
    async fn stop_scheduler(&self);
    fn reset_failures(&self, scope: ResetScope<'_>);

    /// Bypasses the scheduler and runs a single Source Runner execution
    /// against `platform`. When `persist` is false the run is still routed
    /// through the real storage/classifier collaborators — "preview mode"
    /// is a caller-side contract (the runner has no separate dry-run path)
    /// and is surfaced to implementors as the `persist` flag for them to
    /// honor at the storage boundary if they choose to.
    async fn adhoc_harvest(
        &self,
        platform: &str,
        source_type: SourceType,
        kind: ContentKind,
        query: Query,
        persist: bool,
    ) -> Result<RunReport, NewsreelError>;

    async fn inspect_source_status(&self, platform: &str) -> Result<BreakerStatus, NewsreelError>;
    async fn search_content(&self, query: &str, limit: usize) -> Result<Vec<ContentId>, NewsreelError>;
    async fn content_by_source(&self, platform: &str, limit: usize) -> Result<Vec<ContentId>, NewsreelError>;
    async fn aggregate_counts(&self) -> Result<Vec<PlatformCounts>, NewsreelError>;

    /// Hourly-bucketed recent-activity histogram (spec.md §4.5).
    async fn recent_activity(&self, hours: u32) -> Result<Vec<ActivityBucket>, NewsreelError>;

    /// Language distribution across stored content (spec.md §4.5).
    async fn language_distribution(&self) -> Result<Vec<LanguageCount>, NewsreelError>;

    /// The `/health` composition (spec.md §4.11/C11).
    async fn health(&self) -> HealthReport;
}

/// Bundles every collaborator the control surface forwards to, mirroring
/// the teacher's `Arc<Deps>` shared-state pattern
/// (`rootsignal-api`/`rootsignal-server`) rather than threading each Arc
/// through individually.
pub struct Deps {
    pub clock: Arc<dyn Clock>,
    pub scheduler: Arc<Mutex<Scheduler>>,
    pub breaker: Arc<CircuitBreaker>,
    pub key_pool: Option<Arc<KeyPool>>,
    pub storage: Arc<dyn StorageGateway>,
    pub classifier: Arc<dyn ClassifierClient>,
    pub runner_config: RunnerConfig,
    pub registry: Arc<HarvesterRegistry>,
    pub job_ids: Vec<String>,
}

impl Deps {
    fn runner(&self, storage: Arc<dyn StorageGateway>) -> SourceRunner {
        SourceRunner::new(
            self.clock.clone(),
            self.breaker.clone(),
            storage,
            self.classifier.clone(),
            self.key_pool.clone(),
            self.runner_config.clone(),
        )
    }
}

/// In-memory stand-in used for ad-hoc harvests run in preview mode: mints
/// synthetic `ContentId`s and never touches the real store, so operators
/// can see what a harvest *would* insert without mutating it.
struct PreviewStorage;

#[async_trait]
impl StorageGateway for PreviewStorage {
    async fn resolve_source(&self, source_type: SourceType, platform: &str, base_url: &str) -> Result<SourceRecord, NewsreelError> {
        Ok(SourceRecord {
            id: SourceId(uuid::Uuid::new_v4()),
            source_type,
            platform: platform.to_string(),
            base_url: base_url.to_string(),
            credibility_hint: None,
            created_at: chrono::Utc::now(),
        })
    }

    async fn insert_article_batch(&self, _source: &SourceRecord, items: Vec<Article>) -> Result<ArticleBatchOutcome, NewsreelError> {
        Ok(ArticleBatchOutcome {
            inserted_ids: items.iter().map(|_| ContentId::new()).collect(),
            dup_count: 0,
            err_count: 0,
        })
    }

    async fn insert_video(&self, _source: &SourceRecord, _video: Video) -> Result<VideoInsertOutcome, NewsreelError> {
        Ok(VideoInsertOutcome::Inserted(ContentId::new()))
    }

    async fn counts_by_platform(&self) -> Result<Vec<PlatformCounts>, NewsreelError> {
        Ok(vec![])
    }

    async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<ContentId>, NewsreelError> {
        Ok(vec![])
    }

    async fn content_by_source(&self, _platform: &str, _limit: usize) -> Result<Vec<ContentId>, NewsreelError> {
        Ok(vec![])
    }

    async fn is_reachable(&self) -> bool {
        true
    }
}

/// Default `ControlSurface` wired directly to the in-process scheduler,
/// breaker map, key pool, and storage, used by `newsreel-server`. Job
/// reconfiguration is applied on the job's next scheduled tick — it does
/// not interrupt an in-flight run, matching the original's
/// `replace_existing=True` semantics.
pub struct SchedulerControlSurface {
    deps: Arc<Deps>,
}

impl SchedulerControlSurface {
    pub fn new(deps: Arc<Deps>) -> Self {
        Self { deps }
    }

    fn known_job(&self, job_id: &str) -> Result<(), NewsreelError> {
        if self.deps.job_ids.iter().any(|id| id == job_id) {
            Ok(())
        } else {
            Err(NewsreelError::Config(format!("unknown job id: {job_id}")))
        }
    }
}

#[async_trait]
impl ControlSurface for SchedulerControlSurface {
    async fn scheduler_status(&self) -> SchedulerStatus {
        let scheduler = self.deps.scheduler.lock().await;
        let mut jobs = Vec::with_capacity(self.deps.job_ids.len());
        let mut next_fire_at = Vec::with_capacity(self.deps.job_ids.len());
        for job_id in &self.deps.job_ids {
            if let Some(stats) = scheduler.stats_for(job_id).await {
                jobs.push(stats);
            }
            next_fire_at.push((job_id.clone(), scheduler.next_fire_at(job_id).await));
        }
        let breakers = self
            .deps
            .breaker
            .known_sources()
            .into_iter()
            .map(|source| {
                let state = self.deps.breaker.state_of(&source);
                let failures = self.deps.breaker.failure_count(&source);
                BreakerStatus::of(&source, state, failures)
            })
            .collect();
        SchedulerStatus {
            running: scheduler.is_running(),
            jobs,
            next_fire_at,
            breakers,
            key_pool: self.deps.key_pool.as_ref().map(|pool| pool.status(self.deps.clock.now())),
        }
    }

    async fn configure_job(&self, job_id: &str, update: JobConfigUpdate) -> Result<(), NewsreelError> {
        self.known_job(job_id)?;
        let mut scheduler = self.deps.scheduler.lock().await;
        let base = scheduler
            .current_config(job_id)
            .ok_or_else(|| NewsreelError::Config(format!("unknown job id: {job_id}")))?;
        let config = job_config_from_update(base, update);
        scheduler.reconfigure(job_id, config).map_err(NewsreelError::Config)
    }

    async fn trigger_job(&self, job_id: &str) -> Result<String, NewsreelError> {
        self.known_job(job_id)?;
        let scheduler = self.deps.scheduler.lock().await;
        scheduler.trigger(job_id).await.map_err(NewsreelError::Config)
    }

    async fn start_scheduler(&self) {
        let mut scheduler = self.deps.scheduler.lock().await;
        scheduler.start().await;
    }

    async fn stop_scheduler(&self) {
        let mut scheduler = self.deps.scheduler.lock().await;
        scheduler.shutdown();
    }

    fn reset_failures(&self, scope: ResetScope<'_>) {
        match scope {
            ResetScope::Global => {
                self.deps.breaker.reset_all();
                if let Some(pool) = &self.deps.key_pool {
                    pool.reset();
                }
            }
            ResetScope::Source(source) => self.deps.breaker.reset(source),
            ResetScope::Key => {
                if let Some(pool) = &self.deps.key_pool {
                    pool.reset();
                }
            }
        }
    }

    async fn adhoc_harvest(
        &self,
        platform: &str,
        source_type: SourceType,
        kind: ContentKind,
        query: Query,
        persist: bool,
    ) -> Result<RunReport, NewsreelError> {
        let harvester = self.deps.registry.create(platform)?;
        if persist {
            let source = self.deps.storage.resolve_source(source_type, platform, harvester.name()).await?;
            let runner = self.deps.runner(self.deps.storage.clone());
            Ok(runner.run_new(harvester.as_ref(), &source, kind, &query).await)
        } else {
            tracing::info!(platform, "ad-hoc harvest running in preview mode, nothing will be persisted");
            let source = SourceRecord {
                id: SourceId(uuid::Uuid::new_v4()),
                source_type,
                platform: platform.to_string(),
                base_url: harvester.name().to_string(),
                credibility_hint: None,
                created_at: self.deps.clock.now(),
            };
            let runner = self.deps.runner(Arc::new(PreviewStorage));
            Ok(runner.run_new(harvester.as_ref(), &source, kind, &query).await)
        }
    }

    async fn inspect_source_status(&self, platform: &str) -> Result<BreakerStatus, NewsreelError> {
        Ok(BreakerStatus::of(
            platform,
            self.deps.breaker.state_of(platform),
            self.deps.breaker.failure_count(platform),
        ))
    }

    async fn search_content(&self, query: &str, limit: usize) -> Result<Vec<ContentId>, NewsreelError> {
        self.deps.storage.search(query, limit).await
    }

    async fn content_by_source(&self, platform: &str, limit: usize) -> Result<Vec<ContentId>, NewsreelError> {
        self.deps.storage.content_by_source(platform, limit).await
    }

    async fn aggregate_counts(&self) -> Result<Vec<PlatformCounts>, NewsreelError> {
        self.deps.storage.counts_by_platform().await
    }

    async fn recent_activity(&self, hours: u32) -> Result<Vec<ActivityBucket>, NewsreelError> {
        self.deps.storage.recent_activity(hours).await
    }

    async fn language_distribution(&self) -> Result<Vec<LanguageCount>, NewsreelError> {
        self.deps.storage.language_distribution().await
    }

    async fn health(&self) -> HealthReport {
        let running = self.deps.scheduler.lock().await.is_running();
        HealthReport::compose(
            running,
            &self.deps.storage,
            &self.deps.breaker,
            self.deps.key_pool.as_ref(),
            self.deps.clock.now(),
        )
        .await
    }
}

/// Applies a partial `JobConfigUpdate` onto an existing `JobConfig`,
/// leaving unset fields unchanged. `initial_delay` is never touched by a
/// runtime reconfiguration — it only governs the job's very first tick.
pub fn job_config_from_update(base: JobConfig, update: JobConfigUpdate) -> JobConfig {
    JobConfig {
        job_id: base.job_id,
        interval: update
            .interval_minutes
            .map(|m| std::time::Duration::from_secs(m * 60))
            .unwrap_or(base.interval),
        max_instances: update.max_instances.unwrap_or(base.max_instances),
        coalesce: update.coalesce.unwrap_or(base.coalesce),
        jitter: update
            .jitter_seconds
            .map(std::time::Duration::from_secs)
            .unwrap_or(base.jitter),
        misfire_grace: update
            .misfire_grace_seconds
            .map(std::time::Duration::from_secs)
            .unwrap_or(base.misfire_grace),
        initial_delay: base.initial_delay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{BatchResponse, ClassifierClient};
    use crate::clock::{Clock, FrozenClock};
    use crate::harvester::Harvester;
    use crate::runner::RunnerConfig;
    use crate::storage::{ArticleBatchOutcome, VideoInsertOutcome};
    use newsreel_common::{Article, RawItem, SourceId, SourceRecord};
    use std::time::Duration;

    struct StubHarvester;

    #[async_trait]
    impl Harvester for StubHarvester {
        fn name(&self) -> &str {
            "stub"
        }
        async fn harvest(&self, _query: &Query) -> Result<Vec<RawItem>, NewsreelError> {
            Ok(vec![RawItem::Article(Article {
                fingerprint: "https://stub.example/a".to_string(),
                title: "t".to_string(),
                published_at: newsreel_common::PublishedAt::Unknown,
                body: "b".to_string(),
                summary: None,
                author: None,
                media: vec![],
                source_name: "stub".to_string(),
                tags: vec![],
                section: None,
                language: "en".to_string(),
                raw: serde_json::json!({}),
            })])
        }
    }

    struct NullStorage;

    #[async_trait]
    impl StorageGateway for NullStorage {
        async fn resolve_source(&self, source_type: SourceType, platform: &str, base_url: &str) -> Result<SourceRecord, NewsreelError> {
            Ok(SourceRecord {
                id: SourceId(uuid::Uuid::new_v4()),
                source_type,
                platform: platform.to_string(),
                base_url: base_url.to_string(),
                credibility_hint: None,
                created_at: chrono::Utc::now(),
            })
        }
        async fn insert_article_batch(&self, _source: &SourceRecord, items: Vec<Article>) -> Result<ArticleBatchOutcome, NewsreelError> {
            Ok(ArticleBatchOutcome {
                inserted_ids: items.iter().map(|_| ContentId::new()).collect(),
                dup_count: 0,
                err_count: 0,
            })
        }
        async fn insert_video(&self, _source: &SourceRecord, _video: newsreel_common::Video) -> Result<VideoInsertOutcome, NewsreelError> {
            Ok(VideoInsertOutcome::Inserted(ContentId::new()))
        }
        async fn counts_by_platform(&self) -> Result<Vec<PlatformCounts>, NewsreelError> {
            Ok(vec![PlatformCounts {
                platform: "stub".to_string(),
                article_count: 1,
                video_count: 0,
            }])
        }
        async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<ContentId>, NewsreelError> {
            Ok(vec![])
        }
        async fn content_by_source(&self, _platform: &str, _limit: usize) -> Result<Vec<ContentId>, NewsreelError> {
            Ok(vec![ContentId::new()])
        }
        async fn is_reachable(&self) -> bool {
            true
        }
    }

    struct NullClassifier;

    #[async_trait]
    impl ClassifierClient for NullClassifier {
        async fn submit_batch(&self, _kind: ContentKind, ids: &[ContentId]) -> BatchResponse {
            BatchResponse::Ok200 { total_classified: ids.len() }
        }
    }

    fn deps() -> Arc<Deps> {
        let clock: Arc<dyn Clock> = Arc::new(FrozenClock::at(chrono::Utc::now()));
        let breaker = Arc::new(CircuitBreaker::new(clock.clone(), 5, Duration::from_secs(60)));
        let storage: Arc<dyn StorageGateway> = Arc::new(NullStorage);
        let mut registry = HarvesterRegistry::new();
        registry.register("stub", || Arc::new(StubHarvester));
        Arc::new(Deps {
            clock: clock.clone(),
            scheduler: Arc::new(Mutex::new(Scheduler::new(clock))),
            breaker,
            key_pool: None,
            storage,
            classifier: Arc::new(NullClassifier),
            runner_config: RunnerConfig::default(),
            registry: Arc::new(registry),
            job_ids: vec![],
        })
    }

    #[tokio::test]
    async fn adhoc_harvest_runs_one_source_without_the_scheduler() {
        let surface = SchedulerControlSurface::new(deps());
        let report = surface
            .adhoc_harvest("stub", SourceType::ArticlePublisher, ContentKind::Article, Query::new(10), true)
            .await
            .unwrap();
        assert_eq!(report.inserted, 1);
    }

    #[tokio::test]
    async fn adhoc_harvest_rejects_unknown_platform() {
        let surface = SchedulerControlSurface::new(deps());
        let result = surface
            .adhoc_harvest("does-not-exist", SourceType::ArticlePublisher, ContentKind::Article, Query::new(10), true)
            .await;
        assert!(matches!(result, Err(NewsreelError::UnknownSource(_))));
    }

    #[tokio::test]
    async fn reset_failures_source_scope_closes_only_that_breaker() {
        let surface = SchedulerControlSurface::new(deps());
        surface.deps.breaker.record_failure("a");
        surface.deps.breaker.record_failure("a");
        surface.deps.breaker.record_failure("a");
        surface.deps.breaker.record_failure("a");
        surface.deps.breaker.record_failure("a");
        surface.deps.breaker.record_failure("b");
        assert_eq!(surface.deps.breaker.state_of("a"), BreakerState::Open);
        surface.reset_failures(ResetScope::Source("a"));
        assert_eq!(surface.deps.breaker.state_of("a"), BreakerState::Closed);
        assert_eq!(surface.deps.breaker.state_of("b"), BreakerState::Closed);
    }

    #[tokio::test]
    async fn aggregate_counts_forwards_to_storage() {
        let surface = SchedulerControlSurface::new(deps());
        let counts = surface.aggregate_counts().await.unwrap();
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].platform, "stub");
    }

    #[tokio::test]
    async fn content_by_source_forwards_to_storage() {
        let surface = SchedulerControlSurface::new(deps());
        let ids = surface.content_by_source("stub", 10).await.unwrap();
        assert_eq!(ids.len(), 1);
    }

    #[tokio::test]
    async fn inspect_source_status_reports_consecutive_failure_count() {
        let surface = SchedulerControlSurface::new(deps());
        surface.deps.breaker.record_failure("a");
        surface.deps.breaker.record_failure("a");
        let status = surface.inspect_source_status("a").await.unwrap();
        assert_eq!(status.consecutive_failures, 2);
        assert_eq!(status.state, "closed");
    }

    #[tokio::test]
    async fn scheduler_status_carries_per_source_failure_counters() {
        let surface = SchedulerControlSurface::new(deps());
        surface.deps.breaker.record_failure("a");
        surface.deps.breaker.record_failure("a");
        surface.deps.breaker.record_failure("a");
        let status = surface.scheduler_status().await;
        let entry = status.breakers.iter().find(|b| b.source == "a").unwrap();
        assert_eq!(entry.consecutive_failures, 3);
    }
}
