//! Batch coordinator, spec.md §4.8: fans a job out across its configured
//! sources with bounded concurrency.
//!
//! Grounded in the teacher's `ChromeScraper`'s
//! `Semaphore::new(MAX_CONCURRENT_CHROME)` pattern, generalized from a
//! fixed browser pool to an arbitrary bounded fan-out over source runners.

use crate::harvester::Harvester;
use crate::observability::CorrelationId;
use crate::runner::{RunReport, RunStatus, SourceRunner};
use newsreel_common::{ContentKind, Query, SourceRecord};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::warn;

pub struct SourceTask {
    pub source: SourceRecord,
    pub harvester: Arc<dyn Harvester>,
    pub kind: ContentKind,
    pub query: Query,
}

/// Aggregates every `RunReport` in a batch (spec.md §4.8). Entry order
/// matches the input order of `SourceTask`s, independent of which runner
/// happened to finish first.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct BatchSummary {
    pub reports: Vec<RunReport>,
    pub sources_processed: usize,
    pub sources_succeeded: usize,
    pub sources_failed: usize,
    pub total_scraped: usize,
    pub total_inserted: usize,
    pub total_classified: usize,
    pub total_classification_failed: usize,
}

impl BatchSummary {
    fn from_reports(reports: Vec<RunReport>) -> Self {
        let mut summary = BatchSummary {
            sources_processed: reports.len(),
            ..Default::default()
        };
        for report in &reports {
            if report.status == RunStatus::Success {
                summary.sources_succeeded += 1;
            } else {
                summary.sources_failed += 1;
            }
            summary.total_scraped += report.scraped;
            summary.total_inserted += report.inserted;
            summary.total_classified += report.classified;
            summary.total_classification_failed += report.classification_failed;
        }
        summary.reports = reports;
        summary
    }
}

/// Runs a batch of `SourceTask`s with at most `max_concurrent` running at
/// once. One source's failure never aborts the batch — each task's
/// outcome is collected independently (spec.md §4.8's isolation
/// invariant), and the parent's cancellation propagates to every
/// in-flight runner (spec.md §5).
pub struct BatchCoordinator {
    runner: Arc<SourceRunner>,
    max_concurrent: usize,
}

impl BatchCoordinator {
    pub fn new(runner: Arc<SourceRunner>, max_concurrent: usize) -> Self {
        Self { runner, max_concurrent }
    }

    /// Runs a batch under one freshly minted `CorrelationId` shared by
    /// every source task in it (spec.md §4.11: "minted once per job run"),
    /// so every line logged for this batch firing, across every source it
    /// fans out to, can be joined on the same token.
    pub async fn run_batch(&self, tasks: Vec<SourceTask>) -> BatchSummary {
        let correlation_id = CorrelationId::new();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent.max(1)));
        let mut handles = Vec::with_capacity(tasks.len());

        for (index, task) in tasks.into_iter().enumerate() {
            let semaphore = semaphore.clone();
            let runner = self.runner.clone();
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                let report = runner.run(task.harvester.as_ref(), &task.source, task.kind, &task.query, correlation_id).await;
                (index, report)
            }));
        }

        let mut indexed = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok((index, report)) => indexed.push((index, report)),
                Err(join_err) => {
                    warn!(error = %join_err, "source task panicked");
                }
            }
        }
        indexed.sort_by_key(|(index, _)| *index);
        let reports: Vec<RunReport> = indexed.into_iter().map(|(_, report)| report).collect();

        BatchSummary::from_reports(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breaker::CircuitBreaker;
    use crate::classifier::{BatchResponse, ClassifierClient};
    use crate::clock::{Clock, FrozenClock};
    use crate::runner::RunnerConfig;
    use crate::storage::{ArticleBatchOutcome, PlatformCounts, StorageGateway, VideoInsertOutcome};
    use async_trait::async_trait;
    use newsreel_common::{Article, ContentId, NewsreelError, PublishedAt, RawItem, SourceId, SourceType, Video};
    use std::time::Duration;

    struct AlwaysOkHarvester;

    #[async_trait]
    impl Harvester for AlwaysOkHarvester {
        fn name(&self) -> &str {
            "ok"
        }
        async fn harvest(&self, _query: &Query) -> Result<Vec<RawItem>, NewsreelError> {
            Ok(vec![])
        }
    }

    struct AlwaysFailsHarvester;

    #[async_trait]
    impl Harvester for AlwaysFailsHarvester {
        fn name(&self) -> &str {
            "bad"
        }
        async fn harvest(&self, _query: &Query) -> Result<Vec<RawItem>, NewsreelError> {
            Err(NewsreelError::UpstreamPermanent {
                source: "bad".to_string(),
                message: "gone".to_string(),
            })
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

    struct NullClassifier;

    #[async_trait]
    impl ClassifierClient for NullClassifier {
        async fn submit_batch(&self, _kind: ContentKind, ids: &[ContentId]) -> BatchResponse {
            BatchResponse::Ok200 { total_classified: ids.len() }
        }
    }

    fn source(platform: &str) -> SourceRecord {
        SourceRecord {
            id: SourceId(uuid::Uuid::new_v4()),
            source_type: SourceType::ArticlePublisher,
            platform: platform.to_string(),
            base_url: format!("https://{platform}.example"),
            credibility_hint: None,
            created_at: chrono::Utc::now(),
        }
    }

    fn coordinator(max_concurrent: usize) -> BatchCoordinator {
        let clock: Arc<dyn Clock> = Arc::new(FrozenClock::at(chrono::Utc::now()));
        let breaker = Arc::new(CircuitBreaker::new(clock.clone(), 5, Duration::from_secs(60)));
        let runner = Arc::new(SourceRunner::new(
            clock,
            breaker,
            Arc::new(NullStorage),
            Arc::new(NullClassifier),
            None,
            RunnerConfig {
                max_attempts: 1,
                backoff_base: Duration::from_millis(1),
                backoff_factor: 2.0,
                backoff_cap: Duration::from_millis(1),
                page_timeout: Duration::from_secs(5),
                source_timeout: Duration::from_secs(30),
            },
        ));
        BatchCoordinator::new(runner, max_concurrent)
    }

    #[tokio::test]
    async fn one_failing_source_does_not_abort_the_batch() {
        let coordinator = coordinator(2);

        let tasks = vec![
            SourceTask {
                source: source("ok"),
                harvester: Arc::new(AlwaysOkHarvester),
                kind: ContentKind::Article,
                query: Query::new(10),
            },
            SourceTask {
                source: source("bad"),
                harvester: Arc::new(AlwaysFailsHarvester),
                kind: ContentKind::Article,
                query: Query::new(10),
            },
        ];

        let summary = coordinator.run_batch(tasks).await;
        assert_eq!(summary.sources_processed, 2);
        assert_eq!(summary.sources_succeeded, 1);
        assert_eq!(summary.sources_failed, 1);
    }

    #[tokio::test]
    async fn summary_preserves_input_order_regardless_of_completion_order() {
        let coordinator = coordinator(4);
        let tasks = vec![
            SourceTask {
                source: source("a"),
                harvester: Arc::new(AlwaysOkHarvester),
                kind: ContentKind::Article,
                query: Query::new(10),
            },
            SourceTask {
                source: source("b"),
                harvester: Arc::new(AlwaysFailsHarvester),
                kind: ContentKind::Article,
                query: Query::new(10),
            },
            SourceTask {
                source: source("c"),
                harvester: Arc::new(AlwaysOkHarvester),
                kind: ContentKind::Article,
                query: Query::new(10),
            },
        ];
        let summary = coordinator.run_batch(tasks).await;
        let sources: Vec<&str> = summary.reports.iter().map(|r| r.source.as_str()).collect();
        assert_eq!(sources, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn batch_respects_the_concurrency_semaphore() {
        // Exercises the bound indirectly: with a semaphore of 1, eight
        // sources should still all complete and be reported, just serially.
        let coordinator = coordinator(1);
        let tasks: Vec<SourceTask> = (0..8)
            .map(|i| SourceTask {
                source: source(&format!("s{i}")),
                harvester: Arc::new(AlwaysOkHarvester),
                kind: ContentKind::Article,
                query: Query::new(10),
            })
            .collect();
        let summary = coordinator.run_batch(tasks).await;
        assert_eq!(summary.sources_processed, 8);
        assert_eq!(summary.sources_succeeded, 8);
    }
}
