//! Source runner, spec.md §4.7: paginate → collect → normalize → store →
//! classify for a single source, gated by the source's circuit breaker and
//! (when the adapter needs one) a key-pool credential.
//!
//! Grounded in the teacher's `ChromeScraper::scrape` retry loop
//! (`rootsignal-scout/src/pipeline/scraper.rs`): bounded attempts,
//! exponential-with-jitter backoff between attempts, a hard per-attempt
//! timeout. The overall per-source deadline and pagination shape follow
//! `services/news_service.py::scrape_outlet`'s `asyncio.wait_for` wrapper
//! in `examples/original_source`.

use crate::breaker::CircuitBreaker;
use crate::classifier::{self, ClassifierClient};
use crate::clock::{backoff_delay, Clock};
use crate::harvester::Harvester;
use crate::keypool::{KeyEntry, KeyPool, KeyResult};
use crate::observability::CorrelationId;
use crate::storage::StorageGateway;
use newsreel_common::fingerprint;
use newsreel_common::{Article, ContentId, ContentKind, FeatureFlags, NewsreelError, Query, RawItem, SourceRecord, Video};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Total attempts per page request, including the first: a value of 3
    /// means up to 2 retries after the initial attempt.
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub backoff_factor: f64,
    pub backoff_cap: Duration,
    /// Per-page-request timeout.
    pub page_timeout: Duration,
    /// Overall deadline for the whole run, derived from the job's timeout
    /// configuration (spec.md §4.7 step 3).
    pub source_timeout: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_secs(3),
            backoff_factor: 3.0,
            backoff_cap: Duration::from_secs(60),
            page_timeout: Duration::from_secs(30),
            source_timeout: Duration::from_secs(180),
        }
    }
}

/// Sub-reasons for a video skipped by policy before storage (spec.md §4.7
/// step 6), tallied separately per spec.md §8 scenario S6.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySkipCounts {
    pub duration_too_short: usize,
    pub duration_too_long: usize,
    pub no_english_transcript: usize,
}

impl PolicySkipCounts {
    pub fn total(&self) -> usize {
        self.duration_too_short + self.duration_too_long + self.no_english_transcript
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Error,
    Timeout,
    CircuitOpen,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Success => write!(f, "success"),
            RunStatus::Error => write!(f, "error"),
            RunStatus::Timeout => write!(f, "timeout"),
            RunStatus::CircuitOpen => write!(f, "circuit_open"),
        }
    }
}

/// One end-to-end acquisition of a single source (spec.md §4.7).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub source: String,
    pub scraped: usize,
    pub deduped: usize,
    pub inserted: usize,
    pub duplicates_skipped: usize,
    pub policy_skipped: PolicySkipCounts,
    pub errors: usize,
    pub classified: usize,
    pub classification_failed: usize,
    pub status: RunStatus,
    pub error_message: Option<String>,
}

impl RunReport {
    fn errored(source: &str, status: RunStatus, error_message: Option<String>) -> Self {
        Self {
            source: source.to_string(),
            scraped: 0,
            deduped: 0,
            inserted: 0,
            duplicates_skipped: 0,
            policy_skipped: PolicySkipCounts::default(),
            errors: 1,
            classified: 0,
            classification_failed: 0,
            status,
            error_message,
        }
    }
}

enum PaginationFailure {
    Timeout,
    Error(NewsreelError),
}

/// Drives one source through harvest → dedupe → store → classify,
/// respecting the source's circuit breaker, an optional key-pool
/// credential, and retrying transient harvester failures with jittered
/// backoff (spec.md §4.7, §9 "decorator-based retry becomes a
/// Runner-owned backoff loop").
pub struct SourceRunner {
    clock: Arc<dyn Clock>,
    breaker: Arc<CircuitBreaker>,
    storage: Arc<dyn StorageGateway>,
    classifier: Arc<dyn ClassifierClient>,
    key_pool: Option<Arc<KeyPool>>,
    config: RunnerConfig,
}

impl SourceRunner {
    pub fn new(
        clock: Arc<dyn Clock>,
        breaker: Arc<CircuitBreaker>,
        storage: Arc<dyn StorageGateway>,
        classifier: Arc<dyn ClassifierClient>,
        key_pool: Option<Arc<KeyPool>>,
        config: RunnerConfig,
    ) -> Self {
        Self {
            clock,
            breaker,
            storage,
            classifier,
            key_pool,
            config,
        }
    }

    /// Runs one source end to end under a fresh per-run `CorrelationId`
    /// (spec.md §4.11: "minted once per job run"), equivalent to calling
    /// `run` directly with a newly generated ID.
    pub async fn run_new(&self, harvester: &dyn Harvester, source: &SourceRecord, kind: ContentKind, query: &Query) -> RunReport {
        self.run(harvester, source, kind, query, CorrelationId::new()).await
    }

    #[instrument(
        skip(self, harvester, source, query),
        fields(source = %source.platform, correlation_id = %correlation_id)
    )]
    pub async fn run(
        &self,
        harvester: &dyn Harvester,
        source: &SourceRecord,
        kind: ContentKind,
        query: &Query,
        correlation_id: CorrelationId,
    ) -> RunReport {
        let name = harvester.name().to_string();

        if !self.breaker.is_call_permitted(&name) {
            return RunReport::errored(&source.platform, RunStatus::CircuitOpen, None);
        }

        let key = if harvester.requires_credential() {
            match self.key_pool.as_ref().and_then(|pool| pool.acquire(self.clock.now())) {
                Some(key) => Some(key),
                None => {
                    self.breaker.record_failure(&name);
                    return RunReport::errored(
                        &source.platform,
                        RunStatus::Error,
                        Some("all keys exhausted".to_string()),
                    );
                }
            }
        } else {
            None
        };

        let deadline = self.clock.monotonic_now() + self.config.source_timeout;
        let collected = self.paginate(harvester, query, deadline).await;

        let report = match collected {
            Ok(items) => {
                let mut report = self.store_and_classify(source, kind, &query.features, items).await;
                report.source = source.platform.clone();
                self.breaker.record_success(&name);
                if let Some(key) = &key {
                    self.key_pool_record(key, KeyResult::Success, None);
                }
                report
            }
            Err(PaginationFailure::Timeout) => {
                self.breaker.record_failure(&name);
                if let Some(key) = &key {
                    self.key_pool_record(key, KeyResult::OtherFailure, Some("timeout".to_string()));
                }
                RunReport::errored(
                    &source.platform,
                    RunStatus::Timeout,
                    Some("per-source deadline exceeded".to_string()),
                )
            }
            Err(PaginationFailure::Error(err)) => {
                self.breaker.record_failure(&name);
                if let Some(key) = &key {
                    let result = if matches!(err, NewsreelError::QuotaExhausted { .. }) {
                        KeyResult::QuotaExceeded
                    } else {
                        KeyResult::OtherFailure
                    };
                    self.key_pool_record(key, result, Some(err.to_string()));
                }
                RunReport::errored(&source.platform, RunStatus::Error, Some(err.to_string()))
            }
        };

        info!(
            status = %report.status,
            scraped = report.scraped,
            inserted = report.inserted,
            duplicates_skipped = report.duplicates_skipped,
            policy_skipped = report.policy_skipped.total(),
            classified = report.classified,
            "run complete"
        );
        report
    }

    fn key_pool_record(&self, key: &KeyEntry, result: KeyResult, error: Option<String>) {
        if let Some(pool) = &self.key_pool {
            pool.record_result(&key.key, result, error);
        }
    }

    /// Repeatedly calls the harvester with increasing page numbers until
    /// either the cumulative count reaches `query.limit`, or a page
    /// returns zero items (treated unambiguously as end-of-results, per
    /// spec.md §9's first Open Question). Each page is bounded by
    /// `page_timeout`; the whole loop is bounded by `deadline`.
    async fn paginate(
        &self,
        harvester: &dyn Harvester,
        query: &Query,
        deadline: Instant,
    ) -> Result<Vec<RawItem>, PaginationFailure> {
        let mut collected = Vec::new();
        let mut page = query.page.max(1);

        loop {
            if self.clock.monotonic_now() >= deadline {
                return Err(PaginationFailure::Timeout);
            }

            let page_query = query.at_page(page);
            let remaining = deadline.saturating_duration_since(self.clock.monotonic_now());
            let per_page_budget = remaining.min(self.config.page_timeout);

            let items = self
                .harvest_page_with_retry(harvester, &page_query, per_page_budget)
                .await
                .map_err(PaginationFailure::Error)?;

            if items.is_empty() {
                break;
            }

            collected.extend(items);
            page += 1;

            if collected.len() >= query.limit {
                break;
            }
        }

        if collected.len() > query.limit {
            collected.truncate(query.limit);
        }
        Ok(collected)
    }

    async fn harvest_page_with_retry(
        &self,
        harvester: &dyn Harvester,
        query: &Query,
        budget: Duration,
    ) -> Result<Vec<RawItem>, NewsreelError> {
        let mut attempt = 0;
        loop {
            let call = tokio::time::timeout(budget.min(self.config.page_timeout), harvester.harvest(query));
            let outcome = match call.await {
                Ok(result) => result,
                Err(_) => Err(NewsreelError::Timeout(self.config.page_timeout)),
            };

            match outcome {
                Ok(items) => return Ok(items),
                Err(err) => {
                    attempt += 1;
                    if !err.is_retryable() || attempt >= self.config.max_attempts {
                        warn!(source = harvester.name(), attempt, error = %err, "harvest failed, giving up");
                        return Err(err);
                    }
                    let delay = backoff_delay(
                        attempt - 1,
                        self.config.backoff_base,
                        self.config.backoff_factor,
                        self.config.backoff_cap,
                        true,
                    );
                    warn!(source = harvester.name(), attempt, delay_ms = delay.as_millis() as u64, error = %err, "harvest attempt failed, retrying");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn store_and_classify(
        &self,
        source: &SourceRecord,
        kind: ContentKind,
        features: &FeatureFlags,
        items: Vec<RawItem>,
    ) -> RunReport {
        let scraped = items.len();
        let items = normalize_article_fingerprints(items);
        let deduped = dedupe_by_fingerprint(items);

        let mut report = RunReport {
            source: source.platform.clone(),
            scraped,
            deduped: deduped.len(),
            inserted: 0,
            duplicates_skipped: 0,
            policy_skipped: PolicySkipCounts::default(),
            errors: 0,
            classified: 0,
            classification_failed: 0,
            status: RunStatus::Success,
            error_message: None,
        };

        let inserted_ids = match kind {
            ContentKind::Article => self.store_articles(source, &mut report, deduped).await,
            ContentKind::Video => self.store_videos(source, &mut report, features, deduped).await,
        };

        if !inserted_ids.is_empty() {
            let summary = classifier::dispatch(self.classifier.as_ref(), kind, &inserted_ids).await;
            report.classified = summary.total_classified;
            report.classification_failed = summary.failed;
        }

        if report.errors > 0 && report.inserted == 0 {
            report.status = RunStatus::Error;
            report.error_message = Some("all items in batch failed to store".to_string());
        }

        report
    }

    /// Batch storage path for articles (spec.md §4.7 step 5): one call,
    /// duplicates and errors tallied by the gateway rather than per item.
    async fn store_articles(&self, source: &SourceRecord, report: &mut RunReport, items: Vec<RawItem>) -> Vec<ContentId> {
        let articles: Vec<Article> = items
            .into_iter()
            .filter_map(|item| match item {
                RawItem::Article(a) => Some(a),
                RawItem::Video(_) => None,
            })
            .collect();

        if articles.is_empty() {
            return Vec::new();
        }

        match self.storage.insert_article_batch(source, articles).await {
            Ok(outcome) => {
                report.inserted = outcome.inserted_ids.len();
                report.duplicates_skipped = outcome.dup_count;
                report.errors += outcome.err_count;
                outcome.inserted_ids
            }
            Err(err) => {
                warn!(error = %err, "article batch insert failed");
                report.errors += 1;
                Vec::new()
            }
        }
    }

    /// Item-by-item storage path for videos (spec.md §4.7 step 5-7):
    /// policy filters run before each insert so that duplicates, skips,
    /// and errors are each tallied exactly once per item.
    async fn store_videos(
        &self,
        source: &SourceRecord,
        report: &mut RunReport,
        features: &FeatureFlags,
        items: Vec<RawItem>,
    ) -> Vec<ContentId> {
        let mut inserted_ids = Vec::new();

        for item in items {
            let RawItem::Video(video) = item else { continue };

            match video_policy_skip(&video, features) {
                Some(PolicySkipField::TooShort) => {
                    report.policy_skipped.duration_too_short += 1;
                    continue;
                }
                Some(PolicySkipField::TooLong) => {
                    report.policy_skipped.duration_too_long += 1;
                    continue;
                }
                Some(PolicySkipField::NoEnglishTranscript) => {
                    report.policy_skipped.no_english_transcript += 1;
                    continue;
                }
                None => {}
            }

            match self.storage.insert_video(source, video).await {
                Ok(crate::storage::VideoInsertOutcome::Inserted(id)) => {
                    report.inserted += 1;
                    inserted_ids.push(id);
                }
                Ok(crate::storage::VideoInsertOutcome::Duplicate) => {
                    report.duplicates_skipped += 1;
                }
                Ok(crate::storage::VideoInsertOutcome::Error(msg)) => {
                    warn!(error = %msg, "video insert failed");
                    report.errors += 1;
                }
                Err(err) => {
                    warn!(error = %err, "video insert failed");
                    report.errors += 1;
                }
            }
        }

        inserted_ids
    }
}

/// Rewrites each article's fingerprint through `canonicalize_url` before
/// dedupe and storage (spec.md §3: the fingerprint is the canonical URL,
/// lowercase scheme/host, post-normalization). Per-publisher adapters are
/// out of scope and hand back whatever URL string they scraped verbatim,
/// so the core is the only place this normalization can happen. Videos
/// are untouched — their identity is the upstream-assigned video ID, not
/// a URL.
fn normalize_article_fingerprints(items: Vec<RawItem>) -> Vec<RawItem> {
    items
        .into_iter()
        .map(|item| match item {
            RawItem::Article(mut article) => {
                article.fingerprint = fingerprint::canonicalize_url(&article.fingerprint);
                RawItem::Article(article)
            }
            other => other,
        })
        .collect()
}

/// Deduplicates by fingerprint, keeping the first occurrence (spec.md
/// §4.7 step 4, §8 invariant "Fingerprint uniqueness").
fn dedupe_by_fingerprint(items: Vec<RawItem>) -> Vec<RawItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.fingerprint().to_string()))
        .collect()
}

enum PolicySkipField {
    TooShort,
    TooLong,
    NoEnglishTranscript,
}

/// Whether `video` fails a per-run policy filter (spec.md §4.7 step 6):
/// duration bounds and, when transcripts were requested, the
/// required-English-transcript rule.
fn video_policy_skip(video: &Video, features: &FeatureFlags) -> Option<PolicySkipField> {
    if let Some(min) = features.min_duration_seconds {
        if video.duration_seconds < min {
            return Some(PolicySkipField::TooShort);
        }
    }
    if let Some(max) = features.max_duration_seconds {
        if video.duration_seconds > max {
            return Some(PolicySkipField::TooLong);
        }
    }
    if features.include_transcripts && !video.has_english_transcript() {
        return Some(PolicySkipField::NoEnglishTranscript);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FrozenClock;
    use crate::classifier::BatchResponse;
    use crate::storage::{ArticleBatchOutcome, PlatformCounts, VideoInsertOutcome};
    use async_trait::async_trait;
    use newsreel_common::{ChannelRef, MediaKind, MediaRef, PublishedAt, SourceId, SourceType};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn article(fingerprint: &str) -> Article {
        Article {
            fingerprint: fingerprint.to_string(),
            title: "title".to_string(),
            published_at: PublishedAt::Unknown,
            body: "body".to_string(),
            summary: None,
            author: None,
            media: vec![MediaRef {
                url: "https://example.com/img.png".to_string(),
                caption: None,
                kind: MediaKind::Image,
            }],
            source_name: "demo".to_string(),
            tags: vec![],
            section: None,
            language: "en".to_string(),
            raw: serde_json::json!({}),
        }
    }

    fn video(id: &str, duration_seconds: u32, has_transcript: bool) -> Video {
        Video {
            external_video_id: id.to_string(),
            title: "title".to_string(),
            description: "desc".to_string(),
            channel: ChannelRef {
                channel_id: "c1".to_string(),
                channel_handle: "@c1".to_string(),
                channel_title: "Channel".to_string(),
            },
            published_at: PublishedAt::Unknown,
            thumbnail_url: None,
            duration_seconds,
            view_count: 0,
            like_count: 0,
            comment_count: 0,
            tags: vec![],
            language: None,
            comments: vec![],
            english_transcript: if has_transcript { Some("hello".to_string()) } else { None },
            bengali_transcript: None,
            transcript_languages: vec![],
            raw: serde_json::json!({}),
        }
    }

    struct ScriptedHarvester {
        name: String,
        pages: Mutex<Vec<Result<Vec<RawItem>, NewsreelError>>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Harvester for ScriptedHarvester {
        fn name(&self) -> &str {
            &self.name
        }
        async fn harvest(&self, _query: &Query) -> Result<Vec<RawItem>, NewsreelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut pages = self.pages.lock().unwrap();
            if pages.is_empty() {
                Ok(vec![])
            } else {
                pages.remove(0)
            }
        }
    }

    struct RecordingStorage {
        inserted_articles: Mutex<Vec<Article>>,
        known_fingerprints: Mutex<HashSet<String>>,
    }

    impl RecordingStorage {
        fn new() -> Self {
            Self {
                inserted_articles: Mutex::new(Vec::new()),
                known_fingerprints: Mutex::new(HashSet::new()),
            }
        }
    }

    #[async_trait]
    impl StorageGateway for RecordingStorage {
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
            let mut known = self.known_fingerprints.lock().unwrap();
            let mut outcome = ArticleBatchOutcome::default();
            for item in items {
                if known.contains(&item.fingerprint) {
                    outcome.dup_count += 1;
                } else {
                    known.insert(item.fingerprint.clone());
                    self.inserted_articles.lock().unwrap().push(item);
                    outcome.inserted_ids.push(ContentId::new());
                }
            }
            Ok(outcome)
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

    struct AllOkClassifier;

    #[async_trait]
    impl ClassifierClient for AllOkClassifier {
        async fn submit_batch(&self, _kind: ContentKind, ids: &[ContentId]) -> BatchResponse {
            BatchResponse::Ok200 { total_classified: ids.len() }
        }
    }

    fn source() -> SourceRecord {
        SourceRecord {
            id: SourceId(uuid::Uuid::new_v4()),
            source_type: SourceType::ArticlePublisher,
            platform: "demo".to_string(),
            base_url: "https://demo.example".to_string(),
            credibility_hint: None,
            created_at: chrono::Utc::now(),
        }
    }

    fn runner(storage: Arc<dyn StorageGateway>) -> SourceRunner {
        let clock: Arc<dyn Clock> = Arc::new(FrozenClock::at(chrono::Utc::now()));
        let breaker = Arc::new(CircuitBreaker::new(clock.clone(), 5, Duration::from_secs(60)));
        SourceRunner::new(
            clock,
            breaker,
            storage,
            Arc::new(AllOkClassifier),
            None,
            RunnerConfig {
                max_attempts: 3,
                backoff_base: Duration::from_millis(1),
                backoff_factor: 2.0,
                backoff_cap: Duration::from_millis(5),
                page_timeout: Duration::from_secs(5),
                source_timeout: Duration::from_secs(30),
            },
        )
    }

    /// Scenario S1: three distinct articles ingest cleanly; re-running
    /// immediately reports them all as duplicates.
    #[tokio::test]
    async fn s1_article_happy_path_then_all_duplicates_on_rerun() {
        let storage = Arc::new(RecordingStorage::new());
        let runner = runner(storage.clone());
        let harvester = ScriptedHarvester {
            name: "demo".to_string(),
            pages: Mutex::new(vec![Ok(vec![
                RawItem::Article(article("https://demo.example/a")),
                RawItem::Article(article("https://demo.example/b")),
                RawItem::Article(article("https://demo.example/c")),
            ])]),
            calls: AtomicUsize::new(0),
        };
        let src = source();

        let report = runner.run_new(&harvester, &src, ContentKind::Article, &Query::new(10)).await;
        assert_eq!(report.scraped, 3);
        assert_eq!(report.inserted, 3);
        assert_eq!(report.duplicates_skipped, 0);
        assert_eq!(report.errors, 0);
        assert_eq!(report.status, RunStatus::Success);
        assert_eq!(report.classified, 3);

        let harvester2 = ScriptedHarvester {
            name: "demo".to_string(),
            pages: Mutex::new(vec![Ok(vec![
                RawItem::Article(article("https://demo.example/a")),
                RawItem::Article(article("https://demo.example/b")),
                RawItem::Article(article("https://demo.example/c")),
            ])]),
            calls: AtomicUsize::new(0),
        };
        let report2 = runner.run_new(&harvester2, &src, ContentKind::Article, &Query::new(10)).await;
        assert_eq!(report2.scraped, 3);
        assert_eq!(report2.inserted, 0);
        assert_eq!(report2.duplicates_skipped, 3);
    }

    /// Scenario S2: adapter returns A, A, B — one A dropped pre-storage.
    #[tokio::test]
    async fn s2_dedupes_within_a_single_run() {
        let storage = Arc::new(RecordingStorage::new());
        let runner = runner(storage);
        let harvester = ScriptedHarvester {
            name: "demo".to_string(),
            pages: Mutex::new(vec![Ok(vec![
                RawItem::Article(article("https://demo.example/a")),
                RawItem::Article(article("https://demo.example/a")),
                RawItem::Article(article("https://demo.example/b")),
            ])]),
            calls: AtomicUsize::new(0),
        };
        let report = runner.run_new(&harvester, &source(), ContentKind::Article, &Query::new(10)).await;
        assert_eq!(report.scraped, 3);
        assert_eq!(report.deduped, 2);
        assert_eq!(report.inserted, 2);
    }

    /// Two adapter-supplied URLs differing only by case and a trailing
    /// slash canonicalize to the same fingerprint, so they dedupe within
    /// the run even though the adapter reported them as distinct strings
    /// (spec.md §8 invariant 1).
    #[tokio::test]
    async fn canonicalizes_article_urls_before_dedupe() {
        let storage = Arc::new(RecordingStorage::new());
        let runner = runner(storage);
        let harvester = ScriptedHarvester {
            name: "demo".to_string(),
            pages: Mutex::new(vec![Ok(vec![
                RawItem::Article(article("https://Demo.Example/Story/42/")),
                RawItem::Article(article("https://demo.example/Story/42")),
            ])]),
            calls: AtomicUsize::new(0),
        };
        let report = runner.run_new(&harvester, &source(), ContentKind::Article, &Query::new(10)).await;
        assert_eq!(report.scraped, 2);
        assert_eq!(report.deduped, 1);
        assert_eq!(report.inserted, 1);
    }

    #[tokio::test]
    async fn refuses_to_call_when_breaker_is_open() {
        let storage = Arc::new(RecordingStorage::new());
        let runner = runner(storage);
        for _ in 0..5 {
            runner.breaker.record_failure("blocked");
        }
        let harvester = ScriptedHarvester {
            name: "blocked".to_string(),
            pages: Mutex::new(vec![]),
            calls: AtomicUsize::new(0),
        };
        let report = runner.run_new(&harvester, &source(), ContentKind::Article, &Query::new(10)).await;
        assert_eq!(report.status, RunStatus::CircuitOpen);
        assert_eq!(harvester.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn retries_transient_failures_and_eventually_succeeds() {
        let storage = Arc::new(RecordingStorage::new());
        let runner = runner(storage);
        let harvester = ScriptedHarvester {
            name: "flaky".to_string(),
            pages: Mutex::new(vec![
                Err(NewsreelError::UpstreamTransient { source: "flaky".to_string(), message: "rate limited".to_string() }),
                Ok(vec![RawItem::Article(article("https://flaky.example/a"))]),
            ]),
            calls: AtomicUsize::new(0),
        };
        let report = runner.run_new(&harvester, &source(), ContentKind::Article, &Query::new(10)).await;
        assert_eq!(report.status, RunStatus::Success);
        assert_eq!(report.inserted, 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts_on_permanent_error() {
        let storage = Arc::new(RecordingStorage::new());
        let runner = runner(storage);
        let harvester = ScriptedHarvester {
            name: "down".to_string(),
            pages: Mutex::new(vec![Err(NewsreelError::UpstreamPermanent {
                source: "down".to_string(),
                message: "gone".to_string(),
            })]),
            calls: AtomicUsize::new(0),
        };
        let report = runner.run_new(&harvester, &source(), ContentKind::Article, &Query::new(10)).await;
        assert_eq!(report.status, RunStatus::Error);
        assert_eq!(harvester.calls.load(Ordering::SeqCst), 1);
    }

    /// Scenario S6: duration bounds and required-transcript policy skips.
    #[tokio::test]
    async fn s6_policy_skips_duration_and_missing_transcript() {
        let storage = Arc::new(RecordingStorage::new());
        let runner = runner(storage);
        let harvester = ScriptedHarvester {
            name: "yt".to_string(),
            pages: Mutex::new(vec![Ok(vec![
                RawItem::Video(video("v1", 10, true)),
                RawItem::Video(video("v2", 120, true)),
                RawItem::Video(video("v3", 120, false)),
            ])]),
            calls: AtomicUsize::new(0),
        };
        let mut query = Query::new(10);
        query.features.min_duration_seconds = Some(15);
        query.features.include_transcripts = true;

        let report = runner.run_new(&harvester, &source(), ContentKind::Video, &query).await;
        assert_eq!(report.policy_skipped.duration_too_short, 1);
        assert_eq!(report.policy_skipped.no_english_transcript, 1);
        assert_eq!(report.inserted, 1);
    }

    /// A caller-supplied `CorrelationId` (as the Batch Coordinator passes
    /// one shared across a whole batch) drives `run` the same way a freshly
    /// minted one does — the ID only labels the run's span, it never
    /// changes behavior.
    #[tokio::test]
    async fn explicit_correlation_id_does_not_change_run_behavior() {
        let storage = Arc::new(RecordingStorage::new());
        let runner = runner(storage);
        let harvester = ScriptedHarvester {
            name: "demo".to_string(),
            pages: Mutex::new(vec![Ok(vec![RawItem::Article(article("https://demo.example/a"))])]),
            calls: AtomicUsize::new(0),
        };
        let shared_id = CorrelationId::new();
        let report = runner.run(&harvester, &source(), ContentKind::Article, &Query::new(10), shared_id).await;
        assert_eq!(report.inserted, 1);
        assert_eq!(report.status, RunStatus::Success);
    }
}
