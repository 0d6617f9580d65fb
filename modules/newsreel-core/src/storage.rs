//! Storage gateway contract, spec.md §4.5.
//!
//! The concrete Postgres implementation lives in `newsreel-storage`; this
//! crate only defines the seam, grounded in the teacher's `SignalStore`
//! trait (`rootsignal-scout/src/pipeline/traits.rs`) paired with its
//! `impl SignalStore for rootsignal_graph::GraphWriter`.

use async_trait::async_trait;
use newsreel_common::{Article, ContentId, NewsreelError, SourceRecord, SourceType, Video};
use serde::Serialize;

/// Outcome of `insertArticleBatch`: for each item, a fingerprint already
/// on file increments `dup_count` and produces no ID; otherwise the item
/// is inserted and its new ID appended. Per-item errors are tallied, not
/// propagated — one bad item must not fail the whole batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleBatchOutcome {
    pub inserted_ids: Vec<ContentId>,
    pub dup_count: usize,
    pub err_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoInsertOutcome {
    Inserted(ContentId),
    Duplicate,
    Error(String),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PlatformCounts {
    pub platform: String,
    pub article_count: u64,
    pub video_count: u64,
}

/// One hour-wide bucket of the recent-activity histogram (spec.md §4.5).
#[derive(Debug, Clone, Default, Serialize)]
pub struct ActivityBucket {
    pub hour_start: chrono::DateTime<chrono::Utc>,
    pub article_count: u64,
    pub video_count: u64,
}

/// One row of the language-distribution breakdown (spec.md §4.5), counted
/// across both articles and videos that carry a `language` field.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LanguageCount {
    pub language: String,
    pub count: u64,
}

#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// Idempotently resolves (or creates) the source row for
    /// `(source_type, platform)`. Safe to call repeatedly with the same
    /// arguments; always returns the same `SourceRecord.id`.
    async fn resolve_source(
        &self,
        source_type: SourceType,
        platform: &str,
        base_url: &str,
    ) -> Result<SourceRecord, NewsreelError>;

    /// Inserts a batch of articles against `source`, deduplicating on
    /// fingerprint (canonical URL). A transactional boundary per batch is
    /// permitted but not required; at-most-once per fingerprint is.
    async fn insert_article_batch(
        &self,
        source: &SourceRecord,
        items: Vec<Article>,
    ) -> Result<ArticleBatchOutcome, NewsreelError>;

    /// Inserts a single video, idempotent on external video ID.
    async fn insert_video(
        &self,
        source: &SourceRecord,
        video: Video,
    ) -> Result<VideoInsertOutcome, NewsreelError>;

    /// Counts of stored items by platform, for the control surface.
    async fn counts_by_platform(&self) -> Result<Vec<PlatformCounts>, NewsreelError>;

    /// Full-text search over title/body/transcript, for the control
    /// surface's search operation.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<ContentId>, NewsreelError>;

    /// Most recent content IDs stored against `platform`, for the control
    /// surface's get-content-by-source operation.
    async fn content_by_source(&self, platform: &str, limit: usize) -> Result<Vec<ContentId>, NewsreelError>;

    /// Hourly-bucketed count of items stored in the last `hours` hours, for
    /// the control surface's recent-activity histogram. Stores that do not
    /// back this with a real query (the in-memory test doubles) may accept
    /// the default empty-history implementation.
    async fn recent_activity(&self, hours: u32) -> Result<Vec<ActivityBucket>, NewsreelError> {
        let _ = hours;
        Ok(Vec::new())
    }

    /// Count of stored items grouped by `language`, for the control
    /// surface's language-distribution operation.
    async fn language_distribution(&self) -> Result<Vec<LanguageCount>, NewsreelError> {
        Ok(Vec::new())
    }

    /// Whether the store can currently be reached, for `/health`.
    async fn is_reachable(&self) -> bool;
}
