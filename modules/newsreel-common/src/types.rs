//! Domain model shared across the acquisition core, storage gateway, and
//! control surface. See spec.md §3.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque handle minted by storage on successful insert. The core never
/// interprets its internal structure — it is passed to the classifier as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentId(pub Uuid);

impl ContentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ContentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ContentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque handle for a resolved (type, platform) source row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceId(pub Uuid);

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    ArticlePublisher,
    VideoChannel,
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceType::ArticlePublisher => write!(f, "article_publisher"),
            SourceType::VideoChannel => write!(f, "video_channel"),
        }
    }
}

/// A configured remote publisher or channel. Idempotently created on first
/// use (spec.md §3, Source invariants) and cached by the storage gateway
/// keyed on (source_type, platform).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRecord {
    pub id: SourceId,
    pub source_type: SourceType,
    pub platform: String,
    pub base_url: String,
    pub credibility_hint: Option<f32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaRef {
    pub url: String,
    pub caption: Option<String>,
    pub kind: MediaKind,
}

/// Either a fully parsed ISO-8601 UTC timestamp, or the raw string an
/// adapter handed back when it could not be parsed. See spec.md §3,
/// Article invariants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishedAt {
    Parsed(DateTime<Utc>),
    Raw(String),
    Unknown,
}

/// A text-content item as harvested from an article publisher, prior to
/// storage. The fingerprint (canonical URL) is the sole identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub fingerprint: String,
    pub title: String,
    pub published_at: PublishedAt,
    pub body: String,
    pub summary: Option<String>,
    pub author: Option<String>,
    pub media: Vec<MediaRef>,
    pub source_name: String,
    pub tags: Vec<String>,
    pub section: Option<String>,
    /// Best-effort language hint; defaults to "en" when the adapter has no
    /// detector. Supplements spec.md's Article attributes per
    /// `original_source/models/news.py`.
    pub language: String,
    pub raw: serde_json::Value,
}

impl Article {
    /// sha256 of the normalized body, for diagnostics only — never used as
    /// dedup identity. The fingerprint remains the sole identity.
    pub fn content_hash(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(self.body.trim().as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelRef {
    pub channel_id: String,
    pub channel_handle: String,
    pub channel_title: String,
}

/// A video-content item as harvested from a video-channel adapter, prior to
/// storage. The external video ID is the sole identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    pub external_video_id: String,
    pub title: String,
    pub description: String,
    pub channel: ChannelRef,
    pub published_at: PublishedAt,
    pub thumbnail_url: Option<String>,
    pub duration_seconds: u32,
    pub view_count: u64,
    pub like_count: u64,
    pub comment_count: u64,
    pub tags: Vec<String>,
    pub language: Option<String>,
    pub comments: Vec<String>,
    pub english_transcript: Option<String>,
    pub bengali_transcript: Option<String>,
    pub transcript_languages: Vec<String>,
    pub raw: serde_json::Value,
}

impl Video {
    pub fn has_english_transcript(&self) -> bool {
        self.english_transcript
            .as_ref()
            .is_some_and(|t| !t.trim().is_empty())
    }
}

/// A raw item as returned by a harvester adapter, before normalization.
/// Adapters themselves are out of scope (spec.md §1); the core consumes
/// whatever shape the adapter hands back through this union.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawItem {
    Article(Article),
    Video(Video),
}

impl RawItem {
    pub fn fingerprint(&self) -> &str {
        match self {
            RawItem::Article(a) => &a.fingerprint,
            RawItem::Video(v) => &v.external_video_id,
        }
    }
}

/// Content kind, used to pick the classifier endpoint (spec.md §4.6) and the
/// scheduler job (spec.md §4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Article,
    Video,
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentKind::Article => write!(f, "article"),
            ContentKind::Video => write!(f, "video"),
        }
    }
}

/// Per-item harvester policy flags (spec.md §4.4). Adapters ignore fields
/// they do not use.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureFlags {
    pub include_comments: bool,
    pub include_transcripts: bool,
    pub min_duration_seconds: Option<u32>,
    pub max_duration_seconds: Option<u32>,
}

/// A closed query record passed to a harvester. See spec.md §9: "Dynamic
/// per-adapter configuration objects become a closed `Query` record".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    pub keyword: Option<String>,
    pub page: u32,
    pub page_size: u32,
    pub limit: usize,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub keywords: Vec<String>,
    pub hashtags: Vec<String>,
    pub features: FeatureFlags,
}

impl Query {
    pub fn new(limit: usize) -> Self {
        Self {
            keyword: None,
            page: 1,
            page_size: 20,
            limit,
            date_from: None,
            date_to: None,
            keywords: Vec::new(),
            hashtags: Vec::new(),
            features: FeatureFlags::default(),
        }
    }

    /// Returns a copy of this query advanced to the given page number.
    pub fn at_page(&self, page: u32) -> Self {
        Self {
            page,
            ..self.clone()
        }
    }
}

/// One record per job ID (spec.md §3, JobStats).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStats {
    pub job_id: String,
    pub total_runs: u64,
    pub successful_runs: u64,
    pub failed_runs: u64,
    pub cumulative_duration: std::time::Duration,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_summary: Option<String>,
}

impl JobStats {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            total_runs: 0,
            successful_runs: 0,
            failed_runs: 0,
            cumulative_duration: std::time::Duration::ZERO,
            last_run_at: None,
            last_error: None,
            last_summary: None,
        }
    }

    pub fn record(&mut self, now: DateTime<Utc>, duration: std::time::Duration, outcome: &Result<String, String>) {
        self.total_runs += 1;
        self.cumulative_duration += duration;
        self.last_run_at = Some(now);
        match outcome {
            Ok(summary) => {
                self.successful_runs += 1;
                self.last_summary = Some(summary.clone());
                self.last_error = None;
            }
            Err(err) => {
                self.failed_runs += 1;
                self.last_error = Some(err.clone());
            }
        }
    }
}
