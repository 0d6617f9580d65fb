//! Row shapes for the `sources`, `articles`, and `videos` tables. No
//! migration files ship with this crate — schema management is out of
//! scope (spec.md's SQL-DDL non-goal) — so these are hand-maintained to
//! match whatever schema the operator has already provisioned.

use chrono::{DateTime, Utc};
use newsreel_common::{PublishedAt, SourceId, SourceRecord, SourceType, Video};
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SourceRow {
    pub id: Uuid,
    pub source_type: String,
    pub platform: String,
    pub base_url: String,
    pub credibility_hint: Option<f32>,
    pub created_at: DateTime<Utc>,
}

impl SourceRow {
    pub(crate) fn into_record(self) -> Option<SourceRecord> {
        Some(SourceRecord {
            id: SourceId(self.id),
            source_type: parse_source_type(&self.source_type)?,
            platform: self.platform,
            base_url: self.base_url,
            credibility_hint: self.credibility_hint,
            created_at: self.created_at,
        })
    }
}

pub(crate) fn source_type_str(source_type: SourceType) -> &'static str {
    match source_type {
        SourceType::ArticlePublisher => "article_publisher",
        SourceType::VideoChannel => "video_channel",
    }
}

fn parse_source_type(s: &str) -> Option<SourceType> {
    match s {
        "article_publisher" => Some(SourceType::ArticlePublisher),
        "video_channel" => Some(SourceType::VideoChannel),
        _ => None,
    }
}

/// Splits `PublishedAt` into the two nullable columns articles/videos
/// actually store it under: a parsed timestamp when available, otherwise
/// the raw string the adapter handed back.
pub(crate) fn split_published_at(p: &PublishedAt) -> (Option<DateTime<Utc>>, Option<String>) {
    match p {
        PublishedAt::Parsed(dt) => (Some(*dt), None),
        PublishedAt::Raw(raw) => (None, Some(raw.clone())),
        PublishedAt::Unknown => (None, None),
    }
}

pub(crate) fn join_published_at(parsed: Option<DateTime<Utc>>, raw: Option<String>) -> PublishedAt {
    match (parsed, raw) {
        (Some(dt), _) => PublishedAt::Parsed(dt),
        (None, Some(raw)) => PublishedAt::Raw(raw),
        (None, None) => PublishedAt::Unknown,
    }
}

pub(crate) fn video_tags_and_comments(video: &Video) -> (serde_json::Value, serde_json::Value, serde_json::Value) {
    (
        serde_json::to_value(&video.tags).unwrap_or(serde_json::Value::Array(vec![])),
        serde_json::to_value(&video.comments).unwrap_or(serde_json::Value::Array(vec![])),
        serde_json::to_value(&video.transcript_languages).unwrap_or(serde_json::Value::Array(vec![])),
    )
}
