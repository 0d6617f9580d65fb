//! Cross-cutting error kinds, spec.md §7. Crate-local error types
//! (`newsreel-storage::StorageError`, `newsreel-classifier::ClassifierError`)
//! convert into this enum at the boundary, mirroring the teacher's
//! `RootSignalError` / `ArchiveError` split.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NewsreelError {
    #[error("unknown source: {0}")]
    UnknownSource(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("upstream transient error from {source}: {message}")]
    UpstreamTransient { source: String, message: String },

    #[error("upstream permanent error from {source}: {message}")]
    UpstreamPermanent { source: String, message: String },

    #[error("quota exhausted for key pool {pool}")]
    QuotaExhausted { pool: String },

    #[error("circuit open for source {source}")]
    CircuitOpen { source: String },

    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("classifier error: {0}")]
    Classifier(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, NewsreelError>;

impl NewsreelError {
    /// Whether this error kind should ever trigger a retry with backoff
    /// (spec.md §4.1/§4.7). Permanent upstream errors, unknown sources, and
    /// config errors never retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            NewsreelError::UpstreamTransient { .. } | NewsreelError::Timeout(_)
        )
    }

}
