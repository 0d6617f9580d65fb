//! Crate-local error type, converted into `NewsreelError::Storage` at the
//! boundary (spec.md §7), mirroring the teacher's `ArchiveError` split.

use newsreel_common::NewsreelError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("row did not round-trip through the database: {0}")]
    Invariant(String),
}

impl From<StoreError> for NewsreelError {
    fn from(err: StoreError) -> Self {
        NewsreelError::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
