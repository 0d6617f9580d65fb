//! Postgres-backed `StorageGateway` implementation, spec.md §4.5.
//!
//! The concrete persistence collaborator the core depends on only
//! through the `newsreel_core::storage::StorageGateway` trait — matching
//! `rootsignal-archive`'s split between the trait seam and its `ArchiveStore`
//! implementation.

mod error;
mod schema;
mod store;

pub use error::StoreError;
pub use store::PgStorage;
