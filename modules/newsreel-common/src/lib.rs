//! Shared domain types, error kinds, and configuration for the content
//! acquisition and orchestration engine.

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod types;

pub use config::{AppConfig, JobDefaults, SourceEntry, SourcesConfig};
pub use error::{NewsreelError, Result};
pub use fingerprint::canonicalize_url;
pub use types::*;
