//! Concurrent orchestration core: scheduler, per-source worker pool,
//! circuit breaker, key pool, deduplicating ingest path, and the
//! harvester/storage/classifier trait seams adapters and crates plug
//! into.

pub mod breaker;
pub mod classifier;
pub mod clock;
pub mod control;
pub mod coordinator;
pub mod harvester;
pub mod jobs;
pub mod keypool;
pub mod observability;
pub mod registry;
pub mod runner;
pub mod scheduler;
pub mod storage;

pub use breaker::{BreakerState, CircuitBreaker};
pub use classifier::{BatchResponse, ClassifierClient, DispatchSummary, MAX_BATCH_SIZE};
pub use clock::{backoff_delay, Clock, FrozenClock, SystemClock};
pub use control::{
    BreakerStatus, ControlSurface, Deps, JobConfigUpdate, ResetScope, SchedulerControlSurface, SchedulerStatus,
};
pub use coordinator::{BatchCoordinator, BatchSummary, SourceTask};
pub use harvester::Harvester;
pub use jobs::{AcquisitionJob, SourceSpec};
pub use keypool::{KeyEntry, KeyPool, KeyPoolStatus, KeyResult};
pub use observability::{CorrelationId, HealthReport};
pub use registry::HarvesterRegistry;
pub use runner::{PolicySkipCounts, RunReport, RunStatus, RunnerConfig, SourceRunner};
pub use scheduler::{JobConfig, ScheduledJob, Scheduler};
pub use storage::{ActivityBucket, ArticleBatchOutcome, LanguageCount, PlatformCounts, StorageGateway, VideoInsertOutcome};
