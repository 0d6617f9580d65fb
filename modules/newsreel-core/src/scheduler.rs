//! Periodic job scheduler, spec.md §4.9.
//!
//! No cron/job-scheduling crate exists anywhere in the dependency stack
//! this workspace draws from, so this is hand-rolled on `tokio::time`,
//! generalizing the teacher's bounded-concurrency-plus-jittered-retry
//! style to a recurring job runner. Interval/jitter/coalesce/
//! max-instances/misfire-grace semantics and the startup stagger are
//! grounded in the original `SchedulerService` (APScheduler-based).

use crate::clock::Clock;
use newsreel_common::JobStats;
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tracing::{info, instrument, warn};

#[derive(Debug, Clone)]
pub struct JobConfig {
    pub job_id: String,
    pub interval: Duration,
    /// Maximum number of concurrent in-flight runs of this job.
    pub max_instances: u32,
    /// If a run is still in flight when the next tick arrives, collapse
    /// the missed tick(s) into a single extra run fired on completion
    /// rather than queuing one per missed tick.
    pub coalesce: bool,
    /// Upper bound of random jitter added to every tick, so that jobs
    /// configured with the same interval don't all fire in lockstep.
    pub jitter: Duration,
    /// If a tick fires more than this late (e.g. the process was
    /// descheduled), skip that run rather than executing a stale one.
    pub misfire_grace: Duration,
    /// Delay before the job's first tick, used to stagger jobs started
    /// together at process boot.
    pub initial_delay: Duration,
}

/// A unit of scheduled work. `run` is handed the scheduler's clock so it
/// can timestamp its own `JobStats` entry.
#[async_trait::async_trait]
pub trait ScheduledJob: Send + Sync {
    async fn run(&self, clock: &dyn Clock) -> Result<String, String>;
}

struct JobHandle {
    config: JobConfig,
    job: Arc<dyn ScheduledJob>,
    stats: Arc<Mutex<JobStats>>,
    semaphore: Arc<Semaphore>,
    /// Set when a tick was dropped because the job was already running
    /// and `coalesce` is set; consumed by the in-flight run when it
    /// completes, firing exactly one extra run (spec.md §8 invariant 6).
    coalesced_pending: Arc<AtomicBool>,
    next_fire_at: Arc<Mutex<Option<chrono::DateTime<chrono::Utc>>>>,
}

/// Drives a fixed set of registered jobs on their own independent
/// interval loops. Each job's loop is an owned `tokio` task; `Scheduler`
/// itself holds only the handles needed to report stats and to abort on
/// shutdown.
pub struct Scheduler {
    clock: Arc<dyn Clock>,
    jobs: Vec<JobHandle>,
    tasks: Vec<tokio::task::JoinHandle<()>>,
    running: AtomicBool,
}

impl Scheduler {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            jobs: Vec::new(),
            tasks: Vec::new(),
            running: AtomicBool::new(false),
        }
    }

    pub fn register(&mut self, config: JobConfig, job: Arc<dyn ScheduledJob>) {
        let stats = Arc::new(Mutex::new(JobStats::new(config.job_id.clone())));
        let semaphore = Arc::new(Semaphore::new(config.max_instances.max(1) as usize));
        self.jobs.push(JobHandle {
            config,
            job,
            stats,
            semaphore,
            coalesced_pending: Arc::new(AtomicBool::new(false)),
            next_fire_at: Arc::new(Mutex::new(None)),
        });
    }

    pub fn job_ids(&self) -> Vec<String> {
        self.jobs.iter().map(|h| h.config.job_id.clone()).collect()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Spawns every registered job's interval loop. Each job waits its
    /// configured `initial_delay` before the first tick.
    pub async fn start(&mut self) {
        self.running.store(true, Ordering::SeqCst);
        for handle in &self.jobs {
            let config = handle.config.clone();
            let job = handle.job.clone();
            let stats = handle.stats.clone();
            let semaphore = handle.semaphore.clone();
            let coalesced_pending = handle.coalesced_pending.clone();
            let next_fire_at = handle.next_fire_at.clone();
            let clock = self.clock.clone();

            let task = tokio::spawn(async move {
                tokio::time::sleep(config.initial_delay).await;
                loop {
                    {
                        let mut next = next_fire_at.lock().await;
                        *next = Some(clock.now() + chrono::Duration::from_std(config.interval).unwrap_or(chrono::Duration::zero()));
                    }

                    let tick_due_at = clock.monotonic_now();
                    let jitter = jittered(config.jitter);
                    tokio::time::sleep(jitter).await;

                    let lateness = clock.monotonic_now().saturating_duration_since(tick_due_at);
                    if lateness > config.misfire_grace {
                        warn!(job_id = %config.job_id, lateness_ms = lateness.as_millis() as u64, "tick missed misfire grace, skipping");
                    } else {
                        fire_tick(
                            config.clone(),
                            job.clone(),
                            stats.clone(),
                            semaphore.clone(),
                            coalesced_pending.clone(),
                            clock.clone(),
                        );
                    }

                    tokio::time::sleep(config.interval).await;
                }
            });
            self.tasks.push(task);
        }
    }

    /// The job's currently stored configuration, used by the control
    /// surface to merge a partial `JobConfigUpdate` onto a known base
    /// before calling `reconfigure`.
    pub fn current_config(&self, job_id: &str) -> Option<JobConfig> {
        self.jobs.iter().find(|h| h.config.job_id == job_id).map(|h| h.config.clone())
    }

    pub async fn stats_for(&self, job_id: &str) -> Option<JobStats> {
        for handle in &self.jobs {
            if handle.config.job_id == job_id {
                return Some(handle.stats.lock().await.clone());
            }
        }
        None
    }

    pub async fn next_fire_at(&self, job_id: &str) -> Option<chrono::DateTime<chrono::Utc>> {
        for handle in &self.jobs {
            if handle.config.job_id == job_id {
                return *handle.next_fire_at.lock().await;
            }
        }
        None
    }

    /// Bypasses interval timing but still respects `max_instances`
    /// (spec.md §4.9's manual-trigger path). Awaits completion and
    /// returns the job's own summary string.
    pub async fn trigger(&self, job_id: &str) -> Result<String, String> {
        let handle = self
            .jobs
            .iter()
            .find(|h| h.config.job_id == job_id)
            .ok_or_else(|| format!("unknown job id: {job_id}"))?;

        let permit = handle
            .semaphore
            .clone()
            .try_acquire_owned()
            .map_err(|_| "max instances reached".to_string())?;

        let start = self.clock.monotonic_now();
        let outcome = handle.job.run(self.clock.as_ref()).await;
        let duration = self.clock.monotonic_now().saturating_duration_since(start);
        {
            let mut stats = handle.stats.lock().await;
            stats.record(self.clock.now(), duration, &outcome);
        }
        drop(permit);
        outcome
    }

    /// Replaces a job's stored configuration atomically; in-flight
    /// executions are not cancelled (spec.md §4.9's reconfiguration
    /// semantics). Takes effect for the job's next scheduled tick.
    pub fn reconfigure(&mut self, job_id: &str, config: JobConfig) -> Result<(), String> {
        let handle = self
            .jobs
            .iter_mut()
            .find(|h| h.config.job_id == job_id)
            .ok_or_else(|| format!("unknown job id: {job_id}"))?;
        handle.semaphore = Arc::new(Semaphore::new(config.max_instances.max(1) as usize));
        handle.config = config;
        Ok(())
    }

    /// Stops the scheduler. Waiting for in-flight jobs is the caller's
    /// responsibility via the job's own semaphore permits; this aborts
    /// the interval-tick loops themselves immediately.
    pub fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

/// Acquires a permit and spawns the run as its own detached task so the
/// interval loop above is never blocked on job execution; on completion,
/// if a tick was coalesced in while this run was in flight, fires exactly
/// one more run before releasing the permit (spec.md §8 invariant 6).
#[instrument(skip(job, stats, semaphore, coalesced_pending, clock), fields(job_id = %config.job_id))]
fn fire_tick(
    config: JobConfig,
    job: Arc<dyn ScheduledJob>,
    stats: Arc<Mutex<JobStats>>,
    semaphore: Arc<Semaphore>,
    coalesced_pending: Arc<AtomicBool>,
    clock: Arc<dyn Clock>,
) {
    let permit = match semaphore.clone().try_acquire_owned() {
        Ok(permit) => permit,
        Err(_) => {
            if config.coalesce {
                coalesced_pending.store(true, Ordering::SeqCst);
                info!(job_id = %config.job_id, "previous run still in flight, coalescing tick");
            } else {
                warn!(job_id = %config.job_id, "max instances reached, dropping tick");
            }
            return;
        }
    };

    tokio::spawn(async move {
        loop {
            run_once(&config, job.clone(), stats.clone(), clock.clone()).await;
            if config.coalesce && coalesced_pending.swap(false, Ordering::SeqCst) {
                continue;
            }
            break;
        }
        drop(permit);
    });
}

async fn run_once(config: &JobConfig, job: Arc<dyn ScheduledJob>, stats: Arc<Mutex<JobStats>>, clock: Arc<dyn Clock>) {
    let start = clock.monotonic_now();
    let outcome = job.run(clock.as_ref()).await;
    let duration = clock.monotonic_now().saturating_duration_since(start);

    {
        let mut stats = stats.lock().await;
        stats.record(clock.now(), duration, &outcome);
    }

    match &outcome {
        Ok(summary) => info!(job_id = %config.job_id, duration_ms = duration.as_millis() as u64, summary = %summary, "job run succeeded"),
        Err(err) => warn!(job_id = %config.job_id, duration_ms = duration.as_millis() as u64, error = %err, "job run failed"),
    }
}

fn jittered(max_jitter: Duration) -> Duration {
    if max_jitter.is_zero() {
        return Duration::ZERO;
    }
    let millis = max_jitter.as_millis().max(1) as u64;
    Duration::from_millis(rand::rng().random_range(0..millis))
}
