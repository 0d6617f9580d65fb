//! `newsreel-server`: boots the scheduler, the control-surface HTTP
//! router, and the two acquisition jobs (article, video) over a shared
//! set of collaborators. Grounded in the teacher's `rootsignal-server`
//! binary: CLI via `clap`, config via a typed loader, `tracing_subscriber`
//! initialized first, a storage pool connected before anything else binds
//! a socket, then the router served on a `tokio::net::TcpListener`.
//!
//! Exit codes follow spec.md §6: 0 clean shutdown, 1 fatal config/startup
//! error, 2 storage unreachable at startup.

mod harvester_stub;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

use newsreel_classifier::HttpClassifierClient;
use newsreel_common::{AppConfig, ContentKind, Query, SourcesConfig, SourceType};
use newsreel_core::breaker::CircuitBreaker;
use newsreel_core::clock::SystemClock;
use newsreel_core::control::{ControlSurface, Deps, SchedulerControlSurface};
use newsreel_core::jobs::{AcquisitionJob, SourceSpec};
use newsreel_core::keypool::KeyPool;
use newsreel_core::registry::HarvesterRegistry;
use newsreel_core::runner::RunnerConfig;
use newsreel_core::scheduler::{JobConfig, ScheduledJob, Scheduler};
use newsreel_storage::PgStorage;

const ARTICLE_JOB_ID: &str = "article";
const VIDEO_JOB_ID: &str = "video";

#[derive(Parser)]
#[command(name = "newsreel-server", about = "Content acquisition and orchestration engine")]
struct Cli {
    /// TOML file listing article publishers, video channels, and per-job defaults.
    #[arg(long, default_value = "./config/sources.toml")]
    sources: PathBuf,
}

fn sources_to_specs(entries: &[newsreel_common::SourceEntry]) -> Vec<SourceSpec> {
    entries
        .iter()
        .map(|e| SourceSpec {
            platform: e.platform.clone(),
            base_url: e.base_url.clone(),
            harvester_name: e.platform.clone(),
        })
        .collect()
}

fn job_config(job_id: &str, defaults: &newsreel_common::JobDefaults, initial_delay: Duration) -> JobConfig {
    JobConfig {
        job_id: job_id.to_string(),
        interval: Duration::from_secs(defaults.interval_minutes * 60),
        max_instances: defaults.max_instances,
        coalesce: defaults.coalesce,
        jitter: Duration::from_secs(defaults.jitter_seconds),
        misfire_grace: Duration::from_secs(defaults.misfire_grace_seconds),
        initial_delay,
    }
}

async fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .init();

    tracing::info!("starting newsreel-server");

    let cli = Cli::parse();
    let config = AppConfig::server_from_env();
    config.log_redacted();

    let sources = SourcesConfig::from_file(&cli.sources)
        .with_context(|| format!("loading sources config from {}", cli.sources.display()))?;
    tracing::info!(
        article_publishers = sources.article_publishers.len(),
        video_channels = sources.video_channels.len(),
        "sources config loaded"
    );

    let storage: Arc<dyn newsreel_core::storage::StorageGateway> = match PgStorage::connect(&config.database_url).await {
        Ok(store) => Arc::new(store),
        Err(err) => {
            tracing::error!(error = %err, "storage unreachable at startup");
            std::process::exit(2);
        }
    };

    let clock: Arc<dyn newsreel_core::clock::Clock> = Arc::new(SystemClock);
    let breaker = Arc::new(CircuitBreaker::new(
        clock.clone(),
        config.breaker_failure_threshold,
        config.breaker_open_duration,
    ));
    let key_pool = if sources.video_channels.is_empty() {
        None
    } else {
        Some(Arc::new(KeyPool::new(config.youtube_api_keys.clone(), clock.now())))
    };
    let classifier: Arc<dyn newsreel_core::classifier::ClassifierClient> = Arc::new(HttpClassifierClient::new(
        config.article_classifier_url.clone(),
        config.video_classifier_url.clone(),
        config.classifier_timeout,
    ));

    let mut registry = HarvesterRegistry::new();
    for entry in sources.article_publishers.iter().chain(sources.video_channels.iter()) {
        let name = entry.platform.clone();
        registry.register(name.clone(), move || Arc::new(harvester_stub::StubHarvester::new(name.clone())) as Arc<dyn newsreel_core::Harvester>);
    }
    let registry = Arc::new(registry);

    let runner_config = RunnerConfig {
        source_timeout: Duration::from_secs(sources.article_job.interval_minutes.max(1) * 60),
        ..RunnerConfig::default()
    };

    let article_query = Query::new(100);
    let video_query = {
        let mut q = Query::new(100);
        q.features.include_transcripts = true;
        q.features.include_comments = true;
        q
    };

    let article_job: Arc<dyn ScheduledJob> = Arc::new(AcquisitionJob::new(
        SourceType::ArticlePublisher,
        ContentKind::Article,
        sources_to_specs(&sources.article_publishers),
        article_query,
        registry.clone(),
        storage.clone(),
        clock.clone(),
        breaker.clone(),
        classifier.clone(),
        None,
        runner_config.clone(),
        config.max_concurrent_runners,
    ));

    let video_job: Arc<dyn ScheduledJob> = Arc::new(AcquisitionJob::new(
        SourceType::VideoChannel,
        ContentKind::Video,
        sources_to_specs(&sources.video_channels),
        video_query,
        registry.clone(),
        storage.clone(),
        clock.clone(),
        breaker.clone(),
        classifier.clone(),
        key_pool.clone(),
        runner_config.clone(),
        config.max_concurrent_runners,
    ));

    let mut scheduler = Scheduler::new(clock.clone());
    // Staggered boot delays mirror the original `setup_default_jobs`
    // (news job +30s, video job +60s) to avoid a thundering herd at
    // process start (SPEC_FULL.md §4.9).
    scheduler.register(job_config(ARTICLE_JOB_ID, &sources.article_job, Duration::from_secs(30)), article_job);
    scheduler.register(job_config(VIDEO_JOB_ID, &sources.video_job, Duration::from_secs(60)), video_job);
    scheduler.start().await;
    let job_ids = scheduler.job_ids();
    let scheduler = Arc::new(Mutex::new(scheduler));

    let deps = Arc::new(Deps {
        clock,
        scheduler,
        breaker,
        key_pool,
        storage,
        classifier,
        runner_config,
        registry,
        job_ids,
    });

    let surface: Arc<dyn ControlSurface> = Arc::new(SchedulerControlSurface::new(deps));
    let router = newsreel_api::build_router(surface, &[]);

    let listener = tokio::net::TcpListener::bind(&config.http_bind_addr)
        .await
        .with_context(|| format!("binding {}", config.http_bind_addr))?;
    tracing::info!(addr = %config.http_bind_addr, "control surface listening");
    axum::serve(listener, router).await.context("serving http")?;

    Ok(())
}

fn main() {
    if let Err(err) = tokio_main() {
        eprintln!("fatal: {err:#}");
        std::process::exit(1);
    }
}

fn tokio_main() -> Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?
        .block_on(run())
}
