//! Thin HTTP handlers translating requests into `ControlSurface` calls.
//! Grounded in `rootsignal-api/src/rest/mod.rs`'s handler shape: a
//! `Query`/`Path`/`Json` extractor tuple, a `match` on the collaborator's
//! result, `Json(..)` on success and a typed error response on failure.

use std::sync::Arc;

use axum::extract::{Path, Query as QueryExtractor, State};
use axum::response::{IntoResponse, Json};
use newsreel_common::{ContentKind, Query, SourceType};
use newsreel_core::control::{ControlSurface, JobConfigUpdate, ResetScope};
use serde::Deserialize;

use crate::error::ApiError;

pub async fn health(State(surface): State<Arc<dyn ControlSurface>>) -> impl IntoResponse {
    use axum::http::StatusCode;
    let report = surface.health().await;
    let status = if report.is_healthy() { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status, Json(report))
}

pub async fn scheduler_status(State(surface): State<Arc<dyn ControlSurface>>) -> impl IntoResponse {
    Json(surface.scheduler_status().await)
}

pub async fn configure_job(
    State(surface): State<Arc<dyn ControlSurface>>,
    Path(job_id): Path<String>,
    Json(update): Json<JobConfigUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    surface.configure_job(&job_id, update).await?;
    Ok(Json(serde_json::json!({ "job_id": job_id, "configured": true })))
}

pub async fn trigger_job(
    State(surface): State<Arc<dyn ControlSurface>>,
    Path(job_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = surface.trigger_job(&job_id).await?;
    Ok(Json(serde_json::json!({ "job_id": job_id, "outcome": outcome })))
}

pub async fn start_scheduler(State(surface): State<Arc<dyn ControlSurface>>) -> impl IntoResponse {
    surface.start_scheduler().await;
    Json(serde_json::json!({ "running": true }))
}

pub async fn stop_scheduler(State(surface): State<Arc<dyn ControlSurface>>) -> impl IntoResponse {
    surface.stop_scheduler().await;
    Json(serde_json::json!({ "running": false }))
}

#[derive(Deserialize)]
pub struct ResetRequest {
    /// One of "global", "source", "key".
    scope: String,
    /// Required when `scope` is "source".
    source: Option<String>,
}

pub async fn reset_failures(
    State(surface): State<Arc<dyn ControlSurface>>,
    Json(body): Json<ResetRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let scope = match body.scope.as_str() {
        "global" => ResetScope::Global,
        "key" => ResetScope::Key,
        "source" => {
            let source = body
                .source
                .as_deref()
                .ok_or_else(|| newsreel_common::NewsreelError::Config("source scope requires a source name".to_string()))?;
            ResetScope::Source(source)
        }
        other => return Err(newsreel_common::NewsreelError::Config(format!("unknown reset scope: {other}")).into()),
    };
    surface.reset_failures(scope);
    Ok(Json(serde_json::json!({ "reset": body.scope })))
}

#[derive(Deserialize)]
pub struct AdhocHarvestRequest {
    platform: String,
    source_type: SourceType,
    kind: ContentKind,
    #[serde(default)]
    keyword: Option<String>,
    #[serde(default = "default_limit")]
    limit: usize,
    #[serde(default)]
    persist: bool,
}

fn default_limit() -> usize {
    20
}

pub async fn adhoc_harvest(
    State(surface): State<Arc<dyn ControlSurface>>,
    Json(body): Json<AdhocHarvestRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut query = Query::new(body.limit);
    query.keyword = body.keyword;
    let report = surface
        .adhoc_harvest(&body.platform, body.source_type, body.kind, query, body.persist)
        .await?;
    Ok(Json(report))
}

pub async fn inspect_source_status(
    State(surface): State<Arc<dyn ControlSurface>>,
    Path(platform): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let status = surface.inspect_source_status(&platform).await?;
    Ok(Json(status))
}

#[derive(Deserialize)]
pub struct SearchQuery {
    q: String,
    #[serde(default = "default_limit")]
    limit: usize,
}

pub async fn search_content(
    State(surface): State<Arc<dyn ControlSurface>>,
    QueryExtractor(params): QueryExtractor<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let ids = surface.search_content(&params.q, params.limit).await?;
    Ok(Json(ids))
}

#[derive(Deserialize)]
pub struct LimitQuery {
    #[serde(default = "default_limit")]
    limit: usize,
}

pub async fn content_by_source(
    State(surface): State<Arc<dyn ControlSurface>>,
    Path(platform): Path<String>,
    QueryExtractor(params): QueryExtractor<LimitQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let ids = surface.content_by_source(&platform, params.limit).await?;
    Ok(Json(ids))
}

pub async fn aggregate_counts(State(surface): State<Arc<dyn ControlSurface>>) -> Result<impl IntoResponse, ApiError> {
    let counts = surface.aggregate_counts().await?;
    Ok(Json(counts))
}

#[derive(Deserialize)]
pub struct ActivityQuery {
    #[serde(default = "default_activity_hours")]
    hours: u32,
}

fn default_activity_hours() -> u32 {
    24
}

pub async fn recent_activity(
    State(surface): State<Arc<dyn ControlSurface>>,
    QueryExtractor(params): QueryExtractor<ActivityQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let buckets = surface.recent_activity(params.hours).await?;
    Ok(Json(buckets))
}

pub async fn language_distribution(State(surface): State<Arc<dyn ControlSurface>>) -> Result<impl IntoResponse, ApiError> {
    let languages = surface.language_distribution().await?;
    Ok(Json(languages))
}
