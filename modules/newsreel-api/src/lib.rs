//! Thin `axum` router over `ControlSurface` (spec.md §6: "the HTTP surface
//! is out of scope ... referenced only through the interface the core
//! exposes to it"). Grounded in `rootsignal-server/src/routes.rs`'s
//! `build_router(deps) -> Router` shape and `rootsignal-api`'s handler
//! conventions, stripped of the GraphQL/JWT machinery this workspace has
//! no use for.

mod error;
mod handlers;


use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use newsreel_core::control::ControlSurface;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Builds the full router, wiring every `ControlSurface` operation to a
/// route. `allowed_origins` empty means wide-open CORS, matching the
/// teacher's `rootsignal-server::routes::build_router` default.
pub fn build_router(surface: Arc<dyn ControlSurface>, allowed_origins: &[String]) -> Router {
    let cors = if allowed_origins.is_empty() {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        let origins: Vec<_> = allowed_origins.iter().filter_map(|o| o.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins).allow_methods(Any).allow_headers(Any)
    };

    Router::new()
        .route("/health", get(handlers::health))
        .route("/scheduler/status", get(handlers::scheduler_status))
        .route("/scheduler/start", post(handlers::start_scheduler))
        .route("/scheduler/stop", post(handlers::stop_scheduler))
        .route("/scheduler/jobs/{job_id}/configure", post(handlers::configure_job))
        .route("/scheduler/jobs/{job_id}/trigger", post(handlers::trigger_job))
        .route("/reset", post(handlers::reset_failures))
        .route("/harvest/adhoc", post(handlers::adhoc_harvest))
        .route("/sources/{platform}/status", get(handlers::inspect_source_status))
        .route("/sources/{platform}/content", get(handlers::content_by_source))
        .route("/search", get(handlers::search_content))
        .route("/counts", get(handlers::aggregate_counts))
        .route("/activity", get(handlers::recent_activity))
        .route("/languages", get(handlers::language_distribution))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(surface)
}
