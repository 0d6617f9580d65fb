//! Maps `NewsreelError` onto HTTP status codes for every handler in this
//! crate, mirroring the teacher's habit (`rootsignal-api/src/rest/scout.rs`)
//! of logging at `warn!` and returning a JSON error body rather than
//! propagating the `Display` text unadorned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use newsreel_common::NewsreelError;
use tracing::warn;

pub struct ApiError(pub NewsreelError);

impl From<NewsreelError> for ApiError {
    fn from(err: NewsreelError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self.0 {
            NewsreelError::UnknownSource(_) => StatusCode::NOT_FOUND,
            NewsreelError::Config(_) => StatusCode::BAD_REQUEST,
            NewsreelError::CircuitOpen { .. } | NewsreelError::QuotaExhausted { .. } => StatusCode::SERVICE_UNAVAILABLE,
            NewsreelError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            NewsreelError::UpstreamTransient { .. } | NewsreelError::UpstreamPermanent { .. } => StatusCode::BAD_GATEWAY,
            NewsreelError::Storage(_) | NewsreelError::Classifier(_) | NewsreelError::Parse(_) | NewsreelError::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        warn!(error = %self.0, %status, "request failed");
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}
