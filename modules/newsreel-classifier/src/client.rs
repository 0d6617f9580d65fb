//! `reqwest`-backed `ClassifierClient`, grounded in the teacher's
//! `ClaudeClient` (`ai-client/src/claude/client.rs`): a small struct
//! holding a `reqwest::Client` and a base URL, one method that posts a
//! JSON body and inspects `response.status()` before touching the body.
//!
//! The original service (`services/news_service.py`'s `_classify_articles`
//! and its YouTube counterpart) posts `{"content_ids": [...]}` to one of
//! two distinct endpoints and reads `total_classified` off a 200 body.
//! This client reproduces that wire contract and narrows every response
//! into the closed `BatchResponse` table from spec.md §4.6.

use std::time::Duration;

use async_trait::async_trait;
use newsreel_common::{ContentId, ContentKind};
use newsreel_core::classifier::{BatchResponse, ClassifierClient};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    content_ids: &'a [ContentId],
}

#[derive(Deserialize, Default)]
struct ClassifyResponseBody {
    #[serde(default)]
    total_classified: usize,
}

/// Posts content-ID batches to one of two configured classifier
/// endpoints, one per content kind, matching spec.md §6's "two endpoints
/// exist, one per content kind."
pub struct HttpClassifierClient {
    http: reqwest::Client,
    article_url: String,
    video_url: String,
}

impl HttpClassifierClient {
    pub fn new(article_url: impl Into<String>, video_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            article_url: article_url.into(),
            video_url: video_url.into(),
        }
    }

    fn endpoint_for(&self, kind: ContentKind) -> &str {
        match kind {
            ContentKind::Article => &self.article_url,
            ContentKind::Video => &self.video_url,
        }
    }
}

#[async_trait]
impl ClassifierClient for HttpClassifierClient {
    async fn submit_batch(&self, kind: ContentKind, ids: &[ContentId]) -> BatchResponse {
        let url = self.endpoint_for(kind);
        let body = ClassifyRequest { content_ids: ids };

        let response = match self.http.post(url).json(&body).send().await {
            Ok(response) => response,
            Err(error) => {
                warn!(%kind, %url, %error, "classifier request failed");
                return BatchResponse::Other;
            }
        };

        match response.status() {
            StatusCode::OK => match response.json::<ClassifyResponseBody>().await {
                Ok(body) => BatchResponse::Ok200 {
                    total_classified: body.total_classified,
                },
                Err(error) => {
                    warn!(%kind, %url, %error, "classifier returned an unparseable 200 body");
                    BatchResponse::Other
                }
            },
            StatusCode::ACCEPTED => BatchResponse::Accepted202,
            StatusCode::NOT_FOUND => BatchResponse::NotFound404,
            StatusCode::BAD_REQUEST => BatchResponse::BadRequest400,
            status => {
                warn!(%kind, %url, %status, "classifier returned an unhandled status");
                BatchResponse::Other
            }
        }
    }
}
