//! Classifier dispatcher, spec.md §4.6.
//!
//! Forwards newly minted ContentIDs to an external classifier endpoint in
//! batches of at most five, serially across batches within one call but
//! safe to call concurrently across different calls. Per-batch response
//! handling follows a closed table; failures here are always swallowed by
//! the Source Runner (classification is best-effort).

use async_trait::async_trait;
use newsreel_common::{ContentId, ContentKind, NewsreelError};

pub const MAX_BATCH_SIZE: usize = 5;

/// One classifier HTTP response, already narrowed to the cases spec.md
/// §4.6 distinguishes. A transport-level timeout maps to `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchResponse {
    /// HTTP 200 with a `total_classified` count from the body.
    Ok200 { total_classified: usize },
    /// HTTP 202: accepted for async processing downstream.
    Accepted202,
    /// HTTP 404: batch unknown to the classifier.
    NotFound404,
    /// HTTP 400: malformed request, a defect in this client.
    BadRequest400,
    /// Any other status, or a request timeout.
    Other,
}

#[async_trait]
pub trait ClassifierClient: Send + Sync {
    /// Submits one batch (already capped at `MAX_BATCH_SIZE`) of content
    /// IDs of a single kind. Never returns an error — a transport failure
    /// is reported as `BatchResponse::Other`, since classification is
    /// best-effort end to end.
    async fn submit_batch(&self, kind: ContentKind, ids: &[ContentId]) -> BatchResponse;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub successful: usize,
    pub failed: usize,
    pub total_classified: usize,
    pub skipped: usize,
}

impl DispatchSummary {
    fn add_batch(&mut self, batch_len: usize, response: BatchResponse) {
        match response {
            BatchResponse::Ok200 { total_classified } => {
                let classified = total_classified.min(batch_len);
                self.successful += classified;
                self.total_classified += classified;
                self.failed += batch_len - classified;
            }
            BatchResponse::Accepted202 => {
                self.successful += batch_len;
                self.total_classified += batch_len;
            }
            BatchResponse::NotFound404 => {
                self.skipped += batch_len;
            }
            BatchResponse::BadRequest400 | BatchResponse::Other => {
                self.failed += batch_len;
            }
        }
    }
}

/// Dispatches `ids` in batches of at most `MAX_BATCH_SIZE`, serially, and
/// aggregates the per-batch responses per spec.md §4.6's table. This
/// never fails — every failure mode ends up folded into the returned
/// summary, because classification is best-effort from the Runner's
/// point of view (§4.7 step 8).
pub async fn dispatch(
    client: &dyn ClassifierClient,
    kind: ContentKind,
    ids: &[ContentId],
) -> DispatchSummary {
    let mut summary = DispatchSummary::default();
    for batch in ids.chunks(MAX_BATCH_SIZE) {
        let response = client.submit_batch(kind, batch).await;
        summary.add_batch(batch.len(), response);
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct ScriptedClient {
        responses: Mutex<Vec<BatchResponse>>,
        batch_sizes: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl ClassifierClient for ScriptedClient {
        async fn submit_batch(&self, _kind: ContentKind, ids: &[ContentId]) -> BatchResponse {
            self.batch_sizes.lock().unwrap().push(ids.len());
            self.responses.lock().unwrap().remove(0)
        }
    }

    #[tokio::test]
    async fn batches_of_twelve_split_into_five_five_two() {
        let ids: Vec<ContentId> = (0..12).map(|_| ContentId::new()).collect();
        let client = ScriptedClient {
            responses: Mutex::new(vec![
                BatchResponse::Ok200 { total_classified: 5 },
                BatchResponse::Ok200 { total_classified: 5 },
                BatchResponse::Ok200 { total_classified: 2 },
            ]),
            batch_sizes: Mutex::new(vec![]),
        };
        let summary = dispatch(&client, ContentKind::Article, &ids).await;
        assert_eq!(*client.batch_sizes.lock().unwrap(), vec![5, 5, 2]);
        assert_eq!(summary.total_classified, 12);
        assert_eq!(summary.failed, 0);
    }

    #[tokio::test]
    async fn not_found_counts_as_skipped_not_failed() {
        let ids: Vec<ContentId> = (0..3).map(|_| ContentId::new()).collect();
        let client = ScriptedClient {
            responses: Mutex::new(vec![BatchResponse::NotFound404]),
            batch_sizes: Mutex::new(vec![]),
        };
        let summary = dispatch(&client, ContentKind::Video, &ids).await;
        assert_eq!(summary.skipped, 3);
        assert_eq!(summary.failed, 0);
    }

    #[tokio::test]
    async fn bad_request_and_other_both_count_as_failed() {
        let ids: Vec<ContentId> = (0..2).map(|_| ContentId::new()).collect();
        let client = ScriptedClient {
            responses: Mutex::new(vec![BatchResponse::BadRequest400]),
            batch_sizes: Mutex::new(vec![]),
        };
        let summary = dispatch(&client, ContentKind::Article, &ids).await;
        assert_eq!(summary.failed, 2);
    }

    #[tokio::test]
    async fn partial_200_response_fails_the_unclassified_remainder() {
        let ids: Vec<ContentId> = (0..5).map(|_| ContentId::new()).collect();
        let client = ScriptedClient {
            responses: Mutex::new(vec![BatchResponse::Ok200 { total_classified: 3 }]),
            batch_sizes: Mutex::new(vec![]),
        };
        let summary = dispatch(&client, ContentKind::Article, &ids).await;
        assert_eq!(summary.total_classified, 3);
        assert_eq!(summary.failed, 2);
    }
}
