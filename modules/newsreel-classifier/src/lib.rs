//! HTTP-backed `ClassifierClient`, spec.md §4.6/§6.
//!
//! Forwards a single already-capped batch to one of two external
//! endpoints (one per content kind) and narrows the HTTP response into
//! `newsreel_core::classifier::BatchResponse` per the closed table in
//! spec.md §4.6. Grounded in the original `_classify_articles`
//! (`services/news_service.py`) and its YouTube counterpart: a single
//! POST of `{"content_ids": [...]}`, `total_classified` read off a 200
//! body, any other status treated as a full-batch failure.

mod client;

pub use client::HttpClassifierClient;
