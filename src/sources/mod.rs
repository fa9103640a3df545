// src/sources/mod.rs
pub mod calorie_ninjas;
pub mod catalog;
pub mod edamam;
pub mod open_food_facts;
pub mod scrape;

use std::time::Duration;

use async_trait::async_trait;

use crate::item::NormalizedItem;

/// One upstream data source, normalized behind a uniform boundary.
///
/// `search` never errors: HTTP failures, malformed payloads, and timeouts are
/// absorbed inside the adapter (logged + counted) and surface as an empty
/// result set, so the aggregator treats "no usable result" uniformly.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    async fn search(&self, query: &str) -> Vec<NormalizedItem>;

    fn name(&self) -> &'static str;

    /// Abort window the aggregator applies around each call.
    fn timeout(&self) -> Duration {
        Duration::from_secs(10)
    }
}

/// Shared client constructor: per-adapter request timeout baked in, so a
/// wedged upstream cannot outlive the aggregator's own abort window.
pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Absorb an adapter-internal failure: warn, count, return empty.
pub(crate) fn absorb_error(source: &'static str, err: &anyhow::Error) -> Vec<NormalizedItem> {
    tracing::warn!(error = ?err, source, "source error");
    metrics::counter!("source_errors_total").increment(1);
    Vec::new()
}
