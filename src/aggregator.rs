//! # Aggregator
//! Orchestrates the source adapters in priority order with cache and
//! fallback policy. Iteration is strictly sequential: each adapter is awaited
//! to completion (or aborted by its timeout) before the next is tried, and
//! the first non-empty result set wins. When every source comes back empty
//! the deterministic placeholder generator fills in, tagged `synthetic` and
//! deliberately not cached so a retry can still reach real data.
//!
//! `aggregate` never fails and never returns an empty sequence; the synthetic
//! tag is the only signal that the data is made up, and callers must carry it
//! through to whatever surface they render.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::cache::TtlCache;
use crate::fallback::synthetic_results;
use crate::item::NormalizedItem;
use crate::sources::SourceAdapter;
use crate::telemetry::{ensure_metrics_described, EventSink, TracingSink};

/// Consecutive failures before an adapter loses its "working" flag.
const ERROR_THRESHOLD: u32 = 3;

/// Mutable per-adapter health, owned by the aggregator instance so tests can
/// run independent aggregators with independent state.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SourceHealth {
    pub working: bool,
    pub error_count: u32,
    /// When the adapter was last attempted; `None` until the first call.
    pub last_checked: Option<DateTime<Utc>>,
}

impl Default for SourceHealth {
    fn default() -> Self {
        Self {
            working: true,
            error_count: 0,
            last_checked: None,
        }
    }
}

pub struct Aggregator {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    cache: TtlCache<Vec<NormalizedItem>>,
    health: Mutex<HashMap<&'static str, SourceHealth>>,
    sink: Arc<dyn EventSink>,
}

impl Aggregator {
    pub fn new(adapters: Vec<Arc<dyn SourceAdapter>>, cache_ttl: Duration) -> Self {
        Self::with_sink(adapters, cache_ttl, Arc::new(TracingSink))
    }

    pub fn with_sink(
        adapters: Vec<Arc<dyn SourceAdapter>>,
        cache_ttl: Duration,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let health = adapters
            .iter()
            .map(|a| (a.name(), SourceHealth::default()))
            .collect();
        Self {
            adapters,
            cache: TtlCache::new(cache_ttl),
            health: Mutex::new(health),
            sink,
        }
    }

    /// Run a search across the adapters. Infallible: worst case the result is
    /// synthetic placeholder data.
    pub async fn aggregate(
        &self,
        query: &str,
        preferred: Option<&str>,
    ) -> Vec<NormalizedItem> {
        ensure_metrics_described();
        counter!("search_requests_total").increment(1);
        let started = Instant::now();

        let order = self.ordering(preferred);
        // The signature folds the effective preference into the cache key, so
        // differently-ordered requests never serve each other's results.
        let signature = order
            .first()
            .map(|&i| self.adapters[i].name())
            .unwrap_or("default");
        let key = cache_key(query, signature);

        if let Some(hit) = self.cache.get(&key) {
            counter!("cache_hits_total").increment(1);
            self.sink.record("cache_hit", query);
            return hit;
        }
        counter!("cache_misses_total").increment(1);

        for idx in order {
            let adapter = &self.adapters[idx];
            let name = adapter.name();
            counter!("source_attempts_total").increment(1);
            self.sink.record("source_attempt", name);

            let outcome =
                tokio::time::timeout(adapter.timeout(), adapter.search(query)).await;
            match outcome {
                Ok(mut items) if !items.is_empty() => {
                    self.mark_success(name);
                    for item in &mut items {
                        item.source = name.to_string();
                    }
                    self.cache.set(&key, items.clone());
                    histogram!("search_latency_ms")
                        .record(started.elapsed().as_secs_f64() * 1_000.0);
                    self.sink.record("source_win", name);
                    return items;
                }
                Ok(_) => {
                    self.mark_failure(name);
                }
                Err(_elapsed) => {
                    tracing::warn!(source = name, "adapter timed out");
                    counter!("source_errors_total").increment(1);
                    self.mark_failure(name);
                }
            }
        }

        // Every adapter (and its internal fallbacks) came back empty.
        counter!("search_fallback_total").increment(1);
        self.sink.record("synthetic_fallback", query);
        histogram!("search_latency_ms").record(started.elapsed().as_secs_f64() * 1_000.0);
        synthetic_results(query)
    }

    /// Adapter indexes in attempt order: the preferred source moves first only
    /// while its working flag holds; everything else keeps the default order.
    fn ordering(&self, preferred: Option<&str>) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.adapters.len()).collect();
        if let Some(pref) = preferred {
            let healthy = self.is_healthy(pref);
            if healthy {
                if let Some(pos) = order
                    .iter()
                    .position(|&i| self.adapters[i].name() == pref)
                {
                    let idx = order.remove(pos);
                    order.insert(0, idx);
                }
            }
        }
        order
    }

    pub fn is_healthy(&self, name: &str) -> bool {
        self.health
            .lock()
            .expect("health mutex poisoned")
            .get(name)
            .map(|h| h.working)
            .unwrap_or(false)
    }

    /// Snapshot of every adapter's health, in default order.
    pub fn health_snapshot(&self) -> Vec<(String, SourceHealth)> {
        let map = self.health.lock().expect("health mutex poisoned");
        self.adapters
            .iter()
            .map(|a| {
                let h = map.get(a.name()).copied().unwrap_or_default();
                (a.name().to_string(), h)
            })
            .collect()
    }

    /// Entries currently in the result cache (expired ones included until
    /// read). Exposed for tests and the status endpoint.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    fn mark_success(&self, name: &'static str) {
        let mut map = self.health.lock().expect("health mutex poisoned");
        let h = map.entry(name).or_default();
        h.working = true;
        h.error_count = 0;
        h.last_checked = Some(Utc::now());
    }

    fn mark_failure(&self, name: &'static str) {
        let mut map = self.health.lock().expect("health mutex poisoned");
        let h = map.entry(name).or_default();
        h.error_count = h.error_count.saturating_add(1);
        if h.error_count >= ERROR_THRESHOLD {
            h.working = false;
        }
        h.last_checked = Some(Utc::now());
    }
}

/// Cache key: sha256 over query + ordering signature. Hashing keeps keys
/// uniform regardless of query length or characters.
fn cache_key(query: &str, signature: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(query.trim().to_lowercase().as_bytes());
    hasher.update(b"|");
    hasher.update(signature.as_bytes());
    format!("search:{:x}", hasher.finalize())
}
