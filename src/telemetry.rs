//! Interaction telemetry. The aggregator and adapters report events through
//! the narrow [`EventSink`] interface without depending on where they go;
//! Prometheus series are registered once so they show up on /metrics before
//! the first increment.

use once_cell::sync::OnceCell;

use metrics::{describe_counter, describe_histogram};

/// Fire-and-forget event recording. Implementations must not block or fail
/// the caller.
pub trait EventSink: Send + Sync {
    fn record(&self, event: &str, detail: &str);
}

/// Default sink: structured tracing events.
#[derive(Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: &str, detail: &str) {
        tracing::info!(target: "telemetry", event, detail, "interaction");
    }
}

/// Sink that drops everything; used in tests.
#[derive(Debug, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn record(&self, _event: &str, _detail: &str) {}
}

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("search_requests_total", "Aggregate search calls.");
        describe_counter!("cache_hits_total", "Aggregate cache hits.");
        describe_counter!("cache_misses_total", "Aggregate cache misses.");
        describe_counter!(
            "source_attempts_total",
            "Individual source adapter attempts."
        );
        describe_counter!(
            "source_errors_total",
            "Source fetch/parse/timeout failures."
        );
        describe_counter!(
            "search_fallback_total",
            "Searches resolved with synthetic placeholder data."
        );
        describe_histogram!("search_latency_ms", "End-to-end aggregate latency.");
    });
}
