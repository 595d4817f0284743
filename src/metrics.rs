//! Prometheus metrics for store traffic
//!
//! Counters are process-wide and exported on `GET /_metrics`. The documents
//! gauge is refreshed from the served store when metrics are scraped.

use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use tracing::info;

lazy_static::lazy_static! {
    /// Global metrics registry
    pub static ref METRICS_REGISTRY: Registry = Registry::new();

    pub static ref WRITES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("docstore_writes_total", "Total save operations"),
        &["outcome"]
    ).unwrap();

    pub static ref READS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("docstore_reads_total", "Total get and query operations"),
        &["op", "outcome"]
    ).unwrap();

    pub static ref DOCUMENTS: IntGauge = IntGauge::new(
        "docstore_documents",
        "Number of documents in the served store"
    ).unwrap();
}

/// Register all metrics with the global registry.
///
/// Safe to call more than once.
pub fn init_metrics() {
    METRICS_REGISTRY.register(Box::new(WRITES_TOTAL.clone())).ok();
    METRICS_REGISTRY.register(Box::new(READS_TOTAL.clone())).ok();
    METRICS_REGISTRY.register(Box::new(DOCUMENTS.clone())).ok();
    info!("Metrics initialized");
}

/// Record a save; outcome is `created`, `updated` or `rejected`.
pub fn record_write(outcome: &str) {
    WRITES_TOTAL.with_label_values(&[outcome]).inc();
}

/// Record a read; op is `get` or `query`.
pub fn record_read(op: &str, outcome: &str) {
    READS_TOTAL.with_label_values(&[op, outcome]).inc();
}

/// Export metrics in Prometheus text format
pub fn export_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = vec![];
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("UTF-8 conversion error: {}", e)))
}
