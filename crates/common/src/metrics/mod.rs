//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Leadbook metrics
pub const METRICS_PREFIX: &str = "leadbook";

/// Histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005, // 5ms
    0.010, // 10ms
    0.025, // 25ms
    0.050, // 50ms
    0.100, // 100ms
    0.250, // 250ms
    0.500, // 500ms
    1.000, // 1s
    2.500, // 2.5s
    5.000, // 5s
];

/// Buckets for whole import runs (large files take a while)
pub const IMPORT_BUCKETS: &[f64] = &[
    0.100, // 100ms
    0.500, // 500ms
    1.000, // 1s
    5.000, // 5s
    15.00, // 15s
    30.00, // 30s
    60.00, // 1m
    300.0, // 5m
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Import metrics
    describe_counter!(
        format!("{}_imports_total", METRICS_PREFIX),
        Unit::Count,
        "Total import runs, labelled by outcome"
    );

    describe_counter!(
        format!("{}_leads_imported_total", METRICS_PREFIX),
        Unit::Count,
        "Total leads inserted by imports"
    );

    describe_counter!(
        format!("{}_categories_created_total", METRICS_PREFIX),
        Unit::Count,
        "Total categories created by imports"
    );

    describe_counter!(
        format!("{}_import_group_failures_total", METRICS_PREFIX),
        Unit::Count,
        "Category groups that hit a store error, labelled by stage"
    );

    describe_histogram!(
        format!("{}_import_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Import run latency in seconds"
    );

    // Lead metrics
    describe_counter!(
        format!("{}_lead_updates_total", METRICS_PREFIX),
        Unit::Count,
        "Total lead updates, labelled by resulting status"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Helper to record a finished import run
pub fn record_import(duration_secs: f64, leads_imported: usize, categories_created: usize, failed_groups: usize) {
    let outcome = if failed_groups == 0 { "complete" } else { "partial" };

    counter!(
        format!("{}_imports_total", METRICS_PREFIX),
        "outcome" => outcome
    )
    .increment(1);

    counter!(format!("{}_leads_imported_total", METRICS_PREFIX)).increment(leads_imported as u64);

    counter!(format!("{}_categories_created_total", METRICS_PREFIX))
        .increment(categories_created as u64);

    histogram!(format!("{}_import_duration_seconds", METRICS_PREFIX)).record(duration_secs);
}

/// Helper to record an import run that aborted before any write
pub fn record_import_aborted() {
    counter!(
        format!("{}_imports_total", METRICS_PREFIX),
        "outcome" => "aborted"
    )
    .increment(1);
}

/// Helper to record a failed import group
pub fn record_group_failure(stage: &'static str) {
    counter!(
        format!("{}_import_group_failures_total", METRICS_PREFIX),
        "stage" => stage
    )
    .increment(1);
}

/// Helper to record a lead update
pub fn record_lead_update(status: &str) {
    counter!(
        format!("{}_lead_updates_total", METRICS_PREFIX),
        "status" => status.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buckets_sorted() {
        for buckets in [LATENCY_BUCKETS, IMPORT_BUCKETS] {
            let mut prev = 0.0;
            for &bucket in buckets {
                assert!(bucket > prev);
                prev = bucket;
            }
        }
    }

    #[test]
    fn test_recorders_without_exporter() {
        // No recorder installed: every helper must be a no-op
        let metrics = RequestMetrics::start("POST", "/v1/imports");
        metrics.finish(200);
        record_import(0.2, 10, 1, 0);
        record_import_aborted();
        record_group_failure("insert_leads");
        record_lead_update("Interested");
    }
}
