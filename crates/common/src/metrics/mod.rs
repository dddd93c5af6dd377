//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with latency histograms
//! and standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all MedQA metrics
pub const METRICS_PREFIX: &str = "medqa";

/// Histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001, // 1ms
    0.005, // 5ms
    0.010, // 10ms
    0.025, // 25ms
    0.050, // 50ms
    0.100, // 100ms
    0.250, // 250ms
    0.500, // 500ms
    1.000, // 1s
    3.000, // 3s - default graph query deadline
    10.00, // 10s
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

    // Pipeline metrics
    describe_counter!(
        format!("{}_questions_total", METRICS_PREFIX),
        Unit::Count,
        "Questions processed, labelled by outcome"
    );

    describe_histogram!(
        format!("{}_pipeline_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "End-to-end QA pipeline latency in seconds"
    );

    // Graph store metrics
    describe_counter!(
        format!("{}_graph_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total graph store calls"
    );

    describe_counter!(
        format!("{}_graph_errors_total", METRICS_PREFIX),
        Unit::Count,
        "Graph store calls that failed or timed out"
    );

    describe_histogram!(
        format!("{}_graph_query_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Graph store call latency in seconds"
    );

    // Recommendation metrics
    describe_counter!(
        format!("{}_recommendations_total", METRICS_PREFIX),
        Unit::Count,
        "Follow-up questions generated from graph neighbours"
    );

    describe_counter!(
        format!("{}_recommendation_fillers_total", METRICS_PREFIX),
        Unit::Count,
        "Times the generic filler list was used"
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

/// Helper to record one pass through the QA pipeline
pub fn record_question(duration_secs: f64, outcome: &str) {
    counter!(
        format!("{}_questions_total", METRICS_PREFIX),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_pipeline_duration_seconds", METRICS_PREFIX),
        "outcome" => outcome.to_string()
    )
    .record(duration_secs);
}

/// Helper to record graph store metrics
pub fn record_graph_query(duration_secs: f64, operation: &str, backend: &str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_graph_queries_total", METRICS_PREFIX),
        "operation" => operation.to_string(),
        "backend" => backend.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    if success {
        histogram!(
            format!("{}_graph_query_duration_seconds", METRICS_PREFIX),
            "operation" => operation.to_string(),
            "backend" => backend.to_string()
        )
        .record(duration_secs);
    } else {
        counter!(
            format!("{}_graph_errors_total", METRICS_PREFIX),
            "operation" => operation.to_string(),
            "backend" => backend.to_string()
        )
        .increment(1);
    }
}

/// Helper to record recommendation metrics
pub fn record_recommendations(generated: usize, used_filler: bool) {
    counter!(format!("{}_recommendations_total", METRICS_PREFIX)).increment(generated as u64);

    if used_filler {
        counter!(format!("{}_recommendation_fillers_total", METRICS_PREFIX)).increment(1);
    }
}
