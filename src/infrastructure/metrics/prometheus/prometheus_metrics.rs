//! Prometheus metrics implementation.
//!
//! Delegates to the sibling `counters.rs` and `recorder.rs` helpers, which
//! record into the global `metrics` crate registry. A single global handle
//! renders everything in Prometheus text format.

use crate::domain::Metrics;
use std::time::Instant;

/// Prometheus-based metrics implementation.
///
/// Empty because all series live in the global registry; see `recorder.rs`.
pub struct PrometheusMetrics {}

impl PrometheusMetrics {
    pub fn new() -> Self {
        tracing::info!("Creating Prometheus metrics");
        PrometheusMetrics {}
    }
}

impl Metrics for PrometheusMetrics {
    fn render(&self) -> String {
        super::render_metrics()
    }

    fn record_attendance_registered(&self) {
        tracing::debug!("Recording registered check-in");
        super::increment_attendance_registered();
    }

    fn record_attendance_rejected(&self, reason: &'static str) {
        tracing::debug!("Recording rejected check-in: {}", reason);
        super::increment_attendance_rejected(reason);
    }

    fn record_http_request(&self, start: Instant, path: &str, method: &str, status: u16) {
        super::track_http_request(start, path, method, status);
    }
}
