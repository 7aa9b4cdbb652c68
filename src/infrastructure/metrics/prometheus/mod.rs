mod counters;
mod prometheus_metrics;
mod recorder;

pub use prometheus_metrics::PrometheusMetrics;
use std::sync::Arc;

pub(crate) use counters::{
    increment_attendance_registered, increment_attendance_rejected, track_http_request,
};
pub(crate) use recorder::{init_metrics, render_metrics};

/// Creates a new Prometheus metrics implementation.
///
/// Series are exposed in Prometheus text format through the `/metrics` route.
pub fn create() -> anyhow::Result<crate::domain::MetricsPtr> {
    tracing::info!("Initializing Prometheus metrics");
    init_metrics()?;

    Ok(Arc::new(PrometheusMetrics::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_is_repeatable() {
        assert!(create().is_ok());
        assert!(create().is_ok());
    }

    #[test]
    fn rejections_are_labelled_by_reason() {
        let metrics = create().unwrap();
        metrics.record_attendance_rejected("KEY_MISMATCH");
        metrics.record_attendance_registered();

        let body = metrics.render();
        assert!(body.contains("attendance_rejected_total"));
        assert!(body.contains(r#"reason="KEY_MISMATCH""#));
        assert!(body.contains("attendance_registered_total"));
    }
}
