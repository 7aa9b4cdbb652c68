use metrics::{counter, histogram};
use std::time::Instant;

/// Increment the counter of accepted check-ins.
pub fn increment_attendance_registered() {
    counter!("attendance_registered_total").increment(1);
}

/// Increment the counter of rejected check-ins for one failure reason.
pub fn increment_attendance_rejected(reason: &'static str) {
    counter!("attendance_rejected_total", "reason" => reason).increment(1);
}

/// Track HTTP request latency using a histogram.
pub fn track_http_request(start: Instant, path: &str, method: &str, status: u16) {
    let elapsed = start.elapsed();
    histogram!(
        "http_request_duration_seconds",
        "path" => path.to_string(),
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .record(elapsed);
}
