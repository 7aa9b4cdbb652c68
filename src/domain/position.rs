use super::models::GeoPoint;
use crate::error::AttendanceError;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Options for a one-shot position fix, mirroring the platform geolocation API.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionOptions {
    // ---
    pub enable_high_accuracy: bool,

    /// Deadline for the whole fix. A miss surfaces as `LocationTimeout`.
    pub timeout: Duration,

    /// Oldest cached fix a source may return. Zero forces a fresh fix.
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: true,
            timeout: Duration::from_secs(10),
            maximum_age: Duration::ZERO,
        }
    }
}

/// Something that can produce a one-shot position fix.
#[async_trait::async_trait]
pub trait PositionSource: Send + Sync {
    // ---
    async fn current_position(
        &self,
        options: &PositionOptions,
    ) -> Result<GeoPoint, AttendanceError>;
}

/// Type alias for any backend that implements PositionSource.
pub type PositionSourcePtr = Arc<dyn PositionSource>;

/// Error classes a client device can report instead of coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FixErrorKind {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
    Unsupported,
    Unknown,
}

impl From<FixErrorKind> for AttendanceError {
    fn from(kind: FixErrorKind) -> Self {
        match kind {
            FixErrorKind::PermissionDenied => AttendanceError::LocationPermissionDenied,
            FixErrorKind::PositionUnavailable => AttendanceError::LocationUnavailable,
            FixErrorKind::Timeout => AttendanceError::LocationTimeout,
            FixErrorKind::Unsupported => AttendanceError::LocationUnsupported,
            FixErrorKind::Unknown => AttendanceError::LocationUnknown,
        }
    }
}

/// The outcome of a fix taken on the client device and sent with the request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ReportedFix {
    Coordinates { latitude: f64, longitude: f64 },
    Error { error: FixErrorKind },
}

#[async_trait::async_trait]
impl PositionSource for ReportedFix {
    // ---
    async fn current_position(&self, _: &PositionOptions) -> Result<GeoPoint, AttendanceError> {
        // ---
        match *self {
            ReportedFix::Coordinates {
                latitude,
                longitude,
            } => GeoPoint::new(latitude, longitude),
            ReportedFix::Error { error } => Err(error.into()),
        }
    }
}
