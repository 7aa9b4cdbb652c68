//! Check-in failure taxonomy.
//!
//! Every failure a check-in can hit is a variant of [`AttendanceError`]. None of
//! them are fatal: handlers turn them into a JSON body with a stable `code` so the
//! client can show a notification and let the user retry.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AttendanceError {
    #[error("Geolocation is not supported by this device.")]
    LocationUnsupported,

    #[error("Location permission denied. Please enable it in your device settings.")]
    LocationPermissionDenied,

    #[error("Location information is unavailable.")]
    LocationUnavailable,

    #[error("The request to get the device location timed out.")]
    LocationTimeout,

    #[error("An unknown error occurred while acquiring the device location.")]
    LocationUnknown,

    #[error("Location is not verified. Please verify your location first.")]
    LocationMissing,

    #[error("A location request is already in progress.")]
    LocationRequestPending,

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("You are {distance_km:.2} km away. You must be within {max_km} km of the allowed location.")]
    OutOfRange { distance_km: f64, max_km: f64 },

    #[error("Wallet not found. Please sign in and connect your wallet first.")]
    WalletNotFound,

    #[error("No accounts found. Please ensure your wallet is unlocked and has accounts.")]
    WalletNoAccounts,

    #[error("Connection request rejected by user.")]
    WalletRejected,

    #[error("A wallet request is already pending. Please check your wallet.")]
    WalletRequestPending,

    #[error("Wallet provider error: {0}")]
    WalletProvider(String),

    #[error("Balance unavailable: {0}")]
    BalanceUnavailable(String),

    #[error("Please select a subject.")]
    SubjectMissing,

    #[error("Please enter the daily key provided for the class.")]
    KeyMissing,

    #[error("The entered key does not match today's key.")]
    KeyMismatch,

    #[error("Attendance record not found: {0}")]
    RecordNotFound(String),

    #[error("Storage error: {0}")]
    StorageError(String),
}

impl AttendanceError {
    // ---

    /// Stable machine-readable code, also used as the metrics `reason` label.
    pub fn code(&self) -> &'static str {
        // ---
        match self {
            AttendanceError::LocationUnsupported => "LOCATION_UNSUPPORTED",
            AttendanceError::LocationPermissionDenied => "LOCATION_PERMISSION_DENIED",
            AttendanceError::LocationUnavailable => "LOCATION_UNAVAILABLE",
            AttendanceError::LocationTimeout => "LOCATION_TIMEOUT",
            AttendanceError::LocationUnknown => "LOCATION_UNKNOWN",
            AttendanceError::LocationMissing => "LOCATION_MISSING",
            AttendanceError::LocationRequestPending => "LOCATION_REQUEST_PENDING",
            AttendanceError::InvalidCoordinates(_) => "INVALID_COORDINATES",
            AttendanceError::OutOfRange { .. } => "OUT_OF_RANGE",
            AttendanceError::WalletNotFound => "WALLET_NOT_FOUND",
            AttendanceError::WalletNoAccounts => "WALLET_NO_ACCOUNTS",
            AttendanceError::WalletRejected => "WALLET_REJECTED",
            AttendanceError::WalletRequestPending => "WALLET_REQUEST_PENDING",
            AttendanceError::WalletProvider(_) => "WALLET_PROVIDER",
            AttendanceError::BalanceUnavailable(_) => "BALANCE_UNAVAILABLE",
            AttendanceError::SubjectMissing => "SUBJECT_MISSING",
            AttendanceError::KeyMissing => "KEY_MISSING",
            AttendanceError::KeyMismatch => "KEY_MISMATCH",
            AttendanceError::RecordNotFound(_) => "RECORD_NOT_FOUND",
            AttendanceError::StorageError(_) => "STORAGE_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        // ---
        match self {
            AttendanceError::LocationUnsupported => StatusCode::NOT_IMPLEMENTED,
            AttendanceError::LocationPermissionDenied => StatusCode::FORBIDDEN,
            AttendanceError::LocationUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AttendanceError::LocationTimeout => StatusCode::GATEWAY_TIMEOUT,
            AttendanceError::LocationUnknown => StatusCode::BAD_GATEWAY,
            AttendanceError::LocationRequestPending | AttendanceError::WalletRequestPending => {
                StatusCode::CONFLICT
            }
            AttendanceError::OutOfRange { .. }
            | AttendanceError::KeyMismatch
            | AttendanceError::WalletRejected => StatusCode::FORBIDDEN,
            AttendanceError::LocationMissing
            | AttendanceError::InvalidCoordinates(_)
            | AttendanceError::SubjectMissing
            | AttendanceError::KeyMissing => StatusCode::UNPROCESSABLE_ENTITY,
            AttendanceError::WalletNotFound | AttendanceError::WalletNoAccounts => {
                StatusCode::UNAUTHORIZED
            }
            AttendanceError::WalletProvider(_) | AttendanceError::BalanceUnavailable(_) => {
                StatusCode::BAD_GATEWAY
            }
            AttendanceError::RecordNotFound(_) => StatusCode::NOT_FOUND,
            AttendanceError::StorageError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AttendanceError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.to_string(),
            "code": self.code(),
        }));

        (self.status(), body).into_response()
    }
}
