use crate::app_state::AppState;
use crate::attendance::{today, DailyKey, KeyScope, VerifiedLocation};
use crate::domain::{ReportedFix, Subject, SUBJECTS};
use crate::error::AttendanceError;
use crate::handlers::shared_types::ApiResponse;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

/// The daily key as shown on the "Today's Key" panel.
#[derive(Serialize)]
pub struct KeyView {
    #[serde(flatten)]
    key: DailyKey,
    scope: KeyScope,
}

/// Body of `POST /location/verify`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VerifyLocationRequest {
    wallet_address: Option<String>,
    location: Option<ReportedFix>,
}

/// Handler for `GET /subjects`: the static subject catalog.
pub async fn list_subjects() -> ApiResponse<&'static [Subject]> {
    ApiResponse::new(SUBJECTS)
}

/// Handler for `GET /key`: the key currently accepted by `POST /attendance`.
pub async fn current_key(State(state): State<AppState>) -> ApiResponse<KeyView> {
    // ---
    let keys = state.registrar().keys();
    ApiResponse::new(KeyView {
        key: keys.current(today()).await,
        scope: keys.scope(),
    })
}

/// Handler for `POST /location/verify`.
///
/// Takes a fix (the reported one, else the server-side fallback) and checks
/// it against the geofence. Out-of-range fixes are rejected with the distance
/// in the error message.
#[tracing::instrument(skip(state, request))]
pub async fn verify_location(
    State(state): State<AppState>,
    Json(request): Json<VerifyLocationRequest>,
) -> Result<ApiResponse<VerifiedLocation>, AttendanceError> {
    // ---
    let verified = state
        .registrar()
        .verify_location(request.wallet_address.as_deref(), request.location.as_ref())
        .await?;

    tracing::info!(
        "Location verified {:.2} km from the reference point",
        verified.check.distance_km
    );
    Ok(ApiResponse::new(verified))
}
