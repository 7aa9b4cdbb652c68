use crate::app_state::AppState;
use crate::attendance::WalletStatus;
use crate::error::AttendanceError;
use crate::handlers::shared_types::ApiResponse;
use axum::{extract::State, http::StatusCode};

/// Handler for `POST /wallet/connect`.
///
/// Asks the provider for account access, remembers the address for later
/// check-ins and returns the session status with the first balance read.
#[tracing::instrument(skip(state))]
pub async fn connect_wallet(
    State(state): State<AppState>,
) -> Result<ApiResponse<WalletStatus>, AttendanceError> {
    // ---
    state.registrar().connect_wallet().await?;
    Ok(ApiResponse::new(state.registrar().wallet().status().await))
}

/// Handler for `POST /wallet/disconnect`.
pub async fn disconnect_wallet(State(state): State<AppState>) -> StatusCode {
    // ---
    state.registrar().disconnect_wallet().await;
    StatusCode::NO_CONTENT
}

/// Handler for `GET /wallet`: account, chain and a freshly read balance.
pub async fn wallet_status(State(state): State<AppState>) -> ApiResponse<WalletStatus> {
    // ---
    ApiResponse::new(state.registrar().wallet().refresh_balance().await)
}
