use crate::app_state::AppState;
use crate::attendance::{Receipt, Submission};
use crate::domain::{subject_label, AttendanceRecord};
use crate::error::AttendanceError;
use crate::handlers::shared_types::ApiResponse;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

/// A stored record plus its display fields, as listed in the log.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordView {
    #[serde(flatten)]
    record: AttendanceRecord,
    subject_label: String,
    display_time: String,
}

impl From<AttendanceRecord> for RecordView {
    fn from(record: AttendanceRecord) -> Self {
        // ---
        let subject_label = subject_label(&record.subject).to_string();
        let display_time = record.display_time();
        RecordView {
            record,
            subject_label,
            display_time,
        }
    }
}

/// Handler for `POST /attendance`.
///
/// Runs the full check-in pipeline. On success responds with `201 Created`
/// and the receipt; otherwise with the first failing check's error.
pub async fn submit_attendance(
    State(state): State<AppState>,
    Json(submission): Json<Submission>,
) -> Result<(StatusCode, ApiResponse<Receipt>), AttendanceError> {
    // ---
    let receipt = state.registrar().submit(submission).await?;
    Ok((StatusCode::CREATED, ApiResponse::new(receipt)))
}

/// Handler for `GET /attendance`: every record, newest first.
pub async fn list_attendance(State(state): State<AppState>) -> ApiResponse<Vec<RecordView>> {
    // ---
    let records = state.registrar().records().await;
    ApiResponse::new(records.into_iter().map(RecordView::from).collect())
}

/// Handler for `DELETE /attendance/{id}`.
///
/// - `204 No Content` when the record was removed.
/// - `404 Not Found` when no record has that id.
#[tracing::instrument(skip(state))]
pub async fn delete_attendance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AttendanceError> {
    // ---
    state.registrar().delete_record(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
