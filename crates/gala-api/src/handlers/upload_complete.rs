//! Upload completion: flip the record to UPLOADED and enqueue processing.

use axum::{extract::State, response::IntoResponse, Json};
use gala_core::models::{MediaStatus, ProcessMediaPayload};
use gala_core::AppError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CompleteUploadRequest {
    pub media_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CompleteUploadResponse {
    pub media_id: Uuid,
    pub status: MediaStatus,
}

/// Mark an upload complete and enqueue its processing job.
///
/// Idempotent at the status write; duplicate calls enqueue duplicate jobs,
/// which the worker tolerates via its redelivery guard. Moderation state is
/// untouched: `approved` keeps the value set at intent time.
#[utoipa::path(
    post,
    path = "/api/v0/uploads/complete",
    tag = "uploads",
    request_body = CompleteUploadRequest,
    responses(
        (status = 200, description = "Upload completed, processing queued", body = CompleteUploadResponse),
        (status = 404, description = "Unknown media id", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(media_id = %request.media_id))]
pub async fn complete_upload(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CompleteUploadRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let record = state
        .media
        .find_by_id(request.media_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Media record not found".to_string()))?;

    state.media.mark_uploaded(record.id).await?;

    state
        .queue
        .submit(&ProcessMediaPayload {
            media_id: record.id,
        })
        .await?;

    tracing::info!(media_id = %record.id, "Upload completed, processing job queued");

    Ok(Json(CompleteUploadResponse {
        media_id: record.id,
        status: MediaStatus::Uploaded,
    }))
}
