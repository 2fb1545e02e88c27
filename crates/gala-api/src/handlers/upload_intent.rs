//! Upload intent: reserve a media record and issue a write credential.

use axum::{extract::State, response::IntoResponse, Json};
use gala_core::constants::{MAX_CAPTION_LEN, MAX_UPLOADER_HASH_LEN};
use gala_core::models::MediaType;
use gala_core::validation::{extension_for, validate_content_type, validate_declared_size};
use gala_core::AppError;
use gala_storage::keys;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct UploadIntentRequest {
    pub event_code: String,
    #[serde(default = "default_media_type")]
    pub media_type: MediaType,
    pub content_type: String,
    pub file_size_bytes: Option<i64>,
    pub caption: Option<String>,
    pub uploader_hash: Option<String>,
}

fn default_media_type() -> MediaType {
    MediaType::Image
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadIntentResponse {
    pub media_id: Uuid,
    pub upload_url: String,
}

/// Create an upload intent: validate the request, create a PENDING_UPLOAD
/// record, and return a time-boxed signed PUT URL.
#[utoipa::path(
    post,
    path = "/api/v0/uploads/intent",
    tag = "uploads",
    request_body = UploadIntentRequest,
    responses(
        (status = 200, description = "Intent created", body = UploadIntentResponse),
        (status = 400, description = "Invalid input or capacity limit reached", body = ErrorResponse),
        (status = 404, description = "Unknown event code", body = ErrorResponse),
        (status = 413, description = "Declared size over limit", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, request),
    fields(event_code = %request.event_code, media_type = %request.media_type)
)]
pub async fn create_upload_intent(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UploadIntentRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    if request.event_code.len() < 4 {
        return Err(AppError::InvalidInput("Event code is too short".to_string()).into());
    }
    if let Some(ref caption) = request.caption {
        if caption.len() > MAX_CAPTION_LEN {
            return Err(AppError::InvalidInput(format!(
                "Caption exceeds {} characters",
                MAX_CAPTION_LEN
            ))
            .into());
        }
    }
    if let Some(ref hash) = request.uploader_hash {
        if hash.len() > MAX_UPLOADER_HASH_LEN {
            return Err(AppError::InvalidInput("Uploader hash is too long".to_string()).into());
        }
    }

    validate_content_type(request.media_type, &request.content_type)?;
    validate_declared_size(request.media_type, request.file_size_bytes)?;

    let event = state
        .events
        .find_by_code(&request.event_code)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    // Two independent counters, each against an optional event-level ceiling.
    // Exceeding either issues no credential and creates no record.
    if let Some(max_total) = event.max_uploads_total {
        let total = state.media.count_for_event(event.id).await?;
        if total >= max_total as i64 {
            return Err(AppError::CapacityLimitReached {
                resource: "event uploads".to_string(),
                used: total,
                limit: max_total as i64,
            }
            .into());
        }
    }
    if let (Some(max_per_guest), Some(uploader_hash)) = (
        event.max_uploads_per_guest,
        request.uploader_hash.as_deref(),
    ) {
        let count = state
            .media
            .count_for_uploader(event.id, uploader_hash)
            .await?;
        if count >= max_per_guest as i64 {
            return Err(AppError::CapacityLimitReached {
                resource: "guest uploads".to_string(),
                used: count,
                limit: max_per_guest as i64,
            }
            .into());
        }
    }

    let media_id = Uuid::new_v4();
    let ext = extension_for(request.media_type, &request.content_type);
    let original_key = keys::original_key(event.id, media_id, ext);

    // The record (with its original key) is persisted before the credential
    // is requested, so a crash after issuance still leaves it locatable.
    let record = state
        .media
        .create_pending(
            media_id,
            event.id,
            request.media_type,
            &request.content_type,
            &original_key,
            request.caption.as_deref(),
            request.uploader_hash.as_deref(),
            !event.approval_required,
        )
        .await?;

    let upload_url = state
        .storage
        .signed_put_url(
            &original_key,
            &request.content_type,
            Duration::from_secs(state.config.upload_url_ttl_secs),
        )
        .await?;

    tracing::info!(
        media_id = %record.id,
        event_id = %event.id,
        original_key = %original_key,
        "Upload intent created"
    );

    Ok(Json(UploadIntentResponse {
        media_id: record.id,
        upload_url,
    }))
}
