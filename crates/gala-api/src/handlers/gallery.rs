//! Gallery listing: published media for an event, newest first.

use axum::extract::{Path, Query, State};
use axum::{response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use gala_core::models::{MediaRecord, MediaStatus, MediaType};
use gala_core::AppError;
use gala_catalog::MediaListFilter;
use gala_storage::Storage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

const DEFAULT_PAGE_LIMIT: i64 = 30;
const MAX_PAGE_LIMIT: i64 = 100;

#[derive(Debug, Deserialize, IntoParams)]
pub struct GalleryQuery {
    /// Page size, capped at 100.
    pub limit: Option<i64>,
    /// Cursor: return records created strictly before this instant.
    pub cursor: Option<DateTime<Utc>>,
    pub status: Option<MediaStatus>,
    pub media_type: Option<MediaType>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MediaItemResponse {
    pub id: Uuid,
    pub media_type: MediaType,
    pub mime_type: String,
    pub status: MediaStatus,
    pub approved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub large_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumb_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playback_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_sec: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GalleryResponse {
    pub data: Vec<MediaItemResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<DateTime<Utc>>,
}

/// Map a record to its public representation. Derived artifacts resolve to
/// public URLs; a record that has not been processed yet simply has none.
fn to_media_item(record: MediaRecord, storage: &dyn Storage) -> MediaItemResponse {
    let url = |key: &Option<String>| key.as_deref().and_then(|k| storage.public_url(k));

    MediaItemResponse {
        id: record.id,
        media_type: record.media_type,
        mime_type: record.mime_type.clone(),
        status: record.status,
        approved: record.approved,
        caption: record.caption.clone(),
        width: record.width,
        height: record.height,
        large_url: url(&record.large_key),
        thumb_url: url(&record.thumb_key),
        playback_url: url(&record.playback_key),
        poster_url: url(&record.poster_key),
        duration_sec: record.duration_sec,
        created_at: record.created_at,
    }
}

/// List an event's media, cursor-paginated. When the event requires
/// approval, only approved media is returned.
#[utoipa::path(
    get,
    path = "/api/v0/events/{code}/media",
    tag = "events",
    params(
        ("code" = String, Path, description = "Event join code"),
        GalleryQuery
    ),
    responses(
        (status = 200, description = "Event media", body = GalleryResponse),
        (status = 404, description = "Unknown event code", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, query), fields(event_code = %code))]
pub async fn list_event_media(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Query(query): Query<GalleryQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let event = state
        .events
        .find_by_code(&code)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_LIMIT)
        .clamp(1, MAX_PAGE_LIMIT);

    let filter = MediaListFilter {
        approved_only: event.approval_required,
        status: query.status,
        media_type: query.media_type,
        created_before: query.cursor,
        limit,
    };

    let records = state.media.list_for_event(event.id, &filter).await?;

    let next_cursor = if records.len() as i64 == limit {
        records.last().map(|r| r.created_at)
    } else {
        None
    };

    let data = records
        .into_iter()
        .map(|r| to_media_item(r, state.storage.as_ref()))
        .collect();

    Ok(Json(GalleryResponse { data, next_cursor }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gala_storage::LocalStorage;

    fn record() -> MediaRecord {
        MediaRecord {
            id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            media_type: MediaType::Image,
            mime_type: "image/jpeg".to_string(),
            status: MediaStatus::Processed,
            original_key: "events/e/originals/m.jpg".to_string(),
            large_key: Some("events/e/large/m.jpg".to_string()),
            thumb_key: Some("events/e/thumb/m.jpg".to_string()),
            playback_key: None,
            poster_key: None,
            width: Some(2000),
            height: Some(1500),
            duration_sec: None,
            caption: Some("first dance".to_string()),
            uploader_hash: None,
            approved: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn processed_image_maps_to_public_urls() {
        let dir = tempfile::TempDir::new().unwrap();
        let storage =
            LocalStorage::new(dir.path(), "http://localhost:4000/media".to_string())
                .await
                .unwrap();

        let item = to_media_item(record(), &storage);
        assert_eq!(
            item.large_url.as_deref(),
            Some("http://localhost:4000/media/events/e/large/m.jpg")
        );
        assert_eq!(
            item.thumb_url.as_deref(),
            Some("http://localhost:4000/media/events/e/thumb/m.jpg")
        );
        assert!(item.playback_url.is_none());
        assert!(item.poster_url.is_none());
    }

    #[tokio::test]
    async fn pending_record_has_no_artifact_urls() {
        let dir = tempfile::TempDir::new().unwrap();
        let storage =
            LocalStorage::new(dir.path(), "http://localhost:4000/media".to_string())
                .await
                .unwrap();

        let mut rec = record();
        rec.status = MediaStatus::Uploaded;
        rec.large_key = None;
        rec.thumb_key = None;

        let item = to_media_item(rec, &storage);
        assert!(item.large_url.is_none());
        assert!(item.thumb_url.is_none());
    }
}
