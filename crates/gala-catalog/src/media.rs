//! Media record repository.
//!
//! Status and derived keys are mutated exclusively by the intent issuer,
//! completion handler, and worker. `complete_image`/`complete_video` perform
//! the single logical update that flips a record to PROCESSED, so a record is
//! never PROCESSED with missing keys.

use chrono::{DateTime, Utc};
use gala_core::models::{MediaRecord, MediaStatus, MediaType};
use gala_core::AppError;
use sqlx::PgPool;
use uuid::Uuid;

const MEDIA_COLUMNS: &str = r#"
    id, event_id, media_type, mime_type, status, original_key,
    large_key, thumb_key, playback_key, poster_key,
    width, height, duration_sec, caption, uploader_hash, approved,
    created_at, updated_at
"#;

/// Filters for gallery listings.
#[derive(Debug, Default, Clone)]
pub struct MediaListFilter {
    pub approved_only: bool,
    pub status: Option<MediaStatus>,
    pub media_type: Option<MediaType>,
    /// Cursor: only records created strictly before this instant.
    pub created_before: Option<DateTime<Utc>>,
    pub limit: i64,
}

#[derive(Clone)]
pub struct MediaRepository {
    pool: PgPool,
}

impl MediaRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the placeholder record for a new upload intent.
    ///
    /// `original_key` is persisted here, before any upload credential is
    /// issued, so a crash after credential issuance still leaves a locatable
    /// record.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_pending(
        &self,
        id: Uuid,
        event_id: Uuid,
        media_type: MediaType,
        mime_type: &str,
        original_key: &str,
        caption: Option<&str>,
        uploader_hash: Option<&str>,
        approved: bool,
    ) -> Result<MediaRecord, AppError> {
        let record = sqlx::query_as::<_, MediaRecord>(&format!(
            r#"
            INSERT INTO media (id, event_id, media_type, mime_type, status,
                               original_key, caption, uploader_hash, approved)
            VALUES ($1, $2, $3, $4, 'PENDING_UPLOAD', $5, $6, $7, $8)
            RETURNING {MEDIA_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(event_id)
        .bind(media_type)
        .bind(mime_type)
        .bind(original_key)
        .bind(caption)
        .bind(uploader_hash)
        .bind(approved)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<MediaRecord>, AppError> {
        let record = sqlx::query_as::<_, MediaRecord>(&format!(
            "SELECT {MEDIA_COLUMNS} FROM media WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Total records for an event, compared against `max_uploads_total`.
    pub async fn count_for_event(&self, event_id: Uuid) -> Result<i64, AppError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM media WHERE event_id = $1")
                .bind(event_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Records attributed to one uploader identity within an event, compared
    /// against `max_uploads_per_guest`.
    pub async fn count_for_uploader(
        &self,
        event_id: Uuid,
        uploader_hash: &str,
    ) -> Result<i64, AppError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM media WHERE event_id = $1 AND uploader_hash = $2",
        )
        .bind(event_id)
        .bind(uploader_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// PENDING_UPLOAD → UPLOADED. Idempotent; setting UPLOADED twice is
    /// harmless.
    pub async fn mark_uploaded(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE media SET status = 'UPLOADED', updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Terminal for the current attempt lineage. The original key is
    /// retained so reprocessing never requires a re-upload.
    pub async fn mark_failed(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE media SET status = 'FAILED', updated_at = now() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Single logical update to PROCESSED for an image: both derived keys and
    /// the large variant's dimensions land together.
    pub async fn complete_image(
        &self,
        id: Uuid,
        large_key: &str,
        thumb_key: &str,
        width: i32,
        height: i32,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE media
            SET status = 'PROCESSED', large_key = $2, thumb_key = $3,
                width = $4, height = $5, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(large_key)
        .bind(thumb_key)
        .bind(width)
        .bind(height)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Single logical update to PROCESSED for a video, with dimensions and
    /// duration taken from the transcoded output.
    #[allow(clippy::too_many_arguments)]
    pub async fn complete_video(
        &self,
        id: Uuid,
        playback_key: &str,
        poster_key: &str,
        width: i32,
        height: i32,
        duration_sec: i32,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE media
            SET status = 'PROCESSED', playback_key = $2, poster_key = $3,
                width = $4, height = $5, duration_sec = $6, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(playback_key)
        .bind(poster_key)
        .bind(width)
        .bind(height)
        .bind(duration_sec)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Newest-first listing for the gallery, cursor-paginated on created_at.
    pub async fn list_for_event(
        &self,
        event_id: Uuid,
        filter: &MediaListFilter,
    ) -> Result<Vec<MediaRecord>, AppError> {
        let records = sqlx::query_as::<_, MediaRecord>(&format!(
            r#"
            SELECT {MEDIA_COLUMNS}
            FROM media
            WHERE event_id = $1
              AND (NOT $2 OR approved = TRUE)
              AND ($3::media_status IS NULL OR status = $3)
              AND ($4::media_type IS NULL OR media_type = $4)
              AND ($5::timestamptz IS NULL OR created_at < $5)
            ORDER BY created_at DESC
            LIMIT $6
            "#
        ))
        .bind(event_id)
        .bind(filter.approved_only)
        .bind(filter.status)
        .bind(filter.media_type)
        .bind(filter.created_before)
        .bind(filter.limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
