//! Media processing job handler.
//!
//! Owns every catalog and storage write around the pipelines: download the
//! original, run the type-specific pipeline, upload derived artifacts, and
//! flip the record to PROCESSED in one logical update. Any failure marks the
//! record FAILED first, then classifies the error for the queue's retry
//! policy.

use anyhow::anyhow;
use gala_core::models::{Job, MediaRecord, MediaType, ProcessMediaPayload};
use gala_core::JobError;
use gala_processing::{FfmpegTranscoder, ImagePipeline, VideoPipeline};
use gala_storage::keys;
use serde_json::json;
use std::sync::Arc;

use crate::state::AppState;

pub struct MediaJobHandler;

impl MediaJobHandler {
    #[tracing::instrument(skip(job, state), fields(job.id = %job.id, media.id = tracing::field::Empty))]
    pub async fn process(
        job: &Job,
        state: Arc<AppState>,
    ) -> Result<serde_json::Value, JobError> {
        let payload: ProcessMediaPayload = job
            .try_payload_as()
            .map_err(|e| JobError::unrecoverable(anyhow!("Invalid job payload: {}", e)))?;

        tracing::Span::current().record("media.id", payload.media_id.to_string());

        // Re-read current state: duplicate enqueues and queue redelivery are
        // expected, so the record itself decides whether work remains.
        let record = state
            .media
            .find_by_id(payload.media_id)
            .await
            .map_err(|e| JobError::recoverable(anyhow!("Failed to load media record: {}", e)))?
            .ok_or_else(|| {
                JobError::unrecoverable(anyhow!("Media record {} not found", payload.media_id))
            })?;

        if !record.requires_processing() {
            tracing::info!(media_id = %record.id, "Media already processed, skipping");
            return Ok(json!({ "media_id": record.id, "skipped": true }));
        }

        tracing::info!(
            media_id = %record.id,
            media_type = %record.media_type,
            original_key = %record.original_key,
            "Processing media"
        );

        let original = match state.storage.get_bytes(&record.original_key).await {
            Ok(bytes) => bytes,
            Err(e) => {
                Self::mark_failed(&state, &record).await;
                return Err(JobError::recoverable(anyhow!(
                    "Failed to download original {}: {}",
                    record.original_key,
                    e
                )));
            }
        };

        match record.media_type {
            MediaType::Image => Self::process_image(&state, &record, original).await,
            MediaType::Video => Self::process_video(&state, &record, original).await,
        }
    }

    async fn process_image(
        state: &Arc<AppState>,
        record: &MediaRecord,
        original: Vec<u8>,
    ) -> Result<serde_json::Value, JobError> {
        let pipeline = ImagePipeline::default();
        // Decode/resize/encode is CPU-bound; keep it off the async pool.
        let result =
            tokio::task::spawn_blocking(move || pipeline.process(&original)).await;

        let variants = match result {
            Ok(Ok(variants)) => variants,
            Ok(Err(e)) => {
                tracing::warn!(media_id = %record.id, error = %e, "Image pipeline failed");
                Self::mark_failed(state, record).await;
                let err = anyhow!("Image pipeline failed: {}", e);
                return Err(if e.is_validation() {
                    JobError::unrecoverable(err)
                } else {
                    JobError::recoverable(err)
                });
            }
            Err(join_err) => {
                Self::mark_failed(state, record).await;
                return Err(JobError::recoverable(anyhow!(
                    "Image pipeline task panicked: {}",
                    join_err
                )));
            }
        };

        let large_key = keys::large_key(record.event_id, record.id);
        let thumb_key = keys::thumb_key(record.event_id, record.id);

        // Both uploads must land before the record flips to PROCESSED, so a
        // half-uploaded variant set can never look complete.
        let uploads = async {
            state
                .storage
                .put_bytes(&large_key, "image/jpeg", variants.large.to_vec())
                .await?;
            state
                .storage
                .put_bytes(&thumb_key, "image/jpeg", variants.thumb.to_vec())
                .await
        };
        if let Err(e) = uploads.await {
            Self::mark_failed(state, record).await;
            return Err(JobError::recoverable(anyhow!(
                "Failed to upload image variants: {}",
                e
            )));
        }

        state
            .media
            .complete_image(
                record.id,
                &large_key,
                &thumb_key,
                variants.width as i32,
                variants.height as i32,
            )
            .await
            .map_err(|e| JobError::recoverable(anyhow!("Failed to update record: {}", e)))?;

        tracing::info!(
            media_id = %record.id,
            width = variants.width,
            height = variants.height,
            "Image processed"
        );

        Ok(json!({
            "media_id": record.id,
            "width": variants.width,
            "height": variants.height,
        }))
    }

    async fn process_video(
        state: &Arc<AppState>,
        record: &MediaRecord,
        original: Vec<u8>,
    ) -> Result<serde_json::Value, JobError> {
        let transcoder = Arc::new(FfmpegTranscoder::new(
            state.config.ffmpeg_path.clone(),
            state.config.ffprobe_path.clone(),
        ));
        let pipeline = VideoPipeline::new(transcoder, state.config.max_video_duration_sec);

        let artifacts = match pipeline.process(&original).await {
            Ok(artifacts) => artifacts,
            Err(e) => {
                tracing::warn!(media_id = %record.id, error = %e, "Video pipeline failed");
                Self::mark_failed(state, record).await;
                let err = anyhow!("Video pipeline failed: {}", e);
                return Err(if e.is_validation() {
                    JobError::unrecoverable(err)
                } else {
                    JobError::recoverable(err)
                });
            }
        };

        let playback_key = keys::playback_key(record.event_id, record.id);
        let poster_key = keys::poster_key(record.event_id, record.id);

        let uploads = async {
            state
                .storage
                .put_bytes(&playback_key, "video/mp4", artifacts.playback.clone())
                .await?;
            state
                .storage
                .put_bytes(&poster_key, "image/jpeg", artifacts.poster.clone())
                .await
        };
        if let Err(e) = uploads.await {
            Self::mark_failed(state, record).await;
            return Err(JobError::recoverable(anyhow!(
                "Failed to upload video artifacts: {}",
                e
            )));
        }

        let duration_sec = artifacts.duration_sec.round() as i32;
        state
            .media
            .complete_video(
                record.id,
                &playback_key,
                &poster_key,
                artifacts.width as i32,
                artifacts.height as i32,
                duration_sec,
            )
            .await
            .map_err(|e| JobError::recoverable(anyhow!("Failed to update record: {}", e)))?;

        tracing::info!(
            media_id = %record.id,
            width = artifacts.width,
            height = artifacts.height,
            duration_sec = duration_sec,
            "Video processed"
        );

        Ok(json!({
            "media_id": record.id,
            "width": artifacts.width,
            "height": artifacts.height,
            "duration_sec": duration_sec,
        }))
    }

    /// Best-effort FAILED mark before surfacing the error to the queue. The
    /// record keeps its original key, so a later retry (or an operator
    /// re-enqueue after dead-lettering) can reprocess without a re-upload.
    async fn mark_failed(state: &Arc<AppState>, record: &MediaRecord) {
        if let Err(e) = state.media.mark_failed(record.id).await {
            tracing::error!(media_id = %record.id, error = %e, "Failed to mark record FAILED");
        }
    }
}
