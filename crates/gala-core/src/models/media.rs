//! Media record model and its status machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Kind of media a record holds. Fixed at intent time.
///
/// Processing branches on this as a closed two-variant dispatch; there is no
/// open plugin surface because only these two kinds exist.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, ToSchema,
)]
#[sqlx(type_name = "media_type", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum MediaType {
    Image,
    Video,
}

impl Display for MediaType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            MediaType::Image => write!(f, "IMAGE"),
            MediaType::Video => write!(f, "VIDEO"),
        }
    }
}

impl FromStr for MediaType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IMAGE" => Ok(MediaType::Image),
            "VIDEO" => Ok(MediaType::Video),
            _ => Err(anyhow::anyhow!("Invalid media type: {}", s)),
        }
    }
}

/// Lifecycle of a media record.
///
/// PENDING_UPLOAD → UPLOADED → PROCESSED | FAILED. FAILED is terminal for the
/// current attempt lineage; reprocessing requires an explicit re-enqueue and
/// never a re-upload, since `original_key` is retained.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema,
)]
#[sqlx(type_name = "media_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaStatus {
    PendingUpload,
    Uploaded,
    Processed,
    Failed,
}

impl Display for MediaStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            MediaStatus::PendingUpload => write!(f, "PENDING_UPLOAD"),
            MediaStatus::Uploaded => write!(f, "UPLOADED"),
            MediaStatus::Processed => write!(f, "PROCESSED"),
            MediaStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// A guest upload, from intent through processing.
///
/// `original_key` is assigned before any upload credential is issued, so the
/// worker can always locate the source object once the record is UPLOADED.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MediaRecord {
    pub id: Uuid,
    pub event_id: Uuid,
    pub media_type: MediaType,
    pub mime_type: String,
    pub status: MediaStatus,
    pub original_key: String,
    pub large_key: Option<String>,
    pub thumb_key: Option<String>,
    pub playback_key: Option<String>,
    pub poster_key: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub duration_sec: Option<i32>,
    pub caption: Option<String>,
    pub uploader_hash: Option<String>,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MediaRecord {
    /// Whether every derived key required for this record's media type is set.
    pub fn derived_keys_complete(&self) -> bool {
        match self.media_type {
            MediaType::Image => self.large_key.is_some() && self.thumb_key.is_some(),
            MediaType::Video => self.playback_key.is_some() && self.poster_key.is_some(),
        }
    }

    /// Idempotency guard for job redelivery: only PROCESSED with a complete
    /// derived-key set counts as done. A FAILED or partially-keyed record is
    /// re-attempted.
    pub fn requires_processing(&self) -> bool {
        !(self.status == MediaStatus::Processed && self.derived_keys_complete())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(media_type: MediaType, status: MediaStatus) -> MediaRecord {
        MediaRecord {
            id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            media_type,
            mime_type: "image/jpeg".to_string(),
            status,
            original_key: "events/e/originals/m.jpg".to_string(),
            large_key: None,
            thumb_key: None,
            playback_key: None,
            poster_key: None,
            width: None,
            height: None,
            duration_sec: None,
            caption: None,
            uploader_hash: None,
            approved: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn processed_image_with_all_keys_is_done() {
        let mut rec = record(MediaType::Image, MediaStatus::Processed);
        rec.large_key = Some("events/e/large/m.jpg".to_string());
        rec.thumb_key = Some("events/e/thumb/m.jpg".to_string());
        assert!(rec.derived_keys_complete());
        assert!(!rec.requires_processing());
    }

    #[test]
    fn processed_image_missing_a_key_is_reprocessed() {
        let mut rec = record(MediaType::Image, MediaStatus::Processed);
        rec.large_key = Some("events/e/large/m.jpg".to_string());
        assert!(!rec.derived_keys_complete());
        assert!(rec.requires_processing());
    }

    #[test]
    fn failed_record_is_reprocessed_on_redelivery() {
        let rec = record(MediaType::Video, MediaStatus::Failed);
        assert!(rec.requires_processing());
    }

    #[test]
    fn video_keys_are_playback_and_poster() {
        let mut rec = record(MediaType::Video, MediaStatus::Processed);
        rec.playback_key = Some("events/e/playback/m.mp4".to_string());
        assert!(rec.requires_processing());
        rec.poster_key = Some("events/e/poster/m.jpg".to_string());
        assert!(!rec.requires_processing());
    }

    #[test]
    fn media_type_round_trip() {
        assert_eq!("IMAGE".parse::<MediaType>().unwrap(), MediaType::Image);
        assert_eq!("VIDEO".parse::<MediaType>().unwrap(), MediaType::Video);
        assert_eq!(MediaType::Image.to_string(), "IMAGE");
        assert!("AUDIO".parse::<MediaType>().is_err());
    }
}
