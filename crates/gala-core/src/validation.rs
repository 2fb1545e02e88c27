//! Upload intent validation: content-type allow-lists and size ceilings.
//!
//! Checks run before a record is created or a credential is issued, so a
//! rejected intent has no side effects.

use crate::constants::{
    IMAGE_CONTENT_TYPES, MAX_IMAGE_SIZE_BYTES, MAX_VIDEO_SIZE_BYTES, VIDEO_CONTENT_TYPES,
};
use crate::error::AppError;
use crate::models::MediaType;

/// Validate a declared content type against the allow-list for the media type.
pub fn validate_content_type(media_type: MediaType, content_type: &str) -> Result<(), AppError> {
    let allowed = match media_type {
        MediaType::Image => IMAGE_CONTENT_TYPES,
        MediaType::Video => VIDEO_CONTENT_TYPES,
    };
    if allowed.contains(&content_type) {
        Ok(())
    } else {
        Err(AppError::InvalidInput(format!(
            "Content type {} is not allowed for {} uploads (allowed: {})",
            content_type,
            media_type,
            allowed.join(", ")
        )))
    }
}

/// Validate a declared size against the per-media-type ceiling.
///
/// Advisory only: the real size is bounded by the storage layer at PUT time,
/// but an oversized declaration fails fast before any credential is issued.
pub fn validate_declared_size(
    media_type: MediaType,
    file_size_bytes: Option<i64>,
) -> Result<(), AppError> {
    let Some(size) = file_size_bytes else {
        return Ok(());
    };
    let max = match media_type {
        MediaType::Image => MAX_IMAGE_SIZE_BYTES,
        MediaType::Video => MAX_VIDEO_SIZE_BYTES,
    };
    if size > max {
        return Err(AppError::PayloadTooLarge(format!(
            "Declared size {} bytes exceeds the {} limit of {} bytes",
            size, media_type, max
        )));
    }
    Ok(())
}

/// File extension for the original object, derived from the declared content
/// type. Videos are always stored as mp4; images keep png or default to jpg.
pub fn extension_for(media_type: MediaType, content_type: &str) -> &'static str {
    match media_type {
        MediaType::Video => "mp4",
        MediaType::Image => {
            if content_type == "image/png" {
                "png"
            } else {
                "jpg"
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_allowed_image_types() {
        assert!(validate_content_type(MediaType::Image, "image/jpeg").is_ok());
        assert!(validate_content_type(MediaType::Image, "image/png").is_ok());
    }

    #[test]
    fn rejects_mismatched_content_type() {
        assert!(validate_content_type(MediaType::Image, "image/gif").is_err());
        assert!(validate_content_type(MediaType::Image, "video/mp4").is_err());
        assert!(validate_content_type(MediaType::Video, "image/jpeg").is_err());
        assert!(validate_content_type(MediaType::Video, "video/webm").is_err());
    }

    #[test]
    fn accepts_video_mp4_only() {
        assert!(validate_content_type(MediaType::Video, "video/mp4").is_ok());
    }

    #[test]
    fn size_ceiling_differs_by_media_type() {
        let image_limit = 10 * 1024 * 1024;
        let video_limit = 40 * 1024 * 1024;
        assert!(validate_declared_size(MediaType::Image, Some(image_limit)).is_ok());
        assert!(validate_declared_size(MediaType::Image, Some(image_limit + 1)).is_err());
        assert!(validate_declared_size(MediaType::Video, Some(video_limit)).is_ok());
        assert!(validate_declared_size(MediaType::Video, Some(video_limit + 1)).is_err());
    }

    #[test]
    fn missing_declared_size_is_accepted() {
        assert!(validate_declared_size(MediaType::Image, None).is_ok());
        assert!(validate_declared_size(MediaType::Video, None).is_ok());
    }

    #[test]
    fn extension_follows_content_type() {
        assert_eq!(extension_for(MediaType::Image, "image/png"), "png");
        assert_eq!(extension_for(MediaType::Image, "image/jpeg"), "jpg");
        assert_eq!(extension_for(MediaType::Video, "video/mp4"), "mp4");
    }
}
