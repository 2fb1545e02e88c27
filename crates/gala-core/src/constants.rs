//! Shared processing limits and defaults.

/// Content types accepted for image uploads.
pub const IMAGE_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png"];

/// Content types accepted for video uploads.
pub const VIDEO_CONTENT_TYPES: &[&str] = &["video/mp4"];

/// Declared-size ceiling for image uploads (advisory; storage enforces the
/// real bound on the PUT itself).
pub const MAX_IMAGE_SIZE_BYTES: i64 = 10 * 1024 * 1024;

/// Declared-size ceiling for video uploads.
pub const MAX_VIDEO_SIZE_BYTES: i64 = 40 * 1024 * 1024;

/// Longest edge of the "large" display variant.
pub const LARGE_MAX_EDGE: u32 = 2000;

/// Longest edge of the thumbnail variant.
pub const THUMB_MAX_EDGE: u32 = 400;

/// JPEG quality for the large variant.
pub const LARGE_JPEG_QUALITY: u8 = 90;

/// JPEG quality for the thumbnail variant.
pub const THUMB_JPEG_QUALITY: u8 = 85;

/// Decoded images with either edge below this are rejected as corrupt or
/// near-empty captures.
pub const MIN_IMAGE_EDGE: u32 = 200;

/// Decoded images with either edge above this are rejected before any resize
/// work (decompression-bomb guard).
pub const MAX_IMAGE_EDGE: u32 = 12000;

/// Maximum accepted video duration.
pub const MAX_VIDEO_DURATION_SEC: u32 = 15;

/// Lifetime of a signed upload URL.
pub const UPLOAD_URL_TTL_SECS: u64 = 300;

/// Maximum caption length accepted at intent time.
pub const MAX_CAPTION_LEN: usize = 140;

/// Maximum uploader-hash length accepted at intent time.
pub const MAX_UPLOADER_HASH_LEN: usize = 200;
