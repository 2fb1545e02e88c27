//! Shared key generation for storage backends.
//!
//! Key format: `events/{event_id}/{variant}/{media_id}.{ext}`.

use uuid::Uuid;

fn event_key(event_id: Uuid, variant: &str, media_id: Uuid, ext: &str) -> String {
    format!("events/{}/{}/{}.{}", event_id, variant, media_id, ext)
}

/// Key of the raw upload, assigned at intent time and immutable afterwards.
pub fn original_key(event_id: Uuid, media_id: Uuid, ext: &str) -> String {
    event_key(event_id, "originals", media_id, ext)
}

/// Key of the "large" display variant of an image.
pub fn large_key(event_id: Uuid, media_id: Uuid) -> String {
    event_key(event_id, "large", media_id, "jpg")
}

/// Key of the thumbnail variant of an image.
pub fn thumb_key(event_id: Uuid, media_id: Uuid) -> String {
    event_key(event_id, "thumb", media_id, "jpg")
}

/// Key of the transcoded playback rendition of a video.
pub fn playback_key(event_id: Uuid, media_id: Uuid) -> String {
    event_key(event_id, "playback", media_id, "mp4")
}

/// Key of the poster frame of a video.
pub fn poster_key(event_id: Uuid, media_id: Uuid) -> String {
    event_key(event_id, "poster", media_id, "jpg")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_follow_event_prefix_layout() {
        let event_id = Uuid::new_v4();
        let media_id = Uuid::new_v4();

        assert_eq!(
            original_key(event_id, media_id, "png"),
            format!("events/{}/originals/{}.png", event_id, media_id)
        );
        assert_eq!(
            large_key(event_id, media_id),
            format!("events/{}/large/{}.jpg", event_id, media_id)
        );
        assert_eq!(
            thumb_key(event_id, media_id),
            format!("events/{}/thumb/{}.jpg", event_id, media_id)
        );
        assert_eq!(
            playback_key(event_id, media_id),
            format!("events/{}/playback/{}.mp4", event_id, media_id)
        );
        assert_eq!(
            poster_key(event_id, media_id),
            format!("events/{}/poster/{}.jpg", event_id, media_id)
        );
    }
}
