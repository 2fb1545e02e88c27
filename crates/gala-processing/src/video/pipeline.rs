//! Video transcode pipeline: materialize, probe, gate, encode, poster.
//!
//! All intermediate files live in a scratch `TempDir` that is removed on
//! every exit path (drop runs on success, validation failure, and encoder
//! failure alike), so repeated runs cannot leak disk.

use std::sync::Arc;
use tempfile::Builder;
use thiserror::Error;

use super::transcoder::{Transcoder, VideoMetadata};

/// Poster frames are taken near the one-second mark of the transcoded output.
const POSTER_TIMESTAMP_SEC: f64 = 1.0;

#[derive(Debug, Error)]
pub enum VideoError {
    #[error("Scratch space error: {0}")]
    Scratch(#[from] std::io::Error),

    #[error("Failed to probe video: {0}")]
    Probe(String),

    #[error("Video duration {duration_sec:.1}s exceeds maximum {max_sec}s")]
    TooLong { duration_sec: f64, max_sec: u32 },

    #[error("Transcoding failed: {0}")]
    Encode(String),

    #[error("Poster extraction failed: {0}")]
    Poster(String),
}

impl VideoError {
    /// Validation errors (unreadable or over-length input) are terminal for
    /// the upload; encoder and scratch failures are worth retrying.
    pub fn is_validation(&self) -> bool {
        matches!(self, VideoError::Probe(_) | VideoError::TooLong { .. })
    }
}

/// Output of a successful pipeline run. Dimensions and duration are
/// re-probed from the transcoded output, not the original, since encoding
/// may adjust exact values.
#[derive(Debug)]
pub struct VideoArtifacts {
    pub playback: Vec<u8>,
    pub poster: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub duration_sec: f64,
}

pub struct VideoPipeline {
    transcoder: Arc<dyn Transcoder>,
    max_duration_sec: u32,
}

impl VideoPipeline {
    pub fn new(transcoder: Arc<dyn Transcoder>, max_duration_sec: u32) -> Self {
        Self {
            transcoder,
            max_duration_sec,
        }
    }

    /// Run the full transcode. No partial artifacts escape: outputs are read
    /// back only after every step succeeded, and the scratch directory is
    /// gone by the time this returns.
    pub async fn process(&self, data: &[u8]) -> Result<VideoArtifacts, VideoError> {
        let scratch = Builder::new().prefix("gala-video-").tempdir()?;
        let input_path = scratch.path().join("input.mp4");
        let output_path = scratch.path().join("output.mp4");
        let poster_path = scratch.path().join("poster.jpg");

        tokio::fs::write(&input_path, data).await?;

        let metadata = self
            .transcoder
            .probe(&input_path)
            .await
            .map_err(|e| VideoError::Probe(e.to_string()))?;

        tracing::info!(
            width = metadata.width,
            height = metadata.height,
            duration_sec = metadata.duration_sec,
            "Video probed"
        );

        // Reject over-length input before spending any encoder time.
        if metadata.duration_sec > self.max_duration_sec as f64 {
            return Err(VideoError::TooLong {
                duration_sec: metadata.duration_sec,
                max_sec: self.max_duration_sec,
            });
        }

        self.transcoder
            .transcode(&input_path, &output_path)
            .await
            .map_err(|e| VideoError::Encode(e.to_string()))?;

        self.transcoder
            .extract_frame(&output_path, &poster_path, POSTER_TIMESTAMP_SEC)
            .await
            .map_err(|e| VideoError::Poster(e.to_string()))?;

        let final_metadata: VideoMetadata = self
            .transcoder
            .probe(&output_path)
            .await
            .map_err(|e| VideoError::Probe(e.to_string()))?;

        let playback = tokio::fs::read(&output_path).await?;
        let poster = tokio::fs::read(&poster_path).await?;

        Ok(VideoArtifacts {
            playback,
            poster,
            width: final_metadata.width,
            height: final_metadata.height,
            duration_sec: final_metadata.duration_sec,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// Scripted transcoder that records the scratch directory it saw and
    /// whether the encoder was invoked.
    struct MockTranscoder {
        input_duration_sec: f64,
        fail_encode: bool,
        scratch_dir: Mutex<Option<PathBuf>>,
        encoder_invoked: AtomicBool,
    }

    impl MockTranscoder {
        fn new(input_duration_sec: f64) -> Self {
            Self {
                input_duration_sec,
                fail_encode: false,
                scratch_dir: Mutex::new(None),
                encoder_invoked: AtomicBool::new(false),
            }
        }

        fn failing_encode(input_duration_sec: f64) -> Self {
            Self {
                fail_encode: true,
                ..Self::new(input_duration_sec)
            }
        }

        fn seen_scratch_dir(&self) -> PathBuf {
            self.scratch_dir.lock().unwrap().clone().unwrap()
        }
    }

    #[async_trait]
    impl Transcoder for MockTranscoder {
        async fn probe(&self, path: &Path) -> Result<VideoMetadata> {
            *self.scratch_dir.lock().unwrap() = Some(path.parent().unwrap().to_path_buf());
            if path.ends_with("output.mp4") {
                // The encoder "adjusted" dimensions and duration slightly.
                Ok(VideoMetadata {
                    width: 1920,
                    height: 1080,
                    duration_sec: self.input_duration_sec - 0.1,
                })
            } else {
                Ok(VideoMetadata {
                    width: 3840,
                    height: 2160,
                    duration_sec: self.input_duration_sec,
                })
            }
        }

        async fn transcode(&self, _input: &Path, output: &Path) -> Result<()> {
            self.encoder_invoked.store(true, Ordering::SeqCst);
            if self.fail_encode {
                return Err(anyhow!("ffmpeg failed with code 1"));
            }
            tokio::fs::write(output, b"transcoded-bytes").await?;
            Ok(())
        }

        async fn extract_frame(
            &self,
            _video: &Path,
            output: &Path,
            _timestamp_sec: f64,
        ) -> Result<()> {
            tokio::fs::write(output, b"poster-bytes").await?;
            Ok(())
        }
    }

    #[tokio::test]
    async fn successful_run_returns_reprobed_metadata() {
        let transcoder = Arc::new(MockTranscoder::new(10.0));
        let pipeline = VideoPipeline::new(transcoder.clone(), 15);

        let artifacts = pipeline.process(b"fake-mp4").await.unwrap();

        assert_eq!(artifacts.playback, b"transcoded-bytes");
        assert_eq!(artifacts.poster, b"poster-bytes");
        // Dimensions/duration come from the transcoded output, not the 4K original.
        assert_eq!((artifacts.width, artifacts.height), (1920, 1080));
        assert!((artifacts.duration_sec - 9.9).abs() < 1e-6);

        assert!(!transcoder.seen_scratch_dir().exists());
    }

    #[tokio::test]
    async fn over_length_video_fails_before_encoding() {
        let transcoder = Arc::new(MockTranscoder::new(20.0));
        let pipeline = VideoPipeline::new(transcoder.clone(), 15);

        let err = pipeline.process(b"fake-mp4").await.unwrap_err();

        assert!(matches!(err, VideoError::TooLong { .. }));
        assert!(err.is_validation());
        assert!(!transcoder.encoder_invoked.load(Ordering::SeqCst));
        assert!(!transcoder.seen_scratch_dir().exists());
    }

    #[tokio::test]
    async fn encoder_failure_cleans_scratch_and_is_retryable() {
        let transcoder = Arc::new(MockTranscoder::failing_encode(10.0));
        let pipeline = VideoPipeline::new(transcoder.clone(), 15);

        let err = pipeline.process(b"fake-mp4").await.unwrap_err();

        assert!(matches!(err, VideoError::Encode(_)));
        assert!(!err.is_validation());
        assert!(!transcoder.seen_scratch_dir().exists());
    }

    #[tokio::test]
    async fn exact_limit_duration_is_accepted() {
        let transcoder = Arc::new(MockTranscoder::new(15.0));
        let pipeline = VideoPipeline::new(transcoder, 15);
        assert!(pipeline.process(b"fake-mp4").await.is_ok());
    }
}
