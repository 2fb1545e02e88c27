//! External encoder interface and its ffmpeg/ffprobe implementation.
//!
//! Shelling out is isolated behind the `Transcoder` trait so the pipeline
//! stays testable without ffmpeg installed.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Probed stream metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub duration_sec: f64,
}

/// Opaque synchronous capability over the external encoder.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Obtain duration and dimensions without fully decoding.
    async fn probe(&self, path: &Path) -> Result<VideoMetadata>;

    /// Re-encode `input` into the fixed web-playback target at `output`.
    async fn transcode(&self, input: &Path, output: &Path) -> Result<()>;

    /// Extract a single still frame at `timestamp_sec` into `output`.
    async fn extract_frame(&self, video: &Path, output: &Path, timestamp_sec: f64) -> Result<()>;
}

/// ffmpeg/ffprobe-backed implementation.
#[derive(Clone)]
pub struct FfmpegTranscoder {
    ffmpeg_path: String,
    ffprobe_path: String,
}

impl FfmpegTranscoder {
    pub fn new(ffmpeg_path: String, ffprobe_path: String) -> Self {
        Self {
            ffmpeg_path,
            ffprobe_path,
        }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    #[tracing::instrument(skip(self, path))]
    async fn probe(&self, path: &Path) -> Result<VideoMetadata> {
        let output = Command::new(&self.ffprobe_path)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height,duration:format=duration",
                "-of",
                "json",
            ])
            .arg(path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .context("Failed to execute ffprobe")?;

        if !output.status.success() {
            return Err(anyhow!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        parse_probe_output(&output.stdout)
    }

    #[tracing::instrument(skip(self, input, output))]
    async fn transcode(&self, input: &Path, output: &Path) -> Result<()> {
        let start = std::time::Instant::now();

        // Fixed web-playback target: H.264 high/4.0 capped at 1080p/30fps with
        // bounded bitrate, AAC audio, and faststart so playback begins before
        // the full file downloads.
        let result = Command::new(&self.ffmpeg_path)
            .arg("-i")
            .arg(input)
            .args([
                "-c:v",
                "libx264",
                "-preset",
                "medium",
                "-profile:v",
                "high",
                "-level",
                "4.0",
                "-vf",
                "scale=w=min(1920\\,iw):h=min(1080\\,ih):force_original_aspect_ratio=decrease,fps=fps=30",
                "-b:v",
                "5M",
                "-maxrate",
                "6.5M",
                "-bufsize",
                "11M",
                "-c:a",
                "aac",
                "-b:a",
                "128k",
                "-ar",
                "44100",
                "-movflags",
                "+faststart",
                "-pix_fmt",
                "yuv420p",
                "-y",
            ])
            .arg(output)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .context("Failed to execute ffmpeg")?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(anyhow!("ffmpeg failed: {}", stderr));
        }

        tracing::info!(
            duration_ms = start.elapsed().as_millis(),
            "Video transcoding completed"
        );
        Ok(())
    }

    #[tracing::instrument(skip(self, video, output))]
    async fn extract_frame(&self, video: &Path, output: &Path, timestamp_sec: f64) -> Result<()> {
        let result = Command::new(&self.ffmpeg_path)
            .arg("-i")
            .arg(video)
            .args([
                "-ss",
                &format!("{:.3}", timestamp_sec),
                "-vframes",
                "1",
                "-vf",
                "scale=w=min(1920\\,iw):h=min(1080\\,ih):force_original_aspect_ratio=decrease",
                "-q:v",
                "2",
                "-y",
            ])
            .arg(output)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .context("Failed to execute ffmpeg")?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(anyhow!("Poster extraction failed: {}", stderr));
        }

        Ok(())
    }
}

/// Parse ffprobe `-of json` output into metadata.
///
/// Duration comes from the stream entry when present, falling back to the
/// container's format entry (some MP4s only report it there).
pub fn parse_probe_output(stdout: &[u8]) -> Result<VideoMetadata> {
    let data: serde_json::Value =
        serde_json::from_slice(stdout).context("Failed to parse ffprobe output")?;

    let stream = data["streams"]
        .get(0)
        .ok_or_else(|| anyhow!("No video stream found"))?;

    let width = stream["width"]
        .as_u64()
        .ok_or_else(|| anyhow!("Could not parse width"))? as u32;
    let height = stream["height"]
        .as_u64()
        .ok_or_else(|| anyhow!("Could not parse height"))? as u32;

    let duration_sec = stream["duration"]
        .as_str()
        .and_then(|d| d.parse::<f64>().ok())
        .or_else(|| {
            data["format"]["duration"]
                .as_str()
                .and_then(|d| d.parse::<f64>().ok())
        })
        .ok_or_else(|| anyhow!("Could not parse duration"))?;

    Ok(VideoMetadata {
        width,
        height,
        duration_sec,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stream_duration() {
        let json = br#"{
            "streams": [{"width": 1920, "height": 1080, "duration": "12.480000"}],
            "format": {"duration": "12.520000"}
        }"#;
        let meta = parse_probe_output(json).unwrap();
        assert_eq!(meta.width, 1920);
        assert_eq!(meta.height, 1080);
        assert!((meta.duration_sec - 12.48).abs() < 1e-6);
    }

    #[test]
    fn falls_back_to_format_duration() {
        let json = br#"{
            "streams": [{"width": 640, "height": 360}],
            "format": {"duration": "7.25"}
        }"#;
        let meta = parse_probe_output(json).unwrap();
        assert_eq!(meta.width, 640);
        assert_eq!(meta.height, 360);
        assert!((meta.duration_sec - 7.25).abs() < 1e-6);
    }

    #[test]
    fn missing_video_stream_is_an_error() {
        let json = br#"{"streams": [], "format": {"duration": "3.0"}}"#;
        assert!(parse_probe_output(json).is_err());
    }

    #[test]
    fn missing_duration_is_an_error() {
        let json = br#"{"streams": [{"width": 640, "height": 360}], "format": {}}"#;
        assert!(parse_probe_output(json).is_err());
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(parse_probe_output(b"not json").is_err());
    }
}
