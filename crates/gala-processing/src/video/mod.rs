//! Video transcode pipeline.

pub mod pipeline;
pub mod transcoder;

pub use pipeline::{VideoArtifacts, VideoError, VideoPipeline};
pub use transcoder::{FfmpegTranscoder, Transcoder, VideoMetadata};
