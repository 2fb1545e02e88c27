//! Gala Processing Library
//!
//! Turns one uploaded original into its web-deliverable derived artifacts:
//! resized image variants, or a transcoded playback video plus poster frame.
//! Pipelines are pure with respect to the catalog and storage; they take
//! bytes and return bytes (or a classified error) so the worker owns all
//! record and object writes.

pub mod image;
pub mod video;

pub use image::{ImageError, ImagePipeline, ImagePipelineConfig, ImageVariants};
pub use video::{
    FfmpegTranscoder, Transcoder, VideoArtifacts, VideoError, VideoMetadata, VideoPipeline,
};
