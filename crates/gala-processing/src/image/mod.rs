//! Image variant pipeline.

pub mod encode;
pub mod orientation;
pub mod pipeline;

pub use pipeline::{ImageError, ImagePipeline, ImagePipelineConfig, ImageVariants};
