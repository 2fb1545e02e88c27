//! Image variant pipeline: decode, validate, and re-encode a still image
//! into the two gallery variants.

use bytes::Bytes;
use gala_core::constants;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageReader};
use std::io::Cursor;
use thiserror::Error;

use super::encode::encode_jpeg;
use super::orientation::apply_exif_orientation;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Image too small: {width}x{height}px (min {min}px)")]
    TooSmall { width: u32, height: u32, min: u32 },

    #[error("Image too large: {width}x{height}px (max {max}px)")]
    TooLarge { width: u32, height: u32, max: u32 },

    #[error("Failed to encode variant: {0}")]
    Encode(String),
}

impl ImageError {
    /// Validation errors are terminal for the upload; retrying the same bytes
    /// cannot succeed.
    pub fn is_validation(&self) -> bool {
        !matches!(self, ImageError::Encode(_))
    }
}

/// Output of a successful pipeline run. Dimensions are those of the large
/// variant, which is what the gallery displays.
#[derive(Debug, Clone)]
pub struct ImageVariants {
    pub large: Bytes,
    pub thumb: Bytes,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct ImagePipelineConfig {
    pub large_max_edge: u32,
    pub thumb_max_edge: u32,
    pub large_quality: u8,
    pub thumb_quality: u8,
    pub min_edge: u32,
    pub max_edge: u32,
}

impl Default for ImagePipelineConfig {
    fn default() -> Self {
        Self {
            large_max_edge: constants::LARGE_MAX_EDGE,
            thumb_max_edge: constants::THUMB_MAX_EDGE,
            large_quality: constants::LARGE_JPEG_QUALITY,
            thumb_quality: constants::THUMB_JPEG_QUALITY,
            min_edge: constants::MIN_IMAGE_EDGE,
            max_edge: constants::MAX_IMAGE_EDGE,
        }
    }
}

pub struct ImagePipeline {
    config: ImagePipelineConfig,
}

impl Default for ImagePipeline {
    fn default() -> Self {
        Self::new(ImagePipelineConfig::default())
    }
}

impl ImagePipeline {
    pub fn new(config: ImagePipelineConfig) -> Self {
        Self { config }
    }

    /// Decode, validate, and render both variants. Any failure aborts the
    /// whole call with no partial output. CPU-bound; callers on an async
    /// runtime should wrap this in `spawn_blocking`.
    pub fn process(&self, data: &[u8]) -> Result<ImageVariants, ImageError> {
        let img = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| ImageError::Decode(e.to_string()))?
            .decode()
            .map_err(|e| ImageError::Decode(e.to_string()))?;

        // Orientation first, so both the validation and the variants see the
        // upright image.
        let img = apply_exif_orientation(img, data);

        let (width, height) = img.dimensions();
        if width < self.config.min_edge || height < self.config.min_edge {
            return Err(ImageError::TooSmall {
                width,
                height,
                min: self.config.min_edge,
            });
        }
        if width > self.config.max_edge || height > self.config.max_edge {
            return Err(ImageError::TooLarge {
                width,
                height,
                max: self.config.max_edge,
            });
        }

        let large = bound_to_edge(&img, self.config.large_max_edge);
        let thumb = bound_to_edge(&img, self.config.thumb_max_edge);

        let (large_width, large_height) = large.dimensions();

        let large_jpeg = encode_jpeg(&large, self.config.large_quality)
            .map_err(|e| ImageError::Encode(e.to_string()))?;
        let thumb_jpeg = encode_jpeg(&thumb, self.config.thumb_quality)
            .map_err(|e| ImageError::Encode(e.to_string()))?;

        tracing::debug!(
            original = %format!("{}x{}", width, height),
            large = %format!("{}x{}", large_width, large_height),
            large_bytes = large_jpeg.len(),
            thumb_bytes = thumb_jpeg.len(),
            "Image variants rendered"
        );

        Ok(ImageVariants {
            large: large_jpeg,
            thumb: thumb_jpeg,
            width: large_width,
            height: large_height,
        })
    }
}

/// Fit the image inside a square of `max_edge`, preserving aspect ratio and
/// never upscaling.
fn bound_to_edge(img: &DynamicImage, max_edge: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    if width <= max_edge && height <= max_edge {
        img.clone()
    } else {
        img.resize(max_edge, max_edge, FilterType::Lanczos3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([255, 0, 0, 255]));
        let mut buffer = Vec::new();
        let mut cursor = Cursor::new(&mut buffer);
        DynamicImage::ImageRgba8(img)
            .write_to(&mut cursor, ImageFormat::Png)
            .unwrap();
        buffer
    }

    fn decoded_dims(data: &[u8]) -> (u32, u32) {
        let img = image::load_from_memory(data).unwrap();
        img.dimensions()
    }

    #[test]
    fn variants_are_bounded_and_aspect_preserved() {
        let pipeline = ImagePipeline::default();
        let variants = pipeline.process(&png_bytes(2500, 500)).unwrap();

        assert_eq!(decoded_dims(&variants.large), (2000, 400));
        assert_eq!(decoded_dims(&variants.thumb), (400, 80));
        assert_eq!((variants.width, variants.height), (2000, 400));
    }

    #[test]
    fn variants_never_upscale() {
        let pipeline = ImagePipeline::default();
        let variants = pipeline.process(&png_bytes(300, 240)).unwrap();

        // Both caps are above the original size, so dimensions are untouched.
        assert_eq!(decoded_dims(&variants.large), (300, 240));
        assert_eq!(decoded_dims(&variants.thumb), (300, 240));
    }

    #[test]
    fn dimensions_come_from_large_variant() {
        let pipeline = ImagePipeline::default();
        let variants = pipeline.process(&png_bytes(4000, 2000)).unwrap();
        assert_eq!((variants.width, variants.height), (2000, 1000));
    }

    #[test]
    fn too_small_image_rejected() {
        let pipeline = ImagePipeline::default();
        let err = pipeline.process(&png_bytes(100, 100)).unwrap_err();
        assert!(matches!(err, ImageError::TooSmall { .. }));
        assert!(err.is_validation());
    }

    #[test]
    fn one_small_edge_is_enough_to_reject() {
        let pipeline = ImagePipeline::default();
        let err = pipeline.process(&png_bytes(1000, 150)).unwrap_err();
        assert!(matches!(err, ImageError::TooSmall { .. }));
    }

    #[test]
    fn oversized_image_rejected_before_resize() {
        let pipeline = ImagePipeline::default();
        let err = pipeline.process(&png_bytes(12001, 200)).unwrap_err();
        assert!(matches!(err, ImageError::TooLarge { .. }));
        assert!(err.is_validation());
    }

    #[test]
    fn garbage_bytes_rejected() {
        let pipeline = ImagePipeline::default();
        let err = pipeline.process(b"definitely not an image").unwrap_err();
        assert!(matches!(err, ImageError::Decode(_)));
        assert!(err.is_validation());
    }
}
