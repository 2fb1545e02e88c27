//! JPEG encoding via mozjpeg.

use anyhow::Result;
use bytes::Bytes;
use image::DynamicImage;

/// Encode an image as baseline-progressive JPEG at the given quality (0-100).
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Bytes> {
    let rgb_img = img.to_rgb8();
    let (width, height) = rgb_img.dimensions();

    let mut comp = mozjpeg::Compress::new(mozjpeg::ColorSpace::JCS_RGB);
    comp.set_size(width as usize, height as usize);
    comp.set_quality(quality as f32);
    comp.set_progressive_mode();
    comp.set_optimize_coding(true);

    let mut comp = comp.start_compress(Vec::new())?;
    comp.write_scanlines(&rgb_img)?;
    let jpeg_data = comp.finish()?;

    Ok(Bytes::from(jpeg_data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba, RgbaImage};

    #[test]
    fn encodes_decodable_jpeg() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            64,
            48,
            Rgba([200, 100, 50, 255]),
        ));
        let jpeg = encode_jpeg(&img, 90).unwrap();
        assert!(!jpeg.is_empty());

        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!(decoded.width(), 64);
        assert_eq!(decoded.height(), 48);
    }

    #[test]
    fn lower_quality_produces_smaller_output() {
        // Use a noisy image so quality actually affects size
        let img = DynamicImage::ImageRgba8(RgbaImage::from_fn(128, 128, |x, y| {
            Rgba([
                ((x * 7 + y * 13) % 256) as u8,
                ((x * 3 + y * 29) % 256) as u8,
                ((x * 17 + y * 5) % 256) as u8,
                255,
            ])
        }));
        let high = encode_jpeg(&img, 95).unwrap();
        let low = encode_jpeg(&img, 40).unwrap();
        assert!(low.len() < high.len());
    }
}
