//! EXIF orientation handling: uploads from phones are routinely stored
//! rotated with an orientation tag, and variants must come out upright.

use image::{imageops, DynamicImage};
use std::io::Cursor;

/// Read the EXIF orientation tag from raw image data.
///
/// Returns the orientation value (1-8), or 1 (normal) when the data has no
/// EXIF segment or no orientation field.
pub fn read_exif_orientation(data: &[u8]) -> u8 {
    let mut cursor = Cursor::new(data);
    let Ok(exif) = exif::Reader::new().read_from_container(&mut cursor) else {
        return 1;
    };
    let orientation = exif
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
        .unwrap_or(1);

    if (1..=8).contains(&orientation) {
        orientation as u8
    } else {
        1
    }
}

/// Rotation and flip operations needed for a given EXIF orientation.
/// Returns (rotate_angle, flip_horizontal, flip_vertical).
pub fn orientation_transforms(orientation: u8) -> (Option<u16>, bool, bool) {
    match orientation {
        1 => (None, false, false),      // Normal
        2 => (None, true, false),       // Mirror horizontal
        3 => (Some(180), false, false), // Rotate 180
        4 => (None, false, true),       // Mirror vertical
        5 => (Some(270), true, false),  // Mirror horizontal + Rotate 270 CW
        6 => (Some(90), false, false),  // Rotate 90 CW
        7 => (Some(90), true, false),   // Mirror horizontal + Rotate 90 CW
        8 => (Some(270), false, false), // Rotate 270 CW
        _ => (None, false, false),      // Invalid, treat as normal
    }
}

/// Apply the EXIF orientation recorded in `data` to a decoded image.
pub fn apply_exif_orientation(mut img: DynamicImage, data: &[u8]) -> DynamicImage {
    let orientation = read_exif_orientation(data);
    let (rotate, flip_h, flip_v) = orientation_transforms(orientation);

    tracing::debug!(
        orientation = orientation,
        rotate = ?rotate,
        flip_horizontal = flip_h,
        flip_vertical = flip_v,
        "Applying EXIF orientation"
    );

    if let Some(angle) = rotate {
        img = rotate_by_angle(img, angle);
    }
    if flip_h {
        img = DynamicImage::ImageRgba8(imageops::flip_horizontal(&img.to_rgba8()));
    }
    if flip_v {
        img = DynamicImage::ImageRgba8(imageops::flip_vertical(&img.to_rgba8()));
    }

    img
}

/// Rotate by 90, 180, or 270 degrees clockwise.
fn rotate_by_angle(img: DynamicImage, angle: u16) -> DynamicImage {
    match angle {
        90 => DynamicImage::ImageRgba8(imageops::rotate90(&img.to_rgba8())),
        180 => DynamicImage::ImageRgba8(imageops::rotate180(&img.to_rgba8())),
        270 => DynamicImage::ImageRgba8(imageops::rotate270(&img.to_rgba8())),
        _ => img,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba, RgbaImage};

    #[test]
    fn transforms_cover_all_orientations() {
        for orientation in 1..=8u8 {
            let (rotate, _flip_h, _flip_v) = orientation_transforms(orientation);
            if let Some(angle) = rotate {
                assert!([90, 180, 270].contains(&angle));
            }
        }
    }

    #[test]
    fn invalid_orientation_is_normal() {
        assert_eq!(orientation_transforms(0), (None, false, false));
        assert_eq!(orientation_transforms(9), (None, false, false));
        assert_eq!(orientation_transforms(255), (None, false, false));
    }

    #[test]
    fn no_exif_means_orientation_one() {
        let img = RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255]));
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut cursor, image::ImageFormat::Png)
            .unwrap();

        assert_eq!(read_exif_orientation(&buffer), 1);
        assert_eq!(read_exif_orientation(b"not an image"), 1);
    }

    #[test]
    fn applying_no_orientation_keeps_dimensions() {
        let img =
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 2, Rgba([0, 255, 0, 255])));
        let oriented = apply_exif_orientation(img.clone(), b"");
        assert_eq!(oriented.dimensions(), img.dimensions());
    }

    #[test]
    fn rotation_swaps_dimensions() {
        let img =
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 2, Rgba([0, 0, 255, 255])));
        assert_eq!(rotate_by_angle(img.clone(), 90).dimensions(), (2, 4));
        assert_eq!(rotate_by_angle(img.clone(), 180).dimensions(), (4, 2));
        assert_eq!(rotate_by_angle(img, 270).dimensions(), (2, 4));
    }
}
