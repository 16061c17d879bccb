//! # Raster Scaling
//!
//! Receipts are photographed at widely varying resolutions, so each recognition
//! attempt upscales the source by a fixed factor. Nearest-neighbour keeps glyph
//! edges hard, which the recognizer prefers over smooth interpolation.

use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};

/// Target dimensions for a scale factor, never below 1x1
pub fn scaled_dimensions(width: u32, height: u32, scale_factor: f32) -> (u32, u32) {
    let scale = |value: u32| ((value as f32 * scale_factor).round() as u32).max(1);
    (scale(width), scale(height))
}

/// Resize to `(w·s, h·s)` with nearest-neighbour sampling
pub fn scale_image(image: &DynamicImage, scale_factor: f32) -> RgbaImage {
    let (new_width, new_height) = scaled_dimensions(image.width(), image.height(), scale_factor);
    image
        .resize_exact(new_width, new_height, FilterType::Nearest)
        .to_rgba8()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_scaled_dimensions() {
        assert_eq!(scaled_dimensions(100, 200, 1.2), (120, 240));
        assert_eq!(scaled_dimensions(100, 200, 2.5), (250, 500));
        assert_eq!(scaled_dimensions(1, 1, 0.1), (1, 1));
    }

    #[test]
    fn test_scale_image_nearest_keeps_exact_colours() {
        let mut img = RgbaImage::from_pixel(2, 1, Rgba([0, 0, 0, 255]));
        img.put_pixel(1, 0, Rgba([255, 255, 255, 255]));
        let scaled = scale_image(&DynamicImage::ImageRgba8(img), 2.0);

        assert_eq!(scaled.dimensions(), (4, 2));
        for pixel in scaled.pixels() {
            assert!(pixel.0 == [0, 0, 0, 255] || pixel.0 == [255, 255, 255, 255]);
        }
    }
}
