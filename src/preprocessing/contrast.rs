//! # Contrast Stretch
//!
//! Linear contrast adjustment around mid-grey:
//! `out = clamp(factor * (in - 128) + 128)` with
//! `factor = 259 * (c + 1) / (259 - c)`.

use image::RgbaImage;

/// Contrast level used for receipt rasters
pub const DEFAULT_CONTRAST: f32 = 1.5;

pub fn contrast_factor(contrast: f32) -> f32 {
    259.0 * (contrast + 1.0) / (259.0 - contrast)
}

/// Stretch the RGB channels in place; alpha is left unchanged
pub fn apply_contrast(raster: &mut RgbaImage, contrast: f32) {
    let factor = contrast_factor(contrast);
    for pixel in raster.pixels_mut() {
        for channel in pixel.0.iter_mut().take(3) {
            let adjusted = factor * (*channel as f32 - 128.0) + 128.0;
            *channel = adjusted.round().clamp(0.0, 255.0) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_contrast_factor() {
        assert!((contrast_factor(1.5) - 2.5146).abs() < 0.001);
        assert!((contrast_factor(0.0) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_apply_contrast_clamps_and_preserves_alpha() {
        let mut raster = RgbaImage::new(4, 1);
        raster.put_pixel(0, 0, Rgba([128, 128, 128, 255]));
        raster.put_pixel(1, 0, Rgba([200, 200, 200, 100]));
        raster.put_pixel(2, 0, Rgba([100, 100, 100, 0]));
        raster.put_pixel(3, 0, Rgba([0, 255, 10, 42]));

        apply_contrast(&mut raster, DEFAULT_CONTRAST);

        assert_eq!(raster.get_pixel(0, 0), &Rgba([128, 128, 128, 255]));
        assert_eq!(raster.get_pixel(1, 0), &Rgba([255, 255, 255, 100]));
        assert_eq!(raster.get_pixel(2, 0), &Rgba([58, 58, 58, 0]));
        assert_eq!(raster.get_pixel(3, 0), &Rgba([0, 255, 0, 42]));
    }
}
