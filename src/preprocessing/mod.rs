//! # Image Preprocessing Module
//!
//! Prepares decoded receipt images for text recognition.
//!
//! The module is organized into focused sub-modules:
//! - `scaling`: nearest-neighbour upscaling by an explicit factor
//! - `contrast`: linear contrast stretch of the colour channels
//! - `quality`: image quality assessment used for user-facing warnings
//! - `types`: shared result types

pub mod contrast;
pub mod quality;
pub mod scaling;
pub mod types;

pub use types::{ImageQuality, ImageQualityResult, RasterAttempt};

pub use contrast::{apply_contrast, contrast_factor, DEFAULT_CONTRAST};
pub use quality::{assess_image_quality, quality_feedback};
pub use scaling::{scale_image, scaled_dimensions};

use image::DynamicImage;

/// Produce the raster for one recognition attempt: scale, then stretch contrast.
///
/// The source image is left untouched; every attempt gets a fresh raster.
pub fn prepare_raster(image: &DynamicImage, scale_factor: f32, contrast: f32) -> RasterAttempt {
    let start_time = std::time::Instant::now();
    let original_dimensions = (image.width(), image.height());

    let mut raster = scale_image(image, scale_factor);
    apply_contrast(&mut raster, contrast);

    let new_dimensions = raster.dimensions();
    let processing_time = start_time.elapsed();

    tracing::debug!(
        target: "ocr_preprocessing",
        scale_factor,
        original_width = original_dimensions.0,
        original_height = original_dimensions.1,
        width = new_dimensions.0,
        height = new_dimensions.1,
        duration_ms = processing_time.as_millis() as u64,
        "Raster prepared"
    );

    RasterAttempt {
        scale_factor,
        raster,
        original_dimensions,
        new_dimensions,
        processing_time_ms: processing_time.as_millis() as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_prepare_raster_scales_and_keeps_source() {
        let source = DynamicImage::ImageRgba8(RgbaImage::from_pixel(100, 40, Rgba([128, 128, 128, 255])));
        let attempt = prepare_raster(&source, 1.5, DEFAULT_CONTRAST);

        assert_eq!(attempt.new_dimensions, (150, 60));
        assert_eq!(attempt.original_dimensions, (100, 40));
        assert_eq!(source.width(), 100);
        assert_eq!(attempt.raster.get_pixel(0, 0), &Rgba([128, 128, 128, 255]));
    }
}
