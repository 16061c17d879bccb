//! # Shared Types for Image Preprocessing

use image::RgbaImage;

/// Raster produced for a single scale attempt.
///
/// Owned by the attempt that created it and dropped when the attempt ends.
#[derive(Debug, Clone)]
pub struct RasterAttempt {
    /// Scale factor applied
    pub scale_factor: f32,
    /// The scaled, contrast-adjusted raster
    pub raster: RgbaImage,
    /// Source image dimensions (width, height)
    pub original_dimensions: (u32, u32),
    /// Raster dimensions (width, height)
    pub new_dimensions: (u32, u32),
    /// Processing time in milliseconds
    pub processing_time_ms: u32,
}

/// Result of image quality assessment.
#[derive(Debug, Clone)]
pub struct ImageQualityResult {
    /// Overall quality classification
    pub quality: ImageQuality,
    /// Spread between ink and paper levels (0.0-1.0, higher is better)
    pub contrast_ratio: f32,
    /// Mean intensity (0.0-1.0)
    pub brightness: f32,
    /// Edge density score (0.0-1.0, higher is sharper)
    pub sharpness: f32,
    /// Processing time in milliseconds
    pub processing_time_ms: u32,
}

/// Image quality classifications.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub enum ImageQuality {
    /// High quality, recognition should go well
    High,
    /// Medium quality
    Medium,
    /// Low quality, results are likely incomplete
    Low,
}
