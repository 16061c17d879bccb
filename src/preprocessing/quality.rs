//! # Receipt Photo Quality
//!
//! Scores the decoded photo on three things that decide whether receipt text
//! can be read: how far the ink stands out from the paper, how well lit the
//! paper is, and whether glyph edges are crisp. The scores only feed the
//! warnings and suggestions of an analysis result; they never change how the
//! image is processed.

use image::{DynamicImage, GrayImage};
use tracing::debug;

use super::types::{ImageQuality, ImageQualityResult};

/// Minimum ink/paper spread before the background is blamed
pub const MIN_CONTRAST: f32 = 0.2;
/// Mean level below which the photo is too dark
pub const MIN_BRIGHTNESS: f32 = 0.25;
/// Mean level above which the paper is washed out by glare or flash
pub const MAX_BRIGHTNESS: f32 = 0.9;
/// Minimum edge score before the photo counts as blurred
pub const MIN_SHARPNESS: f32 = 0.05;

/// Intensity step between neighbours that counts as a glyph edge
const EDGE_STEP: u16 = 48;
/// Share of edge pixels at which a receipt photo scores as fully sharp
const SHARP_EDGE_SHARE: f32 = 0.05;

/// Score a receipt photo. Empty images score as neutral Medium quality.
pub fn assess_image_quality(image: &DynamicImage) -> ImageQualityResult {
    let start_time = std::time::Instant::now();
    let gray = image.to_luma8();

    let (contrast_ratio, brightness) = ink_spread_and_brightness(&gray);
    let sharpness = edge_score(&gray);
    let quality = classify(contrast_ratio, brightness, sharpness);

    let processing_time = start_time.elapsed();
    debug!(
        target: "ocr_preprocessing",
        quality = ?quality,
        contrast_ratio,
        brightness,
        sharpness,
        duration_ms = processing_time.as_millis() as u64,
        "Receipt photo quality assessed"
    );

    ImageQualityResult {
        quality,
        contrast_ratio,
        brightness,
        sharpness,
        processing_time_ms: processing_time.as_millis() as u32,
    }
}

/// User-facing warnings and suggestions for a quality assessment
pub fn quality_feedback(result: &ImageQualityResult) -> (Vec<String>, Vec<String>) {
    let mut warnings = Vec::new();
    let mut suggestions = Vec::new();

    if result.quality == ImageQuality::Low {
        warnings.push("Image quality is low; recognized amounts may be incomplete".to_string());
    }
    if result.contrast_ratio < MIN_CONTRAST {
        suggestions.push("Photograph the receipt on a dark, plain background".to_string());
    }
    if result.brightness < MIN_BRIGHTNESS {
        suggestions.push("Use more light when photographing the receipt".to_string());
    } else if result.brightness > MAX_BRIGHTNESS {
        suggestions.push("Avoid glare and direct flash on the receipt".to_string());
    }
    if result.sharpness < MIN_SHARPNESS {
        suggestions.push("Hold the camera steady and make sure the receipt is in focus".to_string());
    }

    (warnings, suggestions)
}

/// Spread between the 5th and 95th intensity percentiles, and mean level,
/// both on a 0.0-1.0 scale
fn ink_spread_and_brightness(gray: &GrayImage) -> (f32, f32) {
    let mut histogram = [0u64; 256];
    for pixel in gray.pixels() {
        histogram[pixel[0] as usize] += 1;
    }
    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return (0.0, 0.5);
    }

    let level_at = |share: f64| -> usize {
        let rank = (total as f64 * share) as u64;
        let mut seen = 0;
        for (level, count) in histogram.iter().enumerate() {
            seen += count;
            if seen > rank {
                return level;
            }
        }
        255
    };
    let ink = level_at(0.05);
    let paper = level_at(0.95);

    let weighted: u64 = histogram
        .iter()
        .enumerate()
        .map(|(level, count)| level as u64 * count)
        .sum();
    let brightness = weighted as f32 / total as f32 / 255.0;

    (paper.saturating_sub(ink) as f32 / 255.0, brightness)
}

/// Share of pixels sitting on a sharp right or lower edge, scaled so that
/// `SHARP_EDGE_SHARE` of edge pixels scores 1.0
fn edge_score(gray: &GrayImage) -> f32 {
    let (width, height) = gray.dimensions();
    if width < 2 || height < 2 {
        return 0.0;
    }

    let mut edges = 0u64;
    for y in 0..height - 1 {
        for x in 0..width - 1 {
            let here = gray.get_pixel(x, y)[0] as i16;
            let right = gray.get_pixel(x + 1, y)[0] as i16;
            let below = gray.get_pixel(x, y + 1)[0] as i16;
            let step = (right - here).unsigned_abs() + (below - here).unsigned_abs();
            if step >= EDGE_STEP {
                edges += 1;
            }
        }
    }

    let share = edges as f32 / ((width - 1) as f32 * (height - 1) as f32);
    (share / SHARP_EDGE_SHARE).min(1.0)
}

/// High with no problems, Medium with one, Low with two or more
fn classify(contrast_ratio: f32, brightness: f32, sharpness: f32) -> ImageQuality {
    let problems = [
        contrast_ratio < MIN_CONTRAST,
        !(MIN_BRIGHTNESS..=MAX_BRIGHTNESS).contains(&brightness),
        sharpness < MIN_SHARPNESS,
    ]
    .into_iter()
    .filter(|problem| *problem)
    .count();

    match problems {
        0 => ImageQuality::High,
        1 => ImageQuality::Medium,
        _ => ImageQuality::Low,
    }
}
