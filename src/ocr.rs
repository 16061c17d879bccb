//! # OCR Adapter Module
//!
//! Boundary between the extraction pipeline and the text recognition engine.
//! The pipeline only sees [`TextRecognizer`]: give it a raster and language
//! hints, get back plain text lines or an [`OcrError`].
//!
//! [`TesseractRecognizer`] is the production implementation. It reuses loaded
//! Tesseract engines through [`OcrInstanceManager`] and runs recognition on the
//! blocking thread pool under a timeout. The engine cache is the only thing
//! shared between analyses: each call holds its instance's lock for the whole
//! load-and-recognize sequence, so no recognition state carries over from one
//! call to the next. Failure tracking lives in the scale retry controller and
//! is scoped to a single analysis.

use async_trait::async_trait;
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;
use std::time::Instant;
use tracing::{info, Instrument};

use crate::errors::error_logging;
pub use crate::instance_manager::OcrInstanceManager;
use crate::observability;
pub use crate::ocr_config::{LanguageHints, OcrConfig, RecoveryConfig};
pub use crate::ocr_errors::OcrError;
pub use crate::receipt::RawRecognition;

/// Service name reported in analysis results
pub const TESSERACT_SERVICE_NAME: &str = "tesseract-ocr";

/// A text recognition engine
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Identifier reported in `usedServices`
    fn service_name(&self) -> &str;

    /// Recognize text in a raster. Each call is independent of the previous ones.
    async fn recognize(
        &self,
        raster: &RgbaImage,
        languages: &LanguageHints,
    ) -> Result<RawRecognition, OcrError>;
}

/// Tesseract-backed recognizer
pub struct TesseractRecognizer {
    config: OcrConfig,
    instance_manager: OcrInstanceManager,
}

impl TesseractRecognizer {
    pub fn new(config: OcrConfig) -> Self {
        Self {
            config,
            instance_manager: OcrInstanceManager::new(),
        }
    }

    pub fn config(&self) -> &OcrConfig {
        &self.config
    }

    async fn perform_ocr_extraction(
        &self,
        raster: &RgbaImage,
        languages: &LanguageHints,
    ) -> Result<String, OcrError> {
        let png = encode_png(raster)?;
        let instance = self
            .instance_manager
            .get_instance(languages, self.config.model_type, self.config.psm_mode)
            .map_err(|e| OcrError::Initialization(e.to_string()))?;

        let timeout_secs = self.config.recovery.operation_timeout_secs;
        let task = tokio::task::spawn_blocking(move || {
            let mut tess = instance.lock();
            tess.set_image_from_mem(&png)
                .map_err(|e| OcrError::ImageEncode(format!("Failed to load raster for OCR: {e}")))?;
            tess.get_utf8_text().map_err(|e| {
                OcrError::Extraction(format!("Failed to extract text from raster: {e}"))
            })
        });

        match tokio::time::timeout(std::time::Duration::from_secs(timeout_secs), task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(OcrError::Extraction(format!(
                "OCR worker terminated unexpectedly: {join_error}"
            ))),
            Err(_) => Err(OcrError::Timeout(format!(
                "OCR operation timed out after {timeout_secs} seconds"
            ))),
        }
    }
}

#[async_trait]
impl TextRecognizer for TesseractRecognizer {
    fn service_name(&self) -> &str {
        TESSERACT_SERVICE_NAME
    }

    async fn recognize(
        &self,
        raster: &RgbaImage,
        languages: &LanguageHints,
    ) -> Result<RawRecognition, OcrError> {
        if languages.is_empty() {
            return Err(OcrError::Validation("no language hints given".to_string()));
        }
        if raster.width() == 0 || raster.height() == 0 {
            return Err(OcrError::Validation("raster has no pixels".to_string()));
        }

        let start_time = Instant::now();
        let result = self
            .perform_ocr_extraction(raster, languages)
            .instrument(tracing::debug_span!("tesseract", languages = %languages.to_tesseract()))
            .await;
        let duration = start_time.elapsed();

        match result {
            Ok(text) => {
                observability::record_ocr_metrics(true, duration);
                let recognition = RawRecognition::from_text(&text);
                info!(
                    duration_ms = duration.as_millis() as u64,
                    characters = text.len(),
                    lines = recognition.lines.len(),
                    "OCR processing completed"
                );
                Ok(recognition)
            }
            Err(err) => {
                observability::record_ocr_metrics(false, duration);
                error_logging::log_ocr_error(
                    &err,
                    "tesseract_recognize",
                    None,
                    Some(raster.dimensions()),
                    Some(duration),
                );
                Err(err)
            }
        }
    }
}

/// Encode a raster as PNG for the engine
fn encode_png(raster: &RgbaImage) -> Result<Vec<u8>, OcrError> {
    let mut buffer = Cursor::new(Vec::new());
    raster
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| OcrError::ImageEncode(e.to_string()))?;
    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_encode_png_produces_png_signature() {
        let raster = RgbaImage::from_pixel(3, 2, Rgba([255, 255, 255, 255]));
        let png = encode_png(&raster).unwrap();
        assert_eq!(image::guess_format(&png).unwrap(), ImageFormat::Png);
    }

    #[tokio::test]
    async fn test_empty_language_hints_are_rejected() {
        let recognizer = TesseractRecognizer::new(OcrConfig::default());
        let raster = RgbaImage::new(4, 4);
        let result = recognizer
            .recognize(&raster, &LanguageHints::parse(""))
            .await;
        assert!(matches!(result, Err(OcrError::Validation(_))));
        assert_eq!(recognizer.service_name(), TESSERACT_SERVICE_NAME);
    }

    #[tokio::test]
    async fn test_empty_raster_is_rejected_before_engine() {
        let recognizer = TesseractRecognizer::new(OcrConfig::default());
        let result = recognizer
            .recognize(&RgbaImage::new(0, 8), &LanguageHints::default())
            .await;
        assert!(matches!(result, Err(OcrError::Validation(_))));
    }
}
