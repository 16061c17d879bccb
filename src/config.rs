//! # Unified Application Configuration
//!
//! Consolidates OCR, pipeline, pattern bank and observability settings into a
//! single structure loaded from environment variables and validated at startup.

use crate::amount::AmountBounds;
use crate::errors::{AppError, AppResult};
use crate::line_items::LineItemConfig;
pub use crate::observability_config::ObservabilityConfig;
use crate::ocr_config::{LanguageHints, ModelType, OcrConfig};
use crate::patterns::{load_pattern_bank_config, PatternBankConfig};
use crate::preprocessing::DEFAULT_CONTRAST;
use crate::scale_retry::DEFAULT_SCALE_FACTORS;
use serde::{Deserialize, Serialize};
use std::env;

/// Extraction pipeline settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Scale factors tried in order
    pub scale_factors: Vec<f32>,
    /// Contrast level for raster preparation
    pub contrast: f32,
    pub min_amount: u64,
    pub max_amount: u64,
    /// Relative deviation from the total above which an item price is replaced
    pub price_correction_ratio: f64,
    /// Confidence assigned to every extracted item
    pub item_confidence: f32,
    pub min_line_chars: usize,
    pub max_line_chars: usize,
    pub min_name_chars: usize,
    pub max_name_chars: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let line_items = LineItemConfig::default();
        Self {
            scale_factors: DEFAULT_SCALE_FACTORS.to_vec(),
            contrast: DEFAULT_CONTRAST,
            min_amount: line_items.bounds.min,
            max_amount: line_items.bounds.max,
            price_correction_ratio: line_items.price_correction_ratio,
            item_confidence: 0.8,
            min_line_chars: line_items.min_line_chars,
            max_line_chars: line_items.max_line_chars,
            min_name_chars: line_items.min_name_chars,
            max_name_chars: line_items.max_name_chars,
        }
    }
}

impl PipelineConfig {
    pub fn amount_bounds(&self) -> AmountBounds {
        AmountBounds {
            min: self.min_amount,
            max: self.max_amount,
        }
    }

    pub fn line_item_config(&self) -> LineItemConfig {
        LineItemConfig {
            bounds: self.amount_bounds(),
            min_line_chars: self.min_line_chars,
            max_line_chars: self.max_line_chars,
            min_name_chars: self.min_name_chars,
            max_name_chars: self.max_name_chars,
            price_correction_ratio: self.price_correction_ratio,
        }
    }

    /// Validate pipeline configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.scale_factors.is_empty() {
            return Err(AppError::Config(
                "scale_factors cannot be empty".to_string(),
            ));
        }
        if let Some(bad) = self
            .scale_factors
            .iter()
            .find(|s| !s.is_finite() || **s <= 0.0 || **s > 8.0)
        {
            return Err(AppError::Config(format!(
                "scale factor {} must be in (0, 8]",
                bad
            )));
        }
        if !(0.0..259.0).contains(&self.contrast) {
            return Err(AppError::Config(format!(
                "contrast {} must be in [0, 259)",
                self.contrast
            )));
        }
        if self.min_amount == 0 || self.min_amount > self.max_amount {
            return Err(AppError::Config(format!(
                "amount bounds [{}, {}] are invalid",
                self.min_amount, self.max_amount
            )));
        }
        if self.price_correction_ratio <= 0.0 {
            return Err(AppError::Config(
                "price_correction_ratio must be greater than 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.item_confidence) {
            return Err(AppError::Config(
                "item_confidence must be between 0.0 and 1.0".to_string(),
            ));
        }
        if self.min_line_chars > self.max_line_chars || self.min_name_chars > self.max_name_chars
        {
            return Err(AppError::Config(
                "minimum lengths cannot exceed maximum lengths".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parse a comma-separated list of scale factors, e.g. `1.2,1.5,2.0`
pub fn parse_scale_factors(value: &str) -> AppResult<Vec<f32>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f32>()
                .map_err(|_| AppError::Config(format!("invalid scale factor: {}", s)))
        })
        .collect()
}

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// OCR adapter configuration
    pub ocr: OcrConfig,
    /// Extraction pipeline configuration
    pub pipeline: PipelineConfig,
    /// Keyword and exclusion pattern banks
    pub patterns: PatternBankConfig,
    /// Observability configuration
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(languages) = env::var("RECEIPT_OCR_LANGUAGES") {
            config.ocr.languages = LanguageHints::parse(&languages);
        }
        if let Ok(model) = env::var("OCR_MODEL_TYPE") {
            config.ocr.model_type = ModelType::parse(&model).ok_or_else(|| {
                AppError::Config("OCR_MODEL_TYPE must be 'fast' or 'best'".to_string())
            })?;
        }
        config.ocr.recovery.operation_timeout_secs = env::var("OCR_TIMEOUT_SECS")
            .unwrap_or_else(|_| config.ocr.recovery.operation_timeout_secs.to_string())
            .parse()
            .map_err(|_| AppError::Config("OCR_TIMEOUT_SECS must be a valid number".to_string()))?;

        if let Ok(scales) = env::var("RECEIPT_SCALE_FACTORS") {
            config.pipeline.scale_factors = parse_scale_factors(&scales)?;
        }

        config.observability = ObservabilityConfig::from_env();
        config.patterns = load_pattern_bank_config();

        Ok(config)
    }

    /// Validate all configuration sections
    pub fn validate(&self) -> AppResult<()> {
        self.ocr.validate()?;
        self.pipeline.validate()?;
        self.patterns.validate()?;
        self.observability.validate()?;
        Ok(())
    }

    /// Get a summary of the current configuration for logging
    pub fn summary(&self) -> String {
        format!(
            "Configuration: ocr_languages={}, ocr_model={}, ocr_timeout_secs={}, scale_factors={:?}, environment={}",
            self.ocr.languages.to_tesseract(),
            self.ocr.model_type.tessdata_dir(),
            self.ocr.recovery.operation_timeout_secs,
            self.pipeline.scale_factors,
            self.observability.environment
        )
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ocr: OcrConfig::default(),
            pipeline: PipelineConfig::default(),
            patterns: PatternBankConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validation() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pipeline.scale_factors, vec![1.2, 1.5, 2.0, 2.5]);
    }

    #[test]
    fn test_pipeline_config_validation() {
        let mut config = PipelineConfig::default();
        config.scale_factors.clear();
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.scale_factors = vec![1.2, -1.0];
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.min_amount = 2_000_000;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.item_confidence = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_scale_factors() {
        assert_eq!(parse_scale_factors("1.2, 2.0,").unwrap(), vec![1.2, 2.0]);
        assert!(matches!(
            parse_scale_factors("1.2,big"),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_line_item_config_mirrors_pipeline() {
        let pipeline = PipelineConfig {
            min_amount: 500,
            ..Default::default()
        };
        let items = pipeline.line_item_config();
        assert_eq!(items.bounds.min, 500);
        assert_eq!(items.max_name_chars, 50);
    }

    #[test]
    fn test_summary_mentions_languages() {
        let summary = AppConfig::default().summary();
        assert!(summary.contains("kor+eng"));
        assert!(summary.contains("tessdata_fast"));
    }
}
