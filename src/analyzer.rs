//! # Receipt Analyzer
//!
//! Entry point of the pipeline. [`ReceiptAnalyzer::analyze`] validates and
//! decodes the image, runs the scale retry controller, and maps the outcome into
//! a [`ReceiptAnalysisResult`]. It never returns an error: failures are recorded
//! in the result's `errors` with zero confidence.
//!
//! Progress is reported through an optional callback at fixed checkpoints:
//!
//! | stage      | percent | message                                 |
//! |------------|---------|-----------------------------------------|
//! | `ocr`      | 10      | Preparing image for text recognition    |
//! | `ocr`      | 60      | Text recognition complete               |
//! | `complete` | 100     | Analysis complete                       |
//! | `failed`   | 100     | the error message                       |

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

use crate::config::{AppConfig, PipelineConfig};
use crate::errors::{error_logging, AppError, AppResult};
use crate::line_items::LineItemExtractor;
use crate::observability;
use crate::ocr::TextRecognizer;
use crate::ocr_config::OcrConfig;
use crate::patterns::ReceiptPatterns;
use crate::preprocessing::{assess_image_quality, quality_feedback, ImageQualityResult};
use crate::receipt::ReceiptLineItem;
use crate::scale_retry::{RetryOutcome, ScaleRetryController};
use crate::total_amount::TotalAmountExtractor;
use crate::validation::{read_image_file, validate_image_bytes};

/// Source tag for items recovered by text recognition
pub const ITEM_SOURCE_OCR: &str = "ocr";

/// Pipeline stage reported to progress callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStage {
    Idle,
    Ocr,
    Complete,
    Failed,
}

impl AnalysisStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStage::Idle => "idle",
            AnalysisStage::Ocr => "ocr",
            AnalysisStage::Complete => "complete",
            AnalysisStage::Failed => "failed",
        }
    }
}

/// Progress callback: stage, percent (0-100), human-readable message
pub type ProgressCallback<'a> = dyn Fn(AnalysisStage, u8, &str) + Send + Sync + 'a;

/// An extracted item as handed to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzedItem {
    pub id: String,
    pub name: String,
    pub price: u64,
    pub quantity: u32,
    pub confidence: f32,
    pub source: String,
    pub is_selected: bool,
}

impl AnalyzedItem {
    fn from_line_item(item: ReceiptLineItem, confidence: f32) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: item.name,
            price: item.price,
            quantity: 1,
            confidence,
            source: ITEM_SOURCE_OCR.to_string(),
            is_selected: true,
        }
    }
}

/// Result of one analysis call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptAnalysisResult {
    pub items: Vec<AnalyzedItem>,
    pub total_amount: u64,
    pub confidence: f32,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
    pub processing_time_ms: u64,
    pub used_services: BTreeSet<String>,
}

impl ReceiptAnalysisResult {
    pub fn is_failure(&self) -> bool {
        !self.errors.is_empty()
    }
}

struct PipelineOutput {
    retry: RetryOutcome,
    quality: ImageQualityResult,
}

/// Orchestrates validation, recognition and extraction for receipt photos
pub struct ReceiptAnalyzer {
    recognizer: Arc<dyn TextRecognizer>,
    ocr: OcrConfig,
    pipeline: PipelineConfig,
    totals: TotalAmountExtractor,
    items: LineItemExtractor,
}

impl ReceiptAnalyzer {
    pub fn new(
        recognizer: Arc<dyn TextRecognizer>,
        ocr: OcrConfig,
        pipeline: PipelineConfig,
        patterns: Arc<ReceiptPatterns>,
    ) -> Self {
        let totals = TotalAmountExtractor::new(Arc::clone(&patterns), pipeline.amount_bounds());
        let items = LineItemExtractor::new(patterns, pipeline.line_item_config());
        Self {
            recognizer,
            ocr,
            pipeline,
            totals,
            items,
        }
    }

    /// Build an analyzer from validated application configuration
    pub fn from_config(recognizer: Arc<dyn TextRecognizer>, config: &AppConfig) -> AppResult<Self> {
        config.validate()?;
        let patterns = Arc::new(ReceiptPatterns::compile(&config.patterns)?);
        Ok(Self::new(
            recognizer,
            config.ocr.clone(),
            config.pipeline.clone(),
            patterns,
        ))
    }

    /// Analyze a receipt image held in memory
    pub async fn analyze(
        &self,
        image_bytes: &[u8],
        progress: Option<&ProgressCallback<'_>>,
    ) -> ReceiptAnalysisResult {
        let start_time = Instant::now();
        let analysis_id = Uuid::new_v4().to_string();
        let span = observability::receipt_span(&analysis_id);

        let result = self
            .run_pipeline(image_bytes, progress)
            .instrument(span.clone())
            .await;
        let _enter = span.enter();

        let mut analysis = match result {
            Ok(output) => self.build_result(output),
            Err(err) => {
                match &err {
                    AppError::Validation(_) | AppError::ImageDecode(_) => {
                        error_logging::log_validation_error(
                            &err,
                            "analyze",
                            "receipt_image",
                            Some(image_bytes.len() as u64),
                        )
                    }
                    _ => error_logging::log_internal_error(&err, "analyzer", "analyze"),
                }
                notify(progress, AnalysisStage::Failed, 100, &err.to_string());
                ReceiptAnalysisResult {
                    errors: vec![err.to_string()],
                    ..Default::default()
                }
            }
        };

        let elapsed = start_time.elapsed();
        analysis.processing_time_ms = elapsed.as_millis() as u64;

        let outcome = if analysis.is_failure() {
            "failure"
        } else if analysis.total_amount > 0 || !analysis.items.is_empty() {
            "success"
        } else {
            "empty"
        };
        observability::record_analysis_metrics(outcome, elapsed, analysis.items.len());

        if !analysis.is_failure() {
            notify(progress, AnalysisStage::Complete, 100, "Analysis complete");
        }
        info!(
            outcome,
            total_amount = analysis.total_amount,
            item_count = analysis.items.len(),
            confidence = analysis.confidence,
            duration_ms = analysis.processing_time_ms,
            "Receipt analysis finished"
        );
        analysis
    }

    /// Read a receipt image from disk and analyze it
    pub async fn analyze_file(
        &self,
        path: &Path,
        progress: Option<&ProgressCallback<'_>>,
    ) -> ReceiptAnalysisResult {
        let start_time = Instant::now();
        match read_image_file(path, &self.ocr) {
            Ok(bytes) => self.analyze(&bytes, progress).await,
            Err(err) => {
                notify(progress, AnalysisStage::Failed, 100, &err.to_string());
                ReceiptAnalysisResult {
                    errors: vec![err.to_string()],
                    processing_time_ms: start_time.elapsed().as_millis() as u64,
                    ..Default::default()
                }
            }
        }
    }

    async fn run_pipeline(
        &self,
        image_bytes: &[u8],
        progress: Option<&ProgressCallback<'_>>,
    ) -> AppResult<PipelineOutput> {
        notify(
            progress,
            AnalysisStage::Ocr,
            10,
            "Preparing image for text recognition",
        );

        let format = validate_image_bytes(image_bytes, &self.ocr)?;
        let image = image::load_from_memory_with_format(image_bytes, format)?;
        let quality = assess_image_quality(&image);

        let controller = ScaleRetryController::new(
            self.recognizer.as_ref(),
            &self.ocr.languages,
            &self.pipeline.scale_factors,
            self.pipeline.contrast,
            &self.ocr.recovery,
            &self.totals,
            &self.items,
        );
        let retry = controller.run(&image).await;

        notify(progress, AnalysisStage::Ocr, 60, "Text recognition complete");
        Ok(PipelineOutput { retry, quality })
    }

    fn build_result(&self, output: PipelineOutput) -> ReceiptAnalysisResult {
        let PipelineOutput { retry, quality } = output;
        let (mut warnings, mut suggestions) = quality_feedback(&quality);

        if retry.winning_scale.is_none() {
            for attempt in retry.failed_attempts() {
                if let Some(error) = &attempt.error {
                    warnings.push(format!(
                        "Text recognition failed at scale {:.1}: {}",
                        attempt.scale_factor, error
                    ));
                }
            }
        }
        if let Some(total) = &retry.total {
            observability::record_total_tier(total.tier.as_str());
        }

        for item in retry.result.items.iter().filter(|i| i.correction_applied) {
            warnings.push(format!(
                "Price of '{}' was adjusted to the receipt total",
                item.name
            ));
        }

        let total_amount = retry.result.total_amount;
        let items: Vec<AnalyzedItem> = retry
            .result
            .items
            .into_iter()
            .map(|item| AnalyzedItem::from_line_item(item, self.pipeline.item_confidence))
            .collect();

        let confidence = if total_amount > 0 {
            self.pipeline.item_confidence
        } else if !items.is_empty() {
            self.pipeline.item_confidence / 2.0
        } else {
            warn!("No amounts recognized on receipt");
            warnings.push("No receipt amounts could be recognized".to_string());
            suggestions.push(
                "Make sure the whole receipt is in the photo and the text is readable".to_string(),
            );
            0.0
        };

        let mut used_services = BTreeSet::new();
        used_services.insert(self.recognizer.service_name().to_string());

        ReceiptAnalysisResult {
            items,
            total_amount,
            confidence,
            errors: Vec::new(),
            warnings,
            suggestions,
            processing_time_ms: 0,
            used_services,
        }
    }
}

/// Invoke the progress callback; a panicking callback is logged and ignored
fn notify(progress: Option<&ProgressCallback<'_>>, stage: AnalysisStage, percent: u8, message: &str) {
    let Some(callback) = progress else {
        return;
    };
    if catch_unwind(AssertUnwindSafe(|| callback(stage, percent, message))).is_err() {
        warn!(stage = stage.as_str(), percent, "Progress callback panicked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_result_serializes_with_camel_case_fields() {
        let mut result = ReceiptAnalysisResult {
            items: vec![AnalyzedItem::from_line_item(
                ReceiptLineItem {
                    name: "아메리카노".to_string(),
                    price: 4500,
                    correction_applied: false,
                },
                0.8,
            )],
            total_amount: 4500,
            confidence: 0.8,
            ..Default::default()
        };
        result.used_services.insert("tesseract-ocr".to_string());

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["totalAmount"], 4500);
        assert_eq!(json["usedServices"][0], "tesseract-ocr");
        assert_eq!(json["items"][0]["isSelected"], true);
        assert_eq!(json["items"][0]["quantity"], 1);
        assert_eq!(json["items"][0]["source"], "ocr");
        assert!(json.get("processingTimeMs").is_some());
    }

    #[test]
    fn test_item_ids_are_unique() {
        let line = ReceiptLineItem {
            name: "커피".to_string(),
            price: 3000,
            correction_applied: false,
        };
        let a = AnalyzedItem::from_line_item(line.clone(), 0.8);
        let b = AnalyzedItem::from_line_item(line, 0.8);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_notify_swallows_panics() {
        let calls = AtomicUsize::new(0);
        let callback = |_: AnalysisStage, _: u8, _: &str| {
            calls.fetch_add(1, Ordering::SeqCst);
            panic!("progress display crashed");
        };
        notify(Some(&callback), AnalysisStage::Ocr, 10, "start");
        notify(None, AnalysisStage::Ocr, 60, "done");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stage_serialization() {
        assert_eq!(
            serde_json::to_string(&AnalysisStage::Complete).unwrap(),
            "\"complete\""
        );
    }
}
