//! # Scale Retry Controller
//!
//! Runs recognition plus extraction over a fixed sequence of scale factors and
//! stops at the first attempt that finds a total. Attempts run strictly one
//! after another; each raster is dropped before the next scale is prepared.
//!
//! Each run owns a fresh [`CircuitBreaker`]: once recognition has failed
//! `circuit_breaker_threshold` times in a row, the remaining attempts of that
//! run are skipped without calling the engine.

use image::DynamicImage;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn, Instrument};

use crate::circuit_breaker::CircuitBreaker;
use crate::errors::error_logging;
use crate::line_items::LineItemExtractor;
use crate::observability;
use crate::ocr::TextRecognizer;
use crate::ocr_config::{LanguageHints, RecoveryConfig};
use crate::ocr_errors::OcrError;
use crate::preprocessing::prepare_raster;
use crate::receipt::{AmountCandidate, ReceiptExtractionResult};
use crate::total_amount::TotalAmountExtractor;

/// Scale factors tried in order
pub const DEFAULT_SCALE_FACTORS: [f32; 4] = [1.2, 1.5, 2.0, 2.5];

/// What a single attempt produced
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    /// A total was found
    Accepted {
        result: ReceiptExtractionResult,
        total: AmountCandidate,
    },
    /// Recognition succeeded but no total qualified
    NoTotal,
    /// Recognition failed
    Failed(OcrError),
}

impl AttemptOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            AttemptOutcome::Accepted { .. } => "accepted",
            AttemptOutcome::NoTotal => "no_total",
            AttemptOutcome::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Stop,
    Continue,
}

/// Stop on the first accepted attempt, continue otherwise
pub fn decide(outcome: &AttemptOutcome) -> RetryDecision {
    match outcome {
        AttemptOutcome::Accepted { .. } => RetryDecision::Stop,
        AttemptOutcome::NoTotal | AttemptOutcome::Failed(_) => RetryDecision::Continue,
    }
}

/// Per-attempt record kept for diagnostics
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptReport {
    pub scale_factor: f32,
    pub outcome: &'static str,
    pub duration: Duration,
    pub error: Option<String>,
}

/// Result of a full retry run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetryOutcome {
    pub result: ReceiptExtractionResult,
    pub total: Option<AmountCandidate>,
    pub winning_scale: Option<f32>,
    pub attempts: Vec<AttemptReport>,
}

impl RetryOutcome {
    pub fn failed_attempts(&self) -> impl Iterator<Item = &AttemptReport> {
        self.attempts.iter().filter(|a| a.error.is_some())
    }
}

/// Drives recognition and extraction across scale factors
pub struct ScaleRetryController<'a> {
    recognizer: &'a dyn TextRecognizer,
    languages: &'a LanguageHints,
    scale_factors: &'a [f32],
    contrast: f32,
    recovery: &'a RecoveryConfig,
    totals: &'a TotalAmountExtractor,
    items: &'a LineItemExtractor,
}

impl<'a> ScaleRetryController<'a> {
    pub fn new(
        recognizer: &'a dyn TextRecognizer,
        languages: &'a LanguageHints,
        scale_factors: &'a [f32],
        contrast: f32,
        recovery: &'a RecoveryConfig,
        totals: &'a TotalAmountExtractor,
        items: &'a LineItemExtractor,
    ) -> Self {
        Self {
            recognizer,
            languages,
            scale_factors,
            contrast,
            recovery,
            totals,
            items,
        }
    }

    /// Try each scale factor until one yields a total.
    ///
    /// When every attempt misses, the result is an empty extraction with a zero
    /// total; the attempt reports say why.
    pub async fn run(&self, image: &DynamicImage) -> RetryOutcome {
        let mut outcome = RetryOutcome::default();
        let breaker = CircuitBreaker::new(self.recovery.clone());

        for &scale_factor in self.scale_factors {
            let start_time = Instant::now();
            let attempt = if breaker.is_open() {
                observability::update_circuit_breaker_state(true);
                AttemptOutcome::Failed(OcrError::Unavailable(format!(
                    "skipped after {} failed attempts",
                    breaker.failure_count()
                )))
            } else {
                let attempt = self
                    .attempt(image, scale_factor)
                    .instrument(observability::ocr_span("scale_attempt", scale_factor))
                    .await;
                match &attempt {
                    AttemptOutcome::Failed(_) => breaker.record_failure(),
                    _ => breaker.record_success(),
                }
                attempt
            };
            let duration = start_time.elapsed();

            observability::record_scale_attempt(scale_factor, attempt.label());
            outcome.attempts.push(AttemptReport {
                scale_factor,
                outcome: attempt.label(),
                duration,
                error: match &attempt {
                    AttemptOutcome::Failed(err) => Some(err.to_string()),
                    _ => None,
                },
            });

            let decision = decide(&attempt);
            match attempt {
                AttemptOutcome::Accepted { result, total } => {
                    info!(
                        scale_factor,
                        total = result.total_amount,
                        items = result.items.len(),
                        "Scale attempt accepted"
                    );
                    outcome.result = result;
                    outcome.total = Some(total);
                    outcome.winning_scale = Some(scale_factor);
                }
                AttemptOutcome::NoTotal => debug!(scale_factor, "No total at this scale"),
                AttemptOutcome::Failed(err) => {
                    warn!(scale_factor, error = %err, "Scale attempt failed");
                }
            }

            if decision == RetryDecision::Stop {
                break;
            }
        }

        if outcome.winning_scale.is_none() {
            info!(
                attempts = outcome.attempts.len(),
                "No scale factor produced a total"
            );
        }
        outcome
    }

    /// One attempt: prepare the raster, recognize, extract
    pub async fn attempt(&self, image: &DynamicImage, scale_factor: f32) -> AttemptOutcome {
        let prepared = prepare_raster(image, scale_factor, self.contrast);
        let start_time = Instant::now();

        let recognition = match self
            .recognizer
            .recognize(&prepared.raster, self.languages)
            .await
        {
            Ok(recognition) => recognition,
            Err(err) => {
                error_logging::log_ocr_error(
                    &err,
                    "scale_attempt",
                    Some(scale_factor),
                    Some(prepared.new_dimensions),
                    Some(start_time.elapsed()),
                );
                return AttemptOutcome::Failed(err);
            }
        };
        drop(prepared);

        let Some(total) = self.totals.extract(&recognition.lines) else {
            return AttemptOutcome::NoTotal;
        };
        let items = self.items.extract(&recognition.lines, total.value);

        AttemptOutcome::Accepted {
            result: ReceiptExtractionResult {
                total_amount: total.value,
                items,
            },
            total,
        }
    }
}
