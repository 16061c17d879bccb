//! Observability setup: structured logging, Prometheus metrics and the spans
//! and metric helpers used by the analysis pipeline.

use anyhow::Result;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use tracing_subscriber::prelude::*;

use crate::observability_config::{LogFormat, ObservabilityConfig};

/// Initialize structured logging with tracing
pub fn init_tracing(config: &ObservabilityConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("receipt_scanner={}", config.log_level).parse()?);

    match config.effective_log_format() {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_thread_names(false),
            )
            .try_init()?,
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .try_init()?,
    }

    tracing::info!(
        environment = %config.environment,
        log_level = %config.log_level,
        "Tracing initialized with structured logging"
    );
    Ok(())
}

/// Install the Prometheus recorder
pub fn init_metrics() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    tracing::info!("Metrics collection initialized");
    Ok(handle)
}

/// Span covering one full receipt analysis
pub fn receipt_span(analysis_id: &str) -> tracing::Span {
    tracing::info_span!("receipt_analysis", analysis_id = analysis_id, component = "analyzer")
}

/// Span for a single OCR call
pub fn ocr_span(operation: &str, scale_factor: f32) -> tracing::Span {
    tracing::info_span!(
        "ocr_operation",
        operation = operation,
        scale_factor = scale_factor,
        component = "ocr"
    )
}

/// Record the outcome of one scale attempt
pub fn record_scale_attempt(scale_factor: f32, outcome: &'static str) {
    metrics::counter!(
        "receipt_scale_attempts_total",
        "scale" => format!("{scale_factor:.1}"),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record OCR engine timing
pub fn record_ocr_metrics(success: bool, duration: Duration) {
    metrics::counter!("ocr_operations_total", "result" => if success { "success" } else { "failure" })
        .increment(1);
    metrics::histogram!("receipt_ocr_duration_seconds").record(duration.as_secs_f64());
}

/// Record which total-amount tier produced the total
pub fn record_total_tier(tier: &'static str) {
    metrics::counter!("receipt_total_tier_total", "tier" => tier).increment(1);
}

/// Record the outcome of a full analysis
pub fn record_analysis_metrics(result: &'static str, duration: Duration, item_count: usize) {
    metrics::counter!("receipt_analyses_total", "result" => result).increment(1);
    metrics::histogram!("receipt_analysis_duration_seconds").record(duration.as_secs_f64());
    metrics::histogram!("receipt_items_extracted").record(item_count as f64);
}

/// Update circuit breaker state
pub fn update_circuit_breaker_state(is_open: bool) {
    metrics::gauge!("ocr_circuit_breaker_state").set(if is_open { 1.0 } else { 0.0 });
}
