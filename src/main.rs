use anyhow::Result;
use clap::Parser;
use receipt_scanner::analyzer::{AnalysisStage, ReceiptAnalyzer};
use receipt_scanner::config::{parse_scale_factors, AppConfig};
use receipt_scanner::errors::error_logging;
use receipt_scanner::observability;
use receipt_scanner::ocr::TesseractRecognizer;
use receipt_scanner::ocr_config::LanguageHints;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "receipt-scanner")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Extract the total and line items from a receipt photo", long_about = None)]
struct Cli {
    /// Receipt image (PNG, JPEG, BMP, TIFF or WebP)
    image: PathBuf,

    /// OCR language hints, e.g. kor+eng
    #[arg(long)]
    languages: Option<String>,

    /// Comma-separated scale factors tried in order, e.g. 1.2,1.5,2.0
    #[arg(long)]
    scales: Option<String>,

    /// Print compact JSON instead of pretty-printed JSON
    #[arg(long)]
    compact: bool,

    /// Print collected Prometheus metrics to stderr after the analysis
    #[arg(long)]
    metrics: bool,
}

/// Load configuration and apply command line overrides
fn load_configuration(cli: &Cli) -> Result<AppConfig> {
    let mut config = AppConfig::from_env()?;

    if let Some(languages) = &cli.languages {
        config.ocr.languages = LanguageHints::parse(languages);
    }
    if let Some(scales) = &cli.scales {
        config.pipeline.scale_factors = parse_scale_factors(scales)?;
    }

    config.validate().map_err(|e| {
        error_logging::log_config_error(&e, "app_config", "startup_validation");
        anyhow::anyhow!("Configuration validation failed: {}. Please check your configuration values.", e)
    })?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file first
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = load_configuration(&cli)?;

    observability::init_tracing(&config.observability)?;
    let metrics_handle = if cli.metrics || config.observability.enable_metrics {
        Some(observability::init_metrics()?)
    } else {
        None
    };
    info!("{}", config.summary());

    let recognizer = Arc::new(TesseractRecognizer::new(config.ocr.clone()));
    let analyzer = ReceiptAnalyzer::from_config(recognizer, &config)?;

    let progress = |stage: AnalysisStage, percent: u8, message: &str| {
        info!(stage = stage.as_str(), percent, "{}", message);
    };
    let result = analyzer.analyze_file(&cli.image, Some(&progress)).await;

    let json = if cli.compact {
        serde_json::to_string(&result)?
    } else {
        serde_json::to_string_pretty(&result)?
    };
    println!("{json}");

    if cli.metrics {
        if let Some(handle) = metrics_handle {
            eprintln!("{}", handle.render());
        }
    }

    if result.is_failure() {
        std::process::exit(1);
    }
    Ok(())
}
