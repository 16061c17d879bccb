//! # Receipt Scanner
//!
//! Extracts the total amount and purchased line items from photographed
//! receipts. A photo is upscaled at several scale factors in turn, passed to a
//! text recognition engine, and the recognized text is searched for the total
//! and for product lines until one attempt yields a total.
//!
//! ```no_run
//! use std::sync::Arc;
//! use receipt_scanner::analyzer::ReceiptAnalyzer;
//! use receipt_scanner::config::AppConfig;
//! use receipt_scanner::ocr::TesseractRecognizer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! let recognizer = Arc::new(TesseractRecognizer::new(config.ocr.clone()));
//! let analyzer = ReceiptAnalyzer::from_config(recognizer, &config)?;
//!
//! let bytes = std::fs::read("receipt.jpg")?;
//! let result = analyzer.analyze(&bytes, None).await;
//! println!("total: {}", result.total_amount);
//! # Ok(())
//! # }
//! ```

pub mod amount;
pub mod analyzer;
pub mod circuit_breaker;
pub mod config;
pub mod errors;
pub mod instance_manager;
pub mod line_items;
pub mod observability;
pub mod observability_config;
pub mod ocr;
pub mod ocr_config;
pub mod ocr_errors;
pub mod patterns;
pub mod preprocessing;
pub mod receipt;
pub mod scale_retry;
pub mod total_amount;
pub mod validation;

// Re-export types for easier access
pub use analyzer::{AnalysisStage, AnalyzedItem, ReceiptAnalysisResult, ReceiptAnalyzer};
pub use receipt::{ReceiptExtractionResult, ReceiptLineItem};
