//! # OCR Error Types Module
//!
//! Error types reported by the OCR adapter. Every variant is recoverable from the
//! point of view of the scale retry controller: a failed attempt is recorded and
//! the next scale factor is tried.

/// Custom error types for OCR operations
#[derive(Debug, Clone, PartialEq)]
pub enum OcrError {
    /// Raster or language hint validation errors
    Validation(String),
    /// OCR engine initialization errors
    Initialization(String),
    /// Raster could not be encoded for the engine
    ImageEncode(String),
    /// Text extraction errors
    Extraction(String),
    /// Timeout errors
    Timeout(String),
    /// Engine rejected the call because the circuit breaker is open
    Unavailable(String),
}

impl std::fmt::Display for OcrError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OcrError::Validation(msg) => write!(f, "[OCR_VALIDATION] Raster validation failed: {}", msg),
            OcrError::Initialization(msg) => write!(f, "[OCR_INIT] OCR engine initialization failed: {}", msg),
            OcrError::ImageEncode(msg) => write!(f, "[OCR_ENCODE] Failed to encode raster for OCR processing: {}", msg),
            OcrError::Extraction(msg) => write!(f, "[OCR_EXTRACT] Text extraction from raster failed: {}", msg),
            OcrError::Timeout(msg) => write!(f, "[OCR_TIMEOUT] OCR processing timed out: {}", msg),
            OcrError::Unavailable(msg) => write!(f, "[OCR_UNAVAILABLE] OCR engine temporarily unavailable: {}", msg),
        }
    }
}

impl std::error::Error for OcrError {}

impl From<anyhow::Error> for OcrError {
    fn from(err: anyhow::Error) -> Self {
        OcrError::Extraction(err.to_string())
    }
}

impl OcrError {
    /// Short machine-friendly label, used as a metrics tag
    pub fn kind(&self) -> &'static str {
        match self {
            OcrError::Validation(_) => "validation",
            OcrError::Initialization(_) => "initialization",
            OcrError::ImageEncode(_) => "image_encode",
            OcrError::Extraction(_) => "extraction",
            OcrError::Timeout(_) => "timeout",
            OcrError::Unavailable(_) => "unavailable",
        }
    }
}
