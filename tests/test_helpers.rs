//! # Test Helper Library
//!
//! Shared fixtures for integration tests: a scripted text recognizer and
//! in-memory receipt images.

#![allow(dead_code)]

use async_trait::async_trait;
use image::{ImageFormat, Rgba, RgbaImage};
use parking_lot::Mutex;
use receipt_scanner::ocr::{LanguageHints, OcrError, RawRecognition, TextRecognizer};
use std::collections::HashMap;
use std::io::Cursor;

pub const STUB_SERVICE_NAME: &str = "stub-ocr";

/// Recognizer that answers by raster width.
///
/// A 100px-wide source scaled by 1.5 arrives as a 150px raster, so scripting
/// width 150 scripts the second scale attempt. Unscripted widths recognize no
/// text.
#[derive(Default)]
pub struct ScriptedRecognizer {
    by_width: HashMap<u32, Result<String, OcrError>>,
    calls: Mutex<Vec<u32>>,
}

impl ScriptedRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, width: u32, text: &str) -> Self {
        self.by_width.insert(width, Ok(text.to_string()));
        self
    }

    pub fn with_error(mut self, width: u32, error: OcrError) -> Self {
        self.by_width.insert(width, Err(error));
        self
    }

    /// Raster widths seen so far, in call order
    pub fn calls(&self) -> Vec<u32> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl TextRecognizer for ScriptedRecognizer {
    fn service_name(&self) -> &str {
        STUB_SERVICE_NAME
    }

    async fn recognize(
        &self,
        raster: &RgbaImage,
        _languages: &LanguageHints,
    ) -> Result<RawRecognition, OcrError> {
        self.calls.lock().push(raster.width());
        match self.by_width.get(&raster.width()) {
            Some(Ok(text)) => Ok(RawRecognition::from_text(text)),
            Some(Err(err)) => Err(err.clone()),
            None => Ok(RawRecognition::default()),
        }
    }
}

/// PNG-encoded blank receipt photo
pub fn receipt_png(width: u32, height: u32) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    RgbaImage::from_pixel(width, height, Rgba([250, 250, 250, 255]))
        .write_to(&mut buffer, ImageFormat::Png)
        .expect("PNG encoding of an in-memory image should succeed");
    buffer.into_inner()
}
