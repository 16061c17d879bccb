//! # OCR Instance Manager Module
//!
//! Keeps initialized Tesseract instances for reuse. Creating an instance loads
//! the trained data for every requested language, which costs far more than a
//! single recognition of a receipt.

use leptess::LepTess;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::ocr_config::{LanguageHints, ModelType, PageSegMode};

/// Tesseract instances keyed by language hints and model type.
///
/// Instances are created on first request and live as long as the manager.
/// Each instance sits behind its own lock since `LepTess` is not reentrant.
pub struct OcrInstanceManager {
    instances: Mutex<HashMap<String, Arc<Mutex<LepTess>>>>,
}

impl OcrInstanceManager {
    pub fn new() -> Self {
        Self {
            instances: Mutex::new(HashMap::new()),
        }
    }

    pub fn instance_key(languages: &LanguageHints, model_type: ModelType) -> String {
        format!("{}:{}", languages.to_tesseract(), model_type.tessdata_dir())
    }

    /// Get or create an instance for the language hints
    ///
    /// # Errors
    ///
    /// Returns an error if Tesseract cannot load the trained data for the
    /// languages or rejects the page segmentation mode.
    pub fn get_instance(
        &self,
        languages: &LanguageHints,
        model_type: ModelType,
        psm_mode: PageSegMode,
    ) -> anyhow::Result<Arc<Mutex<LepTess>>> {
        let key = Self::instance_key(languages, model_type);

        if let Some(instance) = self.instances.lock().get(&key) {
            return Ok(Arc::clone(instance));
        }

        info!(
            languages = %languages.to_tesseract(),
            model = model_type.tessdata_dir(),
            "Creating new OCR instance"
        );

        let tessdata_path = Self::get_tessdata_path(model_type);
        let mut tess = LepTess::new(tessdata_path.as_deref(), &languages.to_tesseract())
            .map_err(|e| anyhow::anyhow!("Failed to initialize Tesseract OCR instance: {}", e))?;

        tess.set_variable(leptess::Variable::TesseditPagesegMode, psm_mode.as_str())
            .map_err(|e| anyhow::anyhow!("Failed to set PSM mode: {}", e))?;

        let instance = Arc::new(Mutex::new(tess));
        // Another caller may have raced us here; keep whichever landed first.
        let stored = self
            .instances
            .lock()
            .entry(key)
            .or_insert_with(|| Arc::clone(&instance))
            .clone();
        Ok(stored)
    }

    /// Tessdata directory for the model type, `None` to use Tesseract's default
    fn get_tessdata_path(model_type: ModelType) -> Option<String> {
        let dir = model_type.tessdata_dir();
        let candidates = [
            format!("/usr/share/tesseract-ocr/5/{dir}"),
            format!("/usr/share/tesseract-ocr/4.00/{dir}"),
            format!("/usr/share/{dir}"),
            format!("/usr/local/share/{dir}"),
        ];

        for path in candidates {
            if std::path::Path::new(&path).exists() {
                info!(path = %path, "Using tessdata path");
                return Some(path);
            }
        }

        info!(model = ?model_type, "No model-specific tessdata path found, using default");
        None
    }

    pub fn remove_instance(&self, languages: &LanguageHints, model_type: ModelType) -> bool {
        self.instances
            .lock()
            .remove(&Self::instance_key(languages, model_type))
            .is_some()
    }

    pub fn instance_count(&self) -> usize {
        self.instances.lock().len()
    }
}

impl Default for OcrInstanceManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_key_includes_languages_and_model() {
        let key = OcrInstanceManager::instance_key(&LanguageHints::default(), ModelType::Best);
        assert_eq!(key, "kor+eng:tessdata_best");
    }

    #[test]
    fn test_new_manager_is_empty() {
        let manager = OcrInstanceManager::new();
        assert_eq!(manager.instance_count(), 0);
        assert!(!manager.remove_instance(&LanguageHints::default(), ModelType::Fast));
    }
}
