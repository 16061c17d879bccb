//! Input validation for receipt images
//!
//! Checks run before any decoding: the payload must not be empty, must look like
//! a supported raster format and must respect the per-format size limit.

use image::ImageFormat;
use std::path::Path;
use tracing::{debug, info};

use crate::errors::{error_logging, AppError, AppResult};
use crate::ocr_config::OcrConfig;

/// Validate raw image bytes and return the detected format
pub fn validate_image_bytes(bytes: &[u8], config: &OcrConfig) -> AppResult<ImageFormat> {
    if bytes.is_empty() {
        return Err(AppError::Validation("image data is empty".to_string()));
    }
    if bytes.len() < config.min_format_bytes {
        return Err(AppError::Validation(format!(
            "image data too short for format detection ({} bytes)",
            bytes.len()
        )));
    }

    let size = bytes.len() as u64;
    if size > config.max_file_size {
        return Err(AppError::Validation(format!(
            "image too large: {} bytes (maximum allowed: {} bytes)",
            size, config.max_file_size
        )));
    }

    let header = &bytes[..bytes.len().min(config.buffer_size)];
    let format = image::guess_format(header).map_err(|_| {
        AppError::Validation("unrecognized image format".to_string())
    })?;

    let limit = config.format_limits.limit_for(format).ok_or_else(|| {
        AppError::Validation(format!("unsupported image format: {:?}", format))
    })?;
    if size > limit {
        return Err(AppError::Validation(format!(
            "image too large for {:?} format: {} bytes (maximum allowed: {} bytes)",
            format, size, limit
        )));
    }

    debug!(format = ?format, size_bytes = size, limit_bytes = limit, "Image bytes validated");
    Ok(format)
}

/// Read a receipt image from disk after path and size checks
pub fn read_image_file(path: &Path, config: &OcrConfig) -> AppResult<Vec<u8>> {
    let display = path.display().to_string();

    if !path.exists() {
        return Err(AppError::FileSystem(format!(
            "file does not exist ({})",
            display
        )));
    }
    if !path.is_file() {
        return Err(AppError::FileSystem(format!(
            "path is not a file ({})",
            display
        )));
    }

    let file_size = path.metadata()?.len();
    if file_size == 0 {
        return Err(AppError::Validation(format!("file is empty ({})", display)));
    }
    if file_size > config.max_file_size {
        return Err(AppError::Validation(format!(
            "file too large ({} bytes, maximum allowed: {} bytes)",
            file_size, config.max_file_size
        )));
    }

    let bytes = std::fs::read(path).map_err(|e| {
        error_logging::log_filesystem_error(&e, "read_image_file", Some(&display), Some(file_size));
        AppError::from(e)
    })?;
    info!(path = %path.display(), size_bytes = file_size, "Receipt image loaded");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::io::{Cursor, Write};

    fn png_bytes() -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        RgbaImage::from_pixel(8, 8, Rgba([255, 255, 255, 255]))
            .write_to(&mut buffer, ImageFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_valid_png() {
        let format = validate_image_bytes(&png_bytes(), &OcrConfig::default()).unwrap();
        assert_eq!(format, ImageFormat::Png);
    }

    #[test]
    fn test_empty_and_garbage_bytes() {
        let config = OcrConfig::default();
        assert!(matches!(
            validate_image_bytes(&[], &config),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            validate_image_bytes(b"definitely not an image", &config),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_format_limit_applies() {
        let mut config = OcrConfig::default();
        config.format_limits.png_max = 10;
        let err = validate_image_bytes(&png_bytes(), &config).unwrap_err();
        assert!(err.to_string().contains("Png"));
    }

    #[test]
    fn test_read_image_file() {
        let config = OcrConfig::default();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&png_bytes()).unwrap();

        let bytes = read_image_file(file.path(), &config).unwrap();
        assert_eq!(bytes, png_bytes());

        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_image_file(dir.path(), &config),
            Err(AppError::FileSystem(_))
        ));
        assert!(matches!(
            read_image_file(&dir.path().join("missing.png"), &config),
            Err(AppError::FileSystem(_))
        ));
    }

    #[test]
    fn test_empty_file_is_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(
            read_image_file(file.path(), &OcrConfig::default()),
            Err(AppError::Validation(_))
        ));
    }
}
