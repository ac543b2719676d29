//! Leptess/Tesseract engine implementation
//!
//! Tesseract-based OCR engine, run in page segmentation mode 6 (a single
//! uniform block of text). Uses tesseract-static for static linking and
//! downloads tessdata automatically on first use.

use super::cached_download;
use crate::config::Config;
use crate::engine::{flatten_lines, OcrEngine};
use crate::error::OcrError;
use image::DynamicImage;
use std::path::Path;
use tesseract_static::tesseract::Tesseract;

/// Tesseract's "assume a single uniform block of text" mode
const PAGE_SEG_MODE_SINGLE_BLOCK: &str = "6";

/// Tesseract OCR Engine
pub struct LeptessEngine {
    /// Path to tessdata directory
    tessdata_path: String,
    language: String,
}

impl LeptessEngine {
    /// Create a new Tesseract-based OCR engine
    pub fn new(config: &Config) -> Result<Self, OcrError> {
        let language = config.language.clone();

        let tessdata_path = match &config.tessdata_path {
            Some(path) => path.clone(),
            None => ensure_tessdata_available(&language)?,
        };

        // Fail at startup rather than on the first report
        Tesseract::new(Some(&tessdata_path), Some(&language)).map_err(|e| {
            OcrError::InitializationError(format!("Failed to initialize Tesseract: {}", e))
        })?;

        tracing::info!(
            "Leptess engine initialized (tessdata: {}, language: {})",
            tessdata_path,
            language
        );

        Ok(Self {
            tessdata_path,
            language,
        })
    }
}

impl OcrEngine for LeptessEngine {
    fn name(&self) -> &'static str {
        "leptess"
    }

    fn description(&self) -> &'static str {
        "Tesseract OCR engine - better for noisy/messy images like phone photos"
    }

    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError> {
        let rgb_img = image.to_rgb8();
        let (width, height) = rgb_img.dimensions();

        // BMP is always supported by leptonica
        let mut bmp_data = Vec::new();
        rgb_img
            .write_to(&mut std::io::Cursor::new(&mut bmp_data), image::ImageFormat::Bmp)
            .map_err(|e| OcrError::ProcessingError(format!("Failed to convert to BMP: {}", e)))?;

        tracing::debug!(
            "Processing image: {}x{}, BMP size: {} bytes",
            width,
            height,
            bmp_data.len()
        );

        let tess = Tesseract::new(Some(&self.tessdata_path), Some(&self.language))
            .map_err(|e| OcrError::ProcessingError(format!("Failed to create Tesseract: {}", e)))?
            .set_variable("tessedit_pageseg_mode", PAGE_SEG_MODE_SINGLE_BLOCK)
            .map_err(|e| {
                OcrError::ProcessingError(format!("Failed to set page segmentation: {}", e))
            })?;

        let tess = tess.set_image_from_mem(&bmp_data).map_err(|e| {
            OcrError::ProcessingError(format!(
                "Failed to set image ({}x{}, {} bytes): {}",
                width,
                height,
                bmp_data.len(),
                e
            ))
        })?;

        let mut tess = tess
            .recognize()
            .map_err(|e| OcrError::ProcessingError(format!("Failed to recognize text: {}", e)))?;

        let text = tess
            .get_text()
            .map_err(|e| OcrError::ProcessingError(format!("Failed to get text: {}", e)))?;

        Ok(flatten_lines(text.lines()))
    }
}

/// Directory holding `<language>.traineddata`, downloaded on first use
fn ensure_tessdata_available(language: &str) -> Result<String, OcrError> {
    let relative = Path::new("tessdata").join(format!("{}.traineddata", language));
    let traineddata = cached_download(&tessdata_url(language), &relative)?;

    // Tesseract expects the directory, not the file
    let dir = traineddata
        .parent()
        .ok_or_else(|| OcrError::InitializationError("Invalid tessdata path".to_string()))?;
    path_string(dir)
}

/// tessdata_fast keeps downloads small
fn tessdata_url(language: &str) -> String {
    format!(
        "https://github.com/tesseract-ocr/tessdata_fast/raw/main/{}.traineddata",
        language
    )
}

fn path_string(path: &Path) -> Result<String, OcrError> {
    path.to_str()
        .map(|s| s.to_string())
        .ok_or_else(|| OcrError::InitializationError("Invalid tessdata path".to_string()))
}
