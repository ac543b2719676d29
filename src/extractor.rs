//! Document → flattened text.
//!
//! Images go straight through normalization and OCR. PDFs use the page-1
//! text layer and only fall back to OCR of the page-1 scan when that layer is
//! blank or unreadable. Every failure here degrades to empty text.

use crate::document::{Document, DocumentKind};
use crate::engine::OcrEngine;
use crate::pdf;
use crate::preprocessing::Normalizer;
use image::DynamicImage;
use std::sync::Arc;
use std::time::Instant;

/// Collapse every whitespace run (newlines included) to one space and trim
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub struct TextExtractor {
    engine: Arc<dyn OcrEngine>,
    normalizer: Normalizer,
}

impl TextExtractor {
    pub fn new(engine: Arc<dyn OcrEngine>, normalizer: Normalizer) -> Self {
        Self { engine, normalizer }
    }

    pub fn engine(&self) -> &dyn OcrEngine {
        self.engine.as_ref()
    }

    /// Normalized text of the document, possibly empty
    pub fn extract(&self, document: &Document) -> String {
        let start = Instant::now();

        let raw = match document.kind() {
            DocumentKind::Image => self.image_text(document.bytes()),
            DocumentKind::Pdf => self.pdf_text(document.bytes()),
        };
        let text = normalize_whitespace(&raw);

        tracing::debug!(
            "Extracted {} chars from {} {:?} in {}ms",
            text.len(),
            document.kind().as_str(),
            document.filename(),
            start.elapsed().as_millis()
        );

        text
    }

    fn image_text(&self, bytes: &[u8]) -> String {
        match image::load_from_memory(bytes) {
            Ok(img) => self.ocr(img),
            Err(e) => {
                tracing::warn!("Failed to decode image: {}", e);
                String::new()
            }
        }
    }

    fn pdf_text(&self, bytes: &[u8]) -> String {
        match pdf::first_page_text(bytes) {
            Ok(text) if !text.trim().is_empty() => {
                tracing::debug!("Using PDF text layer ({} chars)", text.trim().len());
                return text;
            }
            Ok(_) => tracing::info!("PDF page 1 has no text layer, falling back to OCR"),
            Err(e) => tracing::warn!("PDF text extraction failed, falling back to OCR: {}", e),
        }

        match pdf::first_page_image(bytes) {
            Ok(img) => self.ocr(img),
            Err(e) => {
                tracing::warn!("No OCR input on PDF page 1: {}", e);
                String::new()
            }
        }
    }

    fn ocr(&self, image: DynamicImage) -> String {
        let normalized = self.normalizer.apply(image);

        match self.engine.recognize(&normalized) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("{} engine failed: {}", self.engine.name(), e);
                String::new()
            }
        }
    }
}
