//! Image normalization ahead of OCR.
//!
//! Report headers recognize noticeably better after a plain grayscale
//! conversion and a fixed contrast boost. No resizing, denoising or
//! deskewing is applied.

pub mod steps;

use image::DynamicImage;
use std::time::Instant;

/// Contrast multiplier applied when none is configured
pub const DEFAULT_CONTRAST_FACTOR: f32 = 2.0;

/// Grayscale + contrast normalizer. Deterministic for identical pixels.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    contrast: f32,
}

impl Normalizer {
    pub fn new(contrast: f32) -> Self {
        Self { contrast }
    }

    pub fn contrast(&self) -> f32 {
        self.contrast
    }

    /// Produce a single-channel, contrast-enhanced copy of `image`
    pub fn apply(&self, image: DynamicImage) -> DynamicImage {
        let start = Instant::now();
        let (width, height) = (image.width(), image.height());

        let gray = steps::grayscale::apply(image);
        let enhanced = steps::contrast::apply(gray, self.contrast);

        tracing::debug!(
            "Normalized {}x{} image (contrast x{}) in {}ms",
            width,
            height,
            self.contrast,
            start.elapsed().as_millis()
        );

        enhanced
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(DEFAULT_CONTRAST_FACTOR)
    }
}
