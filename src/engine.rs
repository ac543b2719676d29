use crate::error::OcrError;
use image::DynamicImage;

/// Trait that all OCR engines must implement.
///
/// Engines assume the page is a single uniform block of text, which suits
/// the dense header layout of lab reports.
pub trait OcrEngine: Send + Sync {
    /// Returns the engine identifier (e.g., "ocrs", "leptess")
    fn name(&self) -> &'static str;

    /// Returns a human-readable description of the engine
    fn description(&self) -> &'static str;

    /// Recognize text in an already normalized image.
    ///
    /// The returned text has its lines joined with single spaces and is
    /// trimmed at both ends.
    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError>;
}

/// Join recognized lines into one line of text.
pub fn flatten_lines<I, S>(lines: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .map(|line| line.as_ref().trim().to_string())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
