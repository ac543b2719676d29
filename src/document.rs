//! Uploaded report documents.

use std::path::Path;

/// Media types accepted by the filing pipeline
pub const SUPPORTED_MEDIA_TYPES: &[&str] = &["image/png", "image/jpeg", "application/pdf"];

/// The two document shapes the extractor knows how to read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Image,
    Pdf,
}

impl DocumentKind {
    /// Map a declared media type to a kind. Parameters such as
    /// `; charset=binary` are ignored.
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        let essence = media_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "image/png" | "image/jpeg" | "image/jpg" => Some(Self::Image),
            "application/pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// Infer the kind of a local file from its extension, then its magic bytes
    pub fn from_path(path: &Path, head: &[u8]) -> Option<Self> {
        if let Some(ext) = path.extension() {
            match ext.to_string_lossy().to_lowercase().as_str() {
                "pdf" => return Some(Self::Pdf),
                "png" | "jpg" | "jpeg" => return Some(Self::Image),
                _ => {}
            }
        }

        Self::sniff(head)
    }

    /// Check the leading bytes for a PDF, PNG or JPEG signature
    pub fn sniff(head: &[u8]) -> Option<Self> {
        if head.starts_with(b"%PDF-") {
            Some(Self::Pdf)
        } else if head.starts_with(b"\x89PNG\r\n\x1a\n") || head.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Image)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Pdf => "pdf",
        }
    }
}

/// A report handed over by the shell. Owned by a single pipeline run.
#[derive(Debug, Clone)]
pub struct Document {
    bytes: Vec<u8>,
    kind: DocumentKind,
    filename: String,
}

impl Document {
    pub fn new(bytes: Vec<u8>, kind: DocumentKind, filename: impl Into<String>) -> Self {
        Self {
            bytes,
            kind,
            filename: filename.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_types() {
        assert_eq!(DocumentKind::from_media_type("image/png"), Some(DocumentKind::Image));
        assert_eq!(DocumentKind::from_media_type("image/jpeg"), Some(DocumentKind::Image));
        assert_eq!(DocumentKind::from_media_type("IMAGE/JPG"), Some(DocumentKind::Image));
        assert_eq!(
            DocumentKind::from_media_type("application/pdf; charset=binary"),
            Some(DocumentKind::Pdf)
        );
    }

    #[test]
    fn test_unsupported_media_types() {
        assert_eq!(DocumentKind::from_media_type("image/gif"), None);
        assert_eq!(DocumentKind::from_media_type("text/plain"), None);
        assert_eq!(DocumentKind::from_media_type(""), None);
    }

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(
            DocumentKind::from_path(Path::new("scan.PDF"), b""),
            Some(DocumentKind::Pdf)
        );
        assert_eq!(
            DocumentKind::from_path(Path::new("cbc.jpeg"), b""),
            Some(DocumentKind::Image)
        );
    }

    #[test]
    fn test_kind_from_magic_bytes() {
        assert_eq!(
            DocumentKind::from_path(Path::new("upload"), b"%PDF-1.4\n"),
            Some(DocumentKind::Pdf)
        );
        assert_eq!(
            DocumentKind::from_path(Path::new("upload.bin"), b"\x89PNG\r\n\x1a\n...."),
            Some(DocumentKind::Image)
        );
        assert_eq!(
            DocumentKind::from_path(Path::new("upload"), &[0xFF, 0xD8, 0xFF, 0xE0]),
            Some(DocumentKind::Image)
        );
        assert_eq!(DocumentKind::from_path(Path::new("notes.txt"), b"hello"), None);
    }
}
