//! Upload → text → name → folder.

use crate::config::Config;
use crate::document::{Document, DocumentKind};
use crate::engine::OcrEngine;
use crate::error::ReportError;
use crate::extractor::TextExtractor;
use crate::filing::{destination_root, FilingResult, FilingService};
use crate::preprocessing::Normalizer;
use crate::resolver::NameResolver;
use std::sync::Arc;
use std::time::Instant;

/// Runs one report submission start to finish on the calling thread
pub struct ReportProcessor {
    extractor: TextExtractor,
    resolver: NameResolver,
    filing: FilingService,
}

impl ReportProcessor {
    pub fn new(engine: Arc<dyn OcrEngine>, config: &Config) -> Self {
        Self {
            extractor: TextExtractor::new(engine, Normalizer::new(config.contrast)),
            resolver: NameResolver::new(config.resolver_options()),
            filing: FilingService::new(config.on_conflict),
        }
    }

    pub fn engine_name(&self) -> &'static str {
        self.extractor.engine().name()
    }

    /// Process an upload as received from a shell.
    ///
    /// The destination is validated before anything else, then the declared
    /// media type.
    pub fn process(
        &self,
        bytes: Vec<u8>,
        media_type: &str,
        filename: &str,
        destination: &str,
    ) -> Result<FilingResult, ReportError> {
        if destination_root(destination).is_none() {
            return Ok(FilingResult::InvalidDestination);
        }

        let Some(kind) = DocumentKind::from_media_type(media_type) else {
            tracing::info!("Rejected {:?} with media type {:?}", filename, media_type);
            return Ok(FilingResult::UnsupportedType);
        };

        self.process_document(&Document::new(bytes, kind, filename), destination)
    }

    pub fn process_document(
        &self,
        document: &Document,
        destination: &str,
    ) -> Result<FilingResult, ReportError> {
        let start = Instant::now();

        if destination_root(destination).is_none() {
            return Ok(FilingResult::InvalidDestination);
        }

        let text = self.extractor.extract(document);
        let name = self.resolver.resolve(&text);

        if name.is_none() {
            tracing::info!(
                "No patient name found in {:?} ({} chars of text)",
                document.filename(),
                text.len()
            );
        }

        let result = self.filing.file(
            destination,
            name.as_ref(),
            document.bytes(),
            document.filename(),
        )?;

        tracing::info!(
            "Processed {:?} in {}ms: {}",
            document.filename(),
            start.elapsed().as_millis(),
            result.outcome()
        );

        Ok(result)
    }
}
