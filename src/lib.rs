//! Files scanned medical lab reports into per-patient folders.
//!
//! A report (PNG, JPEG or PDF) is turned into flattened text, the patient
//! name is pulled from its header, and the original bytes are written to
//! `<destination>/<patient>/<filename>`. The same [`ReportProcessor`] backs
//! both the command line and the HTTP shell in [`server`].

pub mod config;
pub mod document;
pub mod engine;
pub mod engines;
pub mod error;
pub mod extractor;
pub mod filing;
pub mod pdf;
pub mod pipeline;
pub mod preprocessing;
pub mod resolver;
pub mod server;

pub use config::Config;
pub use document::{Document, DocumentKind};
pub use engine::OcrEngine;
pub use error::{OcrError, ReportError};
pub use filing::{ConflictPolicy, FilingResult};
pub use pipeline::ReportProcessor;
pub use resolver::{NameCase, NameResolver, PatientName};
