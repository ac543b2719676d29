use crate::filing::ConflictPolicy;
use crate::preprocessing::DEFAULT_CONTRAST_FACTOR;
use crate::resolver::{NameCase, ResolverOptions};

/// Runtime configuration shared by the CLI and the HTTP shell.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub max_file_size: usize,
    /// Engine to use; `None` picks the first compiled engine
    pub engine: Option<String>,
    /// Tesseract language code (e.g., "eng")
    pub language: String,
    pub tessdata_path: Option<String>,
    pub contrast: f32,
    pub name_case: NameCase,
    pub allow_title_label: bool,
    pub on_conflict: ConflictPolicy,
}

impl Config {
    pub fn resolver_options(&self) -> ResolverOptions {
        ResolverOptions {
            case: self.name_case,
            allow_title_label: self.allow_title_label,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9393,
            max_file_size: 50 * 1024 * 1024,
            engine: None,
            language: "eng".to_string(),
            tessdata_path: None,
            contrast: DEFAULT_CONTRAST_FACTOR,
            name_case: NameCase::default(),
            allow_title_label: false,
            on_conflict: ConflictPolicy::default(),
        }
    }
}
