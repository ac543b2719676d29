use anyhow::Context;
use clap::{Parser, Subcommand};
use report_filer::config::Config;
use report_filer::filing::{destination_root, ConflictPolicy, FilingResult};
use report_filer::preprocessing::DEFAULT_CONTRAST_FACTOR;
use report_filer::resolver::NameCase;
use report_filer::{engines, server, Document, DocumentKind, ReportProcessor};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "report-filer")]
#[command(about = "Files scanned lab reports into per-patient folders")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// OCR engine to use (defaults to the first compiled engine)
    #[arg(long, global = true, env = "REPORT_FILER_ENGINE")]
    pub engine: Option<String>,

    /// Tesseract language code (e.g., "eng", "deu")
    #[arg(long, global = true, env = "REPORT_FILER_LANGUAGE", default_value = "eng")]
    pub language: String,

    /// Path to tessdata directory (downloaded to the cache dir if not set)
    #[arg(long, global = true, env = "TESSDATA_PREFIX")]
    pub tessdata_path: Option<String>,

    /// Contrast factor applied before OCR
    #[arg(long, global = true, env = "REPORT_FILER_CONTRAST", default_value_t = DEFAULT_CONTRAST_FACTOR)]
    pub contrast: f32,

    /// How patient folder names are rendered
    #[arg(long, global = true, env = "REPORT_FILER_NAME_CASE", value_enum, default_value_t = NameCase::Upper)]
    pub name_case: NameCase,

    /// Also accept a bare "Mr."/"Mrs." title as the name label
    #[arg(long, global = true, env = "REPORT_FILER_ALLOW_TITLE_LABEL")]
    pub allow_title_label: bool,

    /// What to do when the patient folder already has a file with that name
    #[arg(long, global = true, env = "REPORT_FILER_ON_CONFLICT", value_enum, default_value_t = ConflictPolicy::Overwrite)]
    pub on_conflict: ConflictPolicy,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// File a single report from disk
    File {
        /// Report to file (PNG, JPEG or PDF)
        path: PathBuf,

        /// Existing folder that holds the patient folders
        #[arg(long)]
        dest: String,
    },
    /// Run the HTTP upload server
    Serve {
        /// Host address to bind to
        #[arg(long, env = "REPORT_FILER_HOST", default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(long, env = "REPORT_FILER_PORT", default_value = "9393")]
        port: u16,

        /// Maximum upload size in bytes (default: 50MB)
        #[arg(long, env = "REPORT_FILER_MAX_FILE_SIZE", default_value = "52428800")]
        max_file_size: usize,
    },
}

impl From<&Cli> for Config {
    fn from(cli: &Cli) -> Self {
        let mut config = Config {
            engine: cli.engine.clone(),
            language: cli.language.clone(),
            tessdata_path: cli.tessdata_path.clone(),
            contrast: cli.contrast,
            name_case: cli.name_case,
            allow_title_label: cli.allow_title_label,
            on_conflict: cli.on_conflict,
            ..Config::default()
        };

        if let Command::Serve {
            host,
            port,
            max_file_size,
        } = &cli.command
        {
            config.host = host.clone();
            config.port = *port;
            config.max_file_size = *max_file_size;
        }

        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from(&cli);

    match cli.command {
        Command::File { path, dest } => {
            let result = tokio::task::spawn_blocking(move || file_report(&config, &path, &dest))
                .await
                .context("Filing task failed")??;

            println!("{}", result.message());

            Ok(if result.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Serve { .. } => {
            tracing::info!("Starting report-filer v{}", env!("CARGO_PKG_VERSION"));
            tracing::info!("Binding to {}:{}", config.host, config.port);

            server::run(config).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Cheap checks run before the engine is loaded, since that may download models
fn file_report(config: &Config, path: &Path, dest: &str) -> anyhow::Result<FilingResult> {
    if destination_root(dest).is_none() {
        return Ok(FilingResult::InvalidDestination);
    }

    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let Some(kind) = DocumentKind::from_path(path, &bytes) else {
        return Ok(FilingResult::UnsupportedType);
    };

    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();

    let engine = engines::create(config)?;
    let processor = ReportProcessor::new(engine, config);

    Ok(processor.process_document(&Document::new(bytes, kind, filename), dest)?)
}
