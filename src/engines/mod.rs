//! OCR engine implementations
//!
//! This module contains implementations of the OcrEngine trait for different
//! OCR backends. Engines are conditionally compiled based on feature flags.

#[cfg(feature = "engine-ocrs")]
pub mod ocrs;

#[cfg(feature = "engine-leptess")]
pub mod leptess;

use crate::config::Config;
use crate::engine::OcrEngine;
use crate::error::OcrError;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Names of the engines compiled into this build, in preference order
pub fn available() -> Vec<&'static str> {
    let mut names = Vec::new();

    #[cfg(feature = "engine-ocrs")]
    names.push("ocrs");

    #[cfg(feature = "engine-leptess")]
    names.push("leptess");

    names
}

/// Initialize the configured engine, or the first compiled one when none is named
#[cfg_attr(
    not(any(feature = "engine-ocrs", feature = "engine-leptess")),
    allow(unused_variables)
)]
pub fn create(config: &Config) -> Result<Arc<dyn OcrEngine>, OcrError> {
    let names = available();
    let name = match config.engine.as_deref() {
        Some(name) => name,
        None => names.first().copied().ok_or_else(|| {
            OcrError::InitializationError(
                "No OCR engines available. Build with --features engine-ocrs or --features engine-leptess".to_string(),
            )
        })?,
    };

    tracing::info!("Initializing {} engine...", name);

    match name {
        #[cfg(feature = "engine-ocrs")]
        "ocrs" => Ok(Arc::new(ocrs::OcrsEngine::new(config)?)),

        #[cfg(feature = "engine-leptess")]
        "leptess" => Ok(Arc::new(leptess::LeptessEngine::new(config)?)),

        other => Err(OcrError::InitializationError(format!(
            "Unknown OCR engine '{}' (available: {})",
            other,
            names.join(", ")
        ))),
    }
}

/// Cache directory for downloaded models and training data
#[cfg_attr(
    not(any(feature = "engine-ocrs", feature = "engine-leptess")),
    allow(dead_code)
)]
fn cache_dir() -> Result<PathBuf, OcrError> {
    let dir = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("report-filer");

    std::fs::create_dir_all(&dir).map_err(|e| {
        OcrError::InitializationError(format!("Failed to create cache directory: {}", e))
    })?;

    Ok(dir)
}

/// Download a file from URL to path using ureq
#[cfg_attr(
    not(any(feature = "engine-ocrs", feature = "engine-leptess")),
    allow(dead_code)
)]
fn download_file(url: &str, path: &Path) -> Result<(), OcrError> {
    let response = ureq::get(url)
        .call()
        .map_err(|e| OcrError::InitializationError(format!("Failed to download {}: {}", url, e)))?;

    let buffer = response.into_body().read_to_vec().map_err(|e| {
        OcrError::InitializationError(format!("Failed to read response body: {}", e))
    })?;

    // Write under a temporary name so an interrupted download is never cached
    let partial = path.with_extension("part");
    let mut file = File::create(&partial).map_err(|e| {
        OcrError::InitializationError(format!("Failed to create {:?}: {}", partial, e))
    })?;
    file.write_all(&buffer)
        .map_err(|e| OcrError::InitializationError(format!("Failed to write {:?}: {}", partial, e)))?;

    std::fs::rename(&partial, path).map_err(|e| {
        OcrError::InitializationError(format!("Failed to move {:?} into place: {}", partial, e))
    })?;

    Ok(())
}

/// Path of `relative` inside the cache dir, downloading it from `url` first
/// when it is not cached yet
#[cfg_attr(
    not(any(feature = "engine-ocrs", feature = "engine-leptess")),
    allow(dead_code)
)]
pub(crate) fn cached_download(url: &str, relative: &Path) -> Result<PathBuf, OcrError> {
    let path = cache_dir()?.join(relative);

    if path.exists() {
        tracing::debug!("Using cached {:?}", path);
        return Ok(path);
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            OcrError::InitializationError(format!("Failed to create {:?}: {}", parent, e))
        })?;
    }

    tracing::info!("Downloading {} (this may take a moment)...", url);
    download_file(url, &path)?;
    tracing::info!("Downloaded to {:?}", path);

    Ok(path)
}
