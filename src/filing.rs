//! Per-patient report storage.
//!
//! Reports land in `<root>/<patient folder>/<original filename>`. The root
//! must already exist; only patient folders are ever created. Folder identity
//! uses [`canonical_key`], so `Ravi Kumar`, `RAVI  KUMAR` and `Ravi Kumar.`
//! share one folder, named after whichever spelling created it first.

use crate::error::ReportError;
use crate::resolver::PatientName;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

const DEFAULT_FILENAME: &str = "report";

/// What to do when the patient folder already holds a file of the same name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ConflictPolicy {
    /// Replace the existing file (last write wins)
    #[default]
    Overwrite,
    /// Keep the existing file and report the conflict
    FailIfExists,
    /// Store alongside as `name (1).ext`, `name (2).ext`, ...
    VersionSuffix,
}

/// Outcome of one filing attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilingResult {
    /// Full path of the saved report
    Success(PathBuf),
    InvalidDestination,
    NameNotFound,
    UnsupportedType,
    /// Only produced under [`ConflictPolicy::FailIfExists`]
    AlreadyExists(PathBuf),
}

impl FilingResult {
    /// Human-readable status for the shell
    pub fn message(&self) -> String {
        match self {
            Self::Success(path) => format!(
                "Report successfully saved in folder: {}",
                path.parent().unwrap_or(path).display()
            ),
            Self::InvalidDestination => {
                "Invalid path! Please ensure the destination folder exists.".to_string()
            }
            Self::NameNotFound => {
                "Could not extract the patient's name. Please check the report format.".to_string()
            }
            Self::UnsupportedType => "Unsupported file type.".to_string(),
            Self::AlreadyExists(path) => {
                format!("A report with this name already exists: {}", path.display())
            }
        }
    }

    /// Stable machine-readable outcome code
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::InvalidDestination => "invalid_destination",
            Self::NameNotFound => "name_not_found",
            Self::UnsupportedType => "unsupported_type",
            Self::AlreadyExists(_) => "already_exists",
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Success(path) | Self::AlreadyExists(path) => Some(path),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Folder identity for a patient name: lowercase, punctuation removed,
/// whitespace collapsed.
pub fn canonical_key(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// The destination root, trimmed, if it is an existing directory
pub fn destination_root(destination: &str) -> Option<PathBuf> {
    let root = PathBuf::from(destination.trim());
    (!destination.trim().is_empty() && root.is_dir()).then_some(root)
}

/// Only the last path component of an uploaded filename is kept
fn sanitize_filename(filename: &str) -> String {
    Path::new(filename.trim())
        .file_name()
        .map(|name| name.to_string_lossy().trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FilingService {
    policy: ConflictPolicy,
}

impl FilingService {
    pub fn new(policy: ConflictPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    /// Store `bytes` under the patient's folder.
    ///
    /// Checks, in order, that `destination` is an existing directory and that
    /// a name was resolved; nothing is created when either check fails.
    pub fn file(
        &self,
        destination: &str,
        name: Option<&PatientName>,
        bytes: &[u8],
        filename: &str,
    ) -> Result<FilingResult, ReportError> {
        let Some(root) = destination_root(destination) else {
            tracing::info!("Destination {:?} is not an existing directory", destination);
            return Ok(FilingResult::InvalidDestination);
        };

        let Some(name) = name else {
            return Ok(FilingResult::NameNotFound);
        };

        let folder = self.patient_folder(&root, name)?;
        let filename = sanitize_filename(filename);

        let result = match self.policy {
            ConflictPolicy::Overwrite => {
                let path = folder.join(&filename);
                fs::write(&path, bytes).map_err(|e| ReportError::storage(&path, e))?;
                FilingResult::Success(path)
            }
            ConflictPolicy::FailIfExists => {
                let path = folder.join(&filename);
                match write_new(&path, bytes) {
                    Ok(()) => FilingResult::Success(path),
                    Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                        FilingResult::AlreadyExists(path)
                    }
                    Err(e) => return Err(ReportError::storage(&path, e)),
                }
            }
            ConflictPolicy::VersionSuffix => {
                FilingResult::Success(write_versioned(&folder, &filename, bytes)?)
            }
        };

        if let FilingResult::Success(path) = &result {
            tracing::info!("Filed report for {} at {:?}", name, path);
        } else {
            tracing::warn!("{}", result.message());
        }

        Ok(result)
    }

    /// Find the folder whose name has the same canonical key, or create one
    /// named after `name`.
    fn patient_folder(&self, root: &Path, name: &PatientName) -> Result<PathBuf, ReportError> {
        let key = canonical_key(name.as_str());

        let mut existing: Vec<PathBuf> = fs::read_dir(root)
            .map_err(|e| ReportError::storage(root, e))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .filter(|entry| canonical_key(&entry.file_name().to_string_lossy()) == key)
            .map(|entry| entry.path())
            .collect();
        existing.sort();

        if let Some(folder) = existing.into_iter().next() {
            tracing::debug!("Reusing patient folder {:?}", folder);
            return Ok(folder);
        }

        let folder = root.join(name.as_str());
        fs::create_dir_all(&folder).map_err(|e| ReportError::storage(&folder, e))?;
        tracing::debug!("Created patient folder {:?}", folder);
        Ok(folder)
    }
}

/// Create `path` exclusively; fails with `AlreadyExists` if it is present
fn write_new(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(bytes)
}

fn write_versioned(folder: &Path, filename: &str, bytes: &[u8]) -> Result<PathBuf, ReportError> {
    let original = Path::new(filename);
    let stem = original
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| filename.to_string());
    let extension = original
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut version = 0u32;
    loop {
        let candidate = if version == 0 {
            folder.join(filename)
        } else {
            folder.join(format!("{} ({}){}", stem, version, extension))
        };

        match write_new(&candidate, bytes) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => version += 1,
            Err(e) => return Err(ReportError::storage(&candidate, e)),
        }
    }
}
