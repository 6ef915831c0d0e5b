use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::lock::LockError;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("{context} {}: {source}", .path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{context}: {source}")]
    Zip {
        context: &'static str,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("package checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },
}

impl ExtractionError {
    pub(crate) fn io(context: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            context,
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn zip(context: &'static str, source: zip::result::ZipError) -> Self {
        Self::Zip { context, source }
    }
}

/// Errors that end a run. Everything except `Apply` is raised before the
/// installation is touched.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractionError),
    #[error("manifest {} is missing from the package", .path.display())]
    ManifestMissing { path: PathBuf },
    #[error("manifest {} is invalid: {details}", .path.display())]
    ManifestInvalid { path: PathBuf, details: String },
    #[error("failed to create staging area: {0}")]
    Staging(#[source] std::io::Error),
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error("{failed} file operation(s) failed, installation restored from backup")]
    Apply { failed: usize },
}

impl EngineError {
    /// Whether the run failed before any file of the installation changed.
    #[must_use]
    pub fn is_pre_mutation(&self) -> bool {
        !matches!(self, Self::Apply { .. })
    }
}
