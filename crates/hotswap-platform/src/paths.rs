use std::path::{Path, PathBuf};
use thiserror::Error;

pub const STAGING_PREFIX: &str = "update_temp";
pub const BACKUP_PREFIX: &str = "update_backup";
const LOCK_FILE_NAME: &str = ".updater.lock";

#[derive(Debug, Error)]
pub enum PathsError {
    #[error("could not determine current directory: {0}")]
    CurrentDirUnavailable(#[source] std::io::Error),
    #[error("target directory {path} is not accessible: {source}")]
    TargetUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("target {0} is not a directory")]
    NotADirectory(PathBuf),
}

/// Locations derived from the root of the installation being updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPaths {
    pub target_dir: PathBuf,
}

impl InstallPaths {
    /// Resolve the installation root, defaulting to the current directory.
    ///
    /// # Errors
    /// Returns an error when the current directory cannot be read, or when
    /// the resolved target does not exist or is not a directory.
    pub fn new(target_dir: Option<&Path>) -> Result<Self, PathsError> {
        let raw = match target_dir {
            Some(dir) => dir.to_path_buf(),
            None => std::env::current_dir().map_err(PathsError::CurrentDirUnavailable)?,
        };
        let target_dir = raw
            .canonicalize()
            .map_err(|source| PathsError::TargetUnavailable {
                path: raw.clone(),
                source,
            })?;
        if !target_dir.is_dir() {
            return Err(PathsError::NotADirectory(target_dir));
        }
        Ok(Self { target_dir })
    }

    /// Absolute path of an installation-relative entry.
    #[must_use]
    pub fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.target_dir.join(relative)
    }

    /// Packages are looked up relative to the installation unless absolute.
    #[must_use]
    pub fn package_path(&self, package: &Path) -> PathBuf {
        self.resolve(package)
    }

    #[must_use]
    pub fn restart_program(&self, program: &str) -> PathBuf {
        self.resolve(program)
    }

    #[must_use]
    pub fn lock_file(&self) -> PathBuf {
        self.target_dir.join(LOCK_FILE_NAME)
    }
}
