use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use log::{debug, warn};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("another update is already running on this installation ({})", .path.display())]
    AlreadyRunning { path: PathBuf },
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl LockError {
    fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }
}

/// Exclusive claim on an installation for the duration of one run. The lock
/// file is removed when the guard drops.
#[derive(Debug)]
pub struct RunLock {
    file: Option<File>,
    path: PathBuf,
}

impl RunLock {
    /// # Errors
    /// Returns `AlreadyRunning` when another process holds the lock, or an
    /// I/O error when the lock file cannot be created or written.
    pub fn acquire(path: &Path) -> Result<Self, LockError> {
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)
            .map_err(|error| LockError::io("failed to open update lock file", error))?;

        match file.try_lock_exclusive() {
            Ok(()) => {}
            Err(error)
                if error.kind() == std::io::ErrorKind::WouldBlock
                    || error.raw_os_error() == fs2::lock_contended_error().raw_os_error() =>
            {
                return Err(LockError::AlreadyRunning {
                    path: path.to_path_buf(),
                });
            }
            Err(error) => return Err(LockError::io("failed to acquire update lock", error)),
        }

        file.set_len(0)
            .and_then(|()| file.seek(SeekFrom::Start(0)).map(|_| ()))
            .and_then(|()| writeln!(file, "{}", std::process::id()))
            .map_err(|error| LockError::io("failed to write update lock metadata", error))?;

        debug!("Acquired update lock {}", path.display());
        Ok(Self {
            file: Some(file),
            path: path.to_path_buf(),
        })
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = FileExt::unlock(&file);
        }
        if let Err(error) = std::fs::remove_file(&self.path) {
            warn!("Failed to remove update lock {}: {error}", self.path.display());
        }
    }
}
