use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::retry::RetryPolicy;

/// Primitive file mutations used by the backup manager and the appliers.
pub trait FileTransfer: Send + Sync {
    /// Copy a file or directory tree to `dest`, creating parent directories.
    fn copy(&self, source: &Path, dest: &Path) -> io::Result<()>;

    /// Remove a file or directory tree. Removing a missing entry succeeds.
    fn remove(&self, path: &Path) -> io::Result<()>;
}

pub struct LocalTransfer;

impl FileTransfer for LocalTransfer {
    fn copy(&self, source: &Path, dest: &Path) -> io::Result<()> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        if source.is_dir() {
            copy_dir_recursive(source, dest)
        } else {
            fs::copy(source, dest).map(|_| ())
        }
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        let metadata = match fs::symlink_metadata(path) {
            Ok(metadata) => metadata,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(error) => return Err(error),
        };
        if metadata.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        }
    }
}

fn copy_dir_recursive(source: &Path, dest: &Path) -> io::Result<()> {
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let source_path = entry.path();
        let dest_path = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&source_path, &dest_path)?;
        } else {
            fs::copy(&source_path, &dest_path)?;
        }
    }
    Ok(())
}

/// Whether anything, including a dangling symlink, occupies `path`.
#[must_use]
pub fn entry_exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Every non-directory entry under `root`, as sorted paths relative to it.
///
/// # Errors
/// Returns the first directory read error.
pub fn walk_files(root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    walk_into(root, Path::new(""), &mut files)?;
    files.sort();
    Ok(files)
}

fn walk_into(root: &Path, relative: &Path, files: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(root.join(relative))? {
        let entry = entry?;
        let child = relative.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            walk_into(root, &child, files)?;
        } else {
            files.push(child);
        }
    }
    Ok(())
}

/// A [`FileTransfer`] paired with the retry policy every call goes through.
#[derive(Clone, Copy)]
pub struct FileOps<'a> {
    transfer: &'a dyn FileTransfer,
    retry: &'a RetryPolicy,
}

impl<'a> FileOps<'a> {
    #[must_use]
    pub fn new(transfer: &'a dyn FileTransfer, retry: &'a RetryPolicy) -> Self {
        Self { transfer, retry }
    }

    /// # Errors
    /// Returns the transfer error once retries are exhausted.
    pub async fn copy(&self, source: &Path, dest: &Path) -> io::Result<()> {
        let what = format!("copy {} -> {}", source.display(), dest.display());
        self.retry
            .run(&what, || self.transfer.copy(source, dest))
            .await
    }

    /// # Errors
    /// Returns the transfer error once retries are exhausted.
    pub async fn remove(&self, path: &Path) -> io::Result<()> {
        let what = format!("remove {}", path.display());
        self.retry.run(&what, || self.transfer.remove(path)).await
    }

    /// Remove whatever occupies `dest`, then copy `source` into place.
    ///
    /// # Errors
    /// Returns the first remove or copy error.
    pub async fn replace(&self, source: &Path, dest: &Path) -> io::Result<()> {
        if entry_exists(dest) {
            self.remove(dest).await?;
        }
        self.copy(source, dest).await
    }
}
