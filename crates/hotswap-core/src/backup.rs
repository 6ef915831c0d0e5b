use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use hotswap_platform::paths::BACKUP_PREFIX;
use log::{debug, error, info, warn};
use tempfile::TempDir;

use crate::report::{BatchReport, FileFailure, FileOp, FileStatus};
use crate::transfer::{FileOps, entry_exists};

/// Pre-mutation copies of installation entries, laid out under the backup
/// area with the same relative paths as in the installation.
///
/// The backup area is created on first use inside the installation directory
/// and is removed when the manager is cleaned up or dropped.
pub struct BackupManager<'a> {
    target: &'a Path,
    ops: FileOps<'a>,
    area: Option<TempDir>,
    backed_up: BTreeSet<PathBuf>,
    created: Vec<PathBuf>,
}

impl<'a> BackupManager<'a> {
    #[must_use]
    pub fn new(target: &'a Path, ops: FileOps<'a>) -> Self {
        Self {
            target,
            ops,
            area: None,
            backed_up: BTreeSet::new(),
            created: Vec::new(),
        }
    }

    #[must_use]
    pub fn area(&self) -> Option<&Path> {
        self.area.as_ref().map(TempDir::path)
    }

    #[must_use]
    pub fn backed_up(&self) -> &BTreeSet<PathBuf> {
        &self.backed_up
    }

    #[must_use]
    pub fn created(&self) -> &[PathBuf] {
        &self.created
    }

    fn ensure_area(&mut self) -> std::io::Result<PathBuf> {
        if let Some(area) = &self.area {
            return Ok(area.path().to_path_buf());
        }
        let area = tempfile::Builder::new()
            .prefix(BACKUP_PREFIX)
            .tempdir_in(self.target)?;
        debug!("Created backup area {}", area.path().display());
        let path = area.path().to_path_buf();
        self.area = Some(area);
        Ok(path)
    }

    /// Copy every listed path that currently exists in the installation into
    /// the backup area. A failure for one path is logged and recorded; the
    /// remaining paths are still backed up.
    pub async fn backup<I, P>(&mut self, paths: I) -> BatchReport
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut report = BatchReport::default();
        for relative in paths {
            let relative = relative.as_ref();
            let source = self.target.join(relative);
            if !entry_exists(&source) || self.backed_up.contains(relative) {
                continue;
            }

            let area = match self.ensure_area() {
                Ok(area) => area,
                Err(err) => {
                    error!("Failed to create backup area: {err}");
                    report.record_result(relative, FileOp::Backup, Err(err.into()));
                    continue;
                }
            };

            match self.ops.copy(&source, &area.join(relative)).await {
                Ok(()) => {
                    debug!("Backed up {}", relative.display());
                    self.backed_up.insert(relative.to_path_buf());
                    report.record(relative, FileOp::Backup, FileStatus::Done);
                }
                Err(err) => {
                    error!("Failed to back up {}: {err}", relative.display());
                    report.record_result(relative, FileOp::Backup, Err(err.into()));
                }
            }
        }

        if !report.outcomes().is_empty() {
            info!("Backup finished: {}", report.summary());
        }
        report
    }

    /// Remember a path that did not exist before the update so a restore can
    /// remove it again. Such paths never get an entry in the backup area.
    pub fn record_created(&mut self, relative: &Path) {
        if !self.created.iter().any(|path| path == relative) {
            self.created.push(relative.to_path_buf());
        }
    }

    /// Put every backed-up entry back in place, then remove entries the
    /// update introduced. Each entry is replaced whole, so a directory that
    /// became a file (or the reverse) is restored too. Best-effort: each
    /// failure is logged and recorded, never raised.
    pub async fn restore(&mut self) -> BatchReport {
        info!("Restoring installation from backup");
        let mut report = BatchReport::default();

        match self.area().map(Path::to_path_buf) {
            Some(area) => {
                for relative in self.restore_roots() {
                    let result = self
                        .ops
                        .replace(&area.join(relative), &self.target.join(relative))
                        .await;
                    if let Err(err) = &result {
                        error!("Failed to restore {}: {err}", relative.display());
                    } else {
                        debug!("Restored {}", relative.display());
                    }
                    report.record_result(
                        relative,
                        FileOp::Restore,
                        result.map_err(FileFailure::from),
                    );
                }
            }
            None => warn!("No backup area exists, nothing to copy back"),
        }

        for relative in self.created.iter().rev() {
            let path = self.target.join(relative);
            if !entry_exists(&path) {
                continue;
            }
            let result = self.ops.remove(&path).await;
            if let Err(err) = &result {
                error!("Failed to remove added {}: {err}", relative.display());
            } else {
                debug!("Removed added {}", relative.display());
            }
            report.record_result(relative, FileOp::Remove, result.map_err(FileFailure::from));
        }

        info!("Restore finished: {}", report.summary());
        report
    }

    /// Backed-up entries not nested under another backed-up entry.
    fn restore_roots(&self) -> Vec<&Path> {
        self.backed_up
            .iter()
            .filter(|relative| {
                !relative
                    .ancestors()
                    .skip(1)
                    .any(|ancestor| self.backed_up.contains(ancestor))
            })
            .map(PathBuf::as_path)
            .collect()
    }

    /// Detach the backup area from the manager so it survives the run, and
    /// return its path.
    pub fn keep(&mut self) -> Option<PathBuf> {
        self.area.take().map(TempDir::keep)
    }

    /// Delete the backup area.
    ///
    /// # Errors
    /// Returns the removal error; the directory may then be left behind.
    pub fn cleanup(&mut self) -> std::io::Result<()> {
        match self.area.take() {
            Some(area) => {
                debug!("Removing backup area {}", area.path().display());
                area.close()
            }
            None => Ok(()),
        }
    }
}
