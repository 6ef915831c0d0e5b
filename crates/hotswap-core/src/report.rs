use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOp {
    Backup,
    Add,
    Modify,
    Delete,
    Overwrite,
    Scan,
    Restore,
    Remove,
}

impl std::fmt::Display for FileOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Backup => "backup",
            Self::Add => "add",
            Self::Modify => "modify",
            Self::Delete => "delete",
            Self::Overwrite => "overwrite",
            Self::Scan => "scan",
            Self::Restore => "restore",
            Self::Remove => "remove",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FileFailure {
    #[error("staged source {} is missing", .0.display())]
    MissingSource(PathBuf),
    #[error("{kind}: {message}")]
    Io {
        kind: io::ErrorKind,
        message: String,
    },
}

impl From<io::Error> for FileFailure {
    fn from(error: io::Error) -> Self {
        Self::Io {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    Done,
    Skipped,
    Failed(FileFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub op: FileOp,
    pub status: FileStatus,
}

/// Per-file results of one batch (backup, apply or restore). A failed entry
/// never stops the batch; callers read the aggregate afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    pub fn record(&mut self, path: &Path, op: FileOp, status: FileStatus) {
        self.outcomes.push(FileOutcome {
            path: path.to_path_buf(),
            op,
            status,
        });
    }

    pub fn record_result(&mut self, path: &Path, op: FileOp, result: Result<(), FileFailure>) {
        let status = match result {
            Ok(()) => FileStatus::Done,
            Err(failure) => FileStatus::Failed(failure),
        };
        self.record(path, op, status);
    }

    #[must_use]
    pub fn outcomes(&self) -> &[FileOutcome] {
        &self.outcomes
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome.status, FileStatus::Failed(_)))
    }

    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    #[must_use]
    pub fn count(&self, status: &FileStatus) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| &outcome.status == status)
            .count()
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failure_count() == 0
    }

    #[must_use]
    pub fn status_of(&self, path: &Path, op: FileOp) -> Option<&FileStatus> {
        self.outcomes
            .iter()
            .find(|outcome| outcome.path == path && outcome.op == op)
            .map(|outcome| &outcome.status)
    }

    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} done, {} skipped, {} failed",
            self.count(&FileStatus::Done),
            self.count(&FileStatus::Skipped),
            self.failure_count()
        )
    }
}

/// Outcome of an applier: backup failures are reported but do not fail the
/// apply, only failures in the change batch do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub backup: BatchReport,
    pub changes: BatchReport,
}

impl ApplyReport {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.changes.is_success()
    }
}
