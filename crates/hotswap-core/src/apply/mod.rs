mod full;
mod incremental;

use std::path::Path;

use log::{error, info};

use crate::backup::BackupManager;
use crate::report::{FileFailure, FileOp, FileStatus};
use crate::skip::SkipList;
use crate::transfer::{FileOps, entry_exists};

pub use full::apply_full;
pub use incremental::apply_incremental;

/// What an applier works on: the live installation, the unpacked package and
/// the file operations to move data between them.
#[derive(Clone, Copy)]
pub struct ApplyContext<'a> {
    pub target: &'a Path,
    pub staging: &'a Path,
    pub ops: FileOps<'a>,
    pub skip: &'a SkipList,
}

/// Put the staged copy of `relative` in place, replacing whatever is there.
/// Paths that did not exist before are recorded so a restore can remove them.
async fn install_staged(
    ctx: &ApplyContext<'_>,
    backup: &mut BackupManager<'_>,
    relative: &Path,
    op: FileOp,
) -> FileStatus {
    let source = ctx.staging.join(relative);
    if !entry_exists(&source) {
        error!("Staged source for {} is missing", relative.display());
        return FileStatus::Failed(FileFailure::MissingSource(relative.to_path_buf()));
    }

    let target = ctx.target.join(relative);
    if !entry_exists(&target) {
        backup.record_created(relative);
    }

    match ctx.ops.replace(&source, &target).await {
        Ok(()) => {
            info!("{op}: {}", relative.display());
            FileStatus::Done
        }
        Err(err) => {
            error!("Failed to {op} {}: {err}", relative.display());
            FileStatus::Failed(err.into())
        }
    }
}
