use std::path::Path;

use log::{error, info};

use super::{ApplyContext, install_staged};
use crate::backup::BackupManager;
use crate::report::{ApplyReport, FileOp, FileStatus};
use crate::transfer::{entry_exists, walk_files};

/// Overwrite the installation with every staged file except protected names.
///
/// Runs in two passes: the first collects every existing target and backs
/// them all up, the second replaces files. Nothing is overwritten before the
/// whole backup set has been captured.
pub async fn apply_full(ctx: &ApplyContext<'_>, backup: &mut BackupManager<'_>) -> ApplyReport {
    info!("Applying full update");
    let mut report = ApplyReport::default();

    let files = match walk_files(ctx.staging) {
        Ok(files) => files,
        Err(err) => {
            error!("Failed to read staging area {}: {err}", ctx.staging.display());
            report
                .changes
                .record_result(Path::new(""), FileOp::Scan, Err(err.into()));
            return report;
        }
    };

    let mut candidates = Vec::with_capacity(files.len());
    let mut existing = Vec::new();
    for relative in files {
        if ctx.skip.matches(&relative) {
            info!("Skipping protected file {}", relative.display());
            report
                .changes
                .record(&relative, FileOp::Overwrite, FileStatus::Skipped);
            continue;
        }
        if entry_exists(&ctx.target.join(&relative)) {
            existing.push(relative.clone());
        }
        candidates.push(relative);
    }

    report.backup = backup.backup(&existing).await;

    for relative in &candidates {
        let status = install_staged(ctx, backup, relative, FileOp::Overwrite).await;
        report.changes.record(relative, FileOp::Overwrite, status);
    }

    info!("Full update finished: {}", report.changes.summary());
    report
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::apply_full;
    use crate::apply::ApplyContext;
    use crate::backup::BackupManager;
    use crate::report::{FileOp, FileStatus};
    use crate::retry::RetryPolicy;
    use crate::skip::SkipList;
    use crate::transfer::{FileOps, LocalTransfer};

    #[tokio::test]
    async fn overwrites_existing_adds_new_and_leaves_others() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let target = temp.path().join("app");
        let staging = temp.path().join("staging");
        std::fs::create_dir_all(target.join("lib")).expect("target should be created");
        std::fs::create_dir_all(staging.join("lib")).expect("staging should be created");
        std::fs::write(target.join("app.bin"), b"app-v1").expect("write");
        std::fs::write(target.join("extra.txt"), b"mine").expect("write");
        std::fs::write(staging.join("app.bin"), b"app-v2").expect("write");
        std::fs::write(staging.join("lib/new.so"), b"new").expect("write");

        let retry = RetryPolicy::once();
        let ops = FileOps::new(&LocalTransfer, &retry);
        let skip = SkipList::default();
        let ctx = ApplyContext {
            target: &target,
            staging: &staging,
            ops,
            skip: &skip,
        };
        let mut backup = BackupManager::new(&target, ops);

        let report = apply_full(&ctx, &mut backup).await;

        assert!(report.is_success());
        assert_eq!(std::fs::read(target.join("app.bin")).expect("app.bin"), b"app-v2");
        assert_eq!(std::fs::read(target.join("lib/new.so")).expect("new.so"), b"new");
        assert_eq!(std::fs::read(target.join("extra.txt")).expect("extra.txt"), b"mine");

        let backed_up: Vec<_> = backup.backed_up().iter().cloned().collect();
        assert_eq!(backed_up, vec![PathBuf::from("app.bin")]);
        assert_eq!(backup.created(), [PathBuf::from("lib").join("new.so")].as_slice());
    }

    #[tokio::test]
    async fn protected_files_are_never_touched_or_backed_up() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let target = temp.path().join("app");
        let staging = temp.path().join("staging");
        std::fs::create_dir_all(&target).expect("target should be created");
        std::fs::create_dir_all(staging.join("bin")).expect("staging should be created");
        std::fs::write(target.join("Updater.exe"), b"running").expect("write");
        std::fs::write(staging.join("Updater.exe"), b"replacement").expect("write");
        std::fs::write(staging.join("bin/update"), b"replacement").expect("write");

        let retry = RetryPolicy::once();
        let ops = FileOps::new(&LocalTransfer, &retry);
        let skip = SkipList::new(["updater.exe", "update"]);
        let ctx = ApplyContext {
            target: &target,
            staging: &staging,
            ops,
            skip: &skip,
        };
        let mut backup = BackupManager::new(&target, ops);

        let report = apply_full(&ctx, &mut backup).await;

        assert!(report.is_success());
        assert_eq!(report.changes.count(&FileStatus::Skipped), 2);
        assert_eq!(
            report.changes.status_of(Path::new("Updater.exe"), FileOp::Overwrite),
            Some(&FileStatus::Skipped)
        );
        assert_eq!(std::fs::read(target.join("Updater.exe")).expect("updater"), b"running");
        assert!(!target.join("bin/update").exists());
        assert!(backup.area().is_none());
    }
}
