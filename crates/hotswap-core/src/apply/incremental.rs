use log::{debug, error, info, warn};

use super::{ApplyContext, install_staged};
use crate::backup::BackupManager;
use crate::manifest::ChangeSet;
use crate::report::{ApplyReport, FileOp, FileStatus};
use crate::transfer::entry_exists;

/// Apply a change set: back up, then add, then modify, then delete, each
/// phase running over every entry before the next starts. Per-file failures
/// are recorded and processing continues.
pub async fn apply_incremental(
    ctx: &ApplyContext<'_>,
    changes: &ChangeSet,
    backup: &mut BackupManager<'_>,
) -> ApplyReport {
    info!(
        "Applying incremental update: {} added, {} modified, {} deleted",
        changes.added.len(),
        changes.modified.len(),
        changes.deleted.len()
    );

    if changes.is_empty() {
        info!("Change set is empty, nothing to apply");
        return ApplyReport::default();
    }

    let mut report = ApplyReport {
        backup: backup.backup(changes.backup_set(ctx.target)).await,
        ..ApplyReport::default()
    };

    for (paths, op) in [(&changes.added, FileOp::Add), (&changes.modified, FileOp::Modify)] {
        for relative in paths {
            let status = if ctx.skip.matches(relative) {
                info!("Skipping protected file {}", relative.display());
                FileStatus::Skipped
            } else if op == FileOp::Modify && !entry_exists(&ctx.staging.join(relative)) {
                warn!(
                    "Staged source for modified {} is missing, leaving it unchanged",
                    relative.display()
                );
                FileStatus::Skipped
            } else {
                install_staged(ctx, backup, relative, op).await
            };
            report.changes.record(relative, op, status);
        }
    }

    for relative in &changes.deleted {
        let target = ctx.target.join(relative);
        if !entry_exists(&target) {
            debug!("{} is already absent", relative.display());
            continue;
        }
        let result = ctx.ops.remove(&target).await;
        match &result {
            Ok(()) => info!("delete: {}", relative.display()),
            Err(err) => error!("Failed to delete {}: {err}", relative.display()),
        }
        report
            .changes
            .record_result(relative, FileOp::Delete, result.map_err(Into::into));
    }

    info!("Incremental update finished: {}", report.changes.summary());
    report
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::apply_incremental;
    use crate::apply::ApplyContext;
    use crate::backup::BackupManager;
    use crate::manifest::ChangeSet;
    use crate::report::{FileFailure, FileOp, FileStatus};
    use crate::retry::RetryPolicy;
    use crate::skip::SkipList;
    use crate::transfer::{FileOps, LocalTransfer};

    struct Fixture {
        _temp: tempfile::TempDir,
        target: PathBuf,
        staging: PathBuf,
    }

    fn fixture() -> Fixture {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let target = temp.path().join("app");
        let staging = temp.path().join("staging");
        std::fs::create_dir_all(&target).expect("target should be created");
        std::fs::create_dir_all(&staging).expect("staging should be created");
        Fixture {
            _temp: temp,
            target,
            staging,
        }
    }

    fn paths(entries: &[&str]) -> Vec<PathBuf> {
        entries.iter().map(PathBuf::from).collect()
    }

    #[tokio::test]
    async fn applies_added_modified_and_deleted_entries() {
        let fx = fixture();
        std::fs::write(fx.target.join("core.dll"), b"core-v1").expect("write");
        std::fs::write(fx.target.join("obsolete.txt"), b"old").expect("write");
        std::fs::write(fx.staging.join("new.txt"), b"new").expect("write");
        std::fs::write(fx.staging.join("core.dll"), b"core-v2").expect("write");

        let changes = ChangeSet {
            added: paths(&["new.txt"]),
            modified: paths(&["core.dll"]),
            deleted: paths(&["obsolete.txt"]),
        };
        let retry = RetryPolicy::once();
        let ops = FileOps::new(&LocalTransfer, &retry);
        let skip = SkipList::default();
        let ctx = ApplyContext {
            target: &fx.target,
            staging: &fx.staging,
            ops,
            skip: &skip,
        };
        let mut backup = BackupManager::new(&fx.target, ops);

        let report = apply_incremental(&ctx, &changes, &mut backup).await;

        assert!(report.is_success());
        assert_eq!(std::fs::read(fx.target.join("new.txt")).expect("new.txt"), b"new");
        assert_eq!(std::fs::read(fx.target.join("core.dll")).expect("core.dll"), b"core-v2");
        assert!(!fx.target.join("obsolete.txt").exists());

        let backed_up: Vec<_> = backup.backed_up().iter().cloned().collect();
        assert_eq!(backed_up, paths(&["core.dll", "obsolete.txt"]));
        assert_eq!(backup.created(), paths(&["new.txt"]).as_slice());
    }

    #[tokio::test]
    async fn missing_added_source_fails_but_later_phases_still_run() {
        let fx = fixture();
        std::fs::write(fx.target.join("obsolete.txt"), b"old").expect("write");

        let changes = ChangeSet {
            added: paths(&["ghost.txt"]),
            modified: Vec::new(),
            deleted: paths(&["obsolete.txt"]),
        };
        let retry = RetryPolicy::once();
        let ops = FileOps::new(&LocalTransfer, &retry);
        let skip = SkipList::default();
        let ctx = ApplyContext {
            target: &fx.target,
            staging: &fx.staging,
            ops,
            skip: &skip,
        };
        let mut backup = BackupManager::new(&fx.target, ops);

        let report = apply_incremental(&ctx, &changes, &mut backup).await;

        assert!(!report.is_success());
        assert_eq!(
            report.changes.status_of(Path::new("ghost.txt"), FileOp::Add),
            Some(&FileStatus::Failed(FileFailure::MissingSource(PathBuf::from("ghost.txt"))))
        );
        assert!(!fx.target.join("obsolete.txt").exists());
    }

    #[tokio::test]
    async fn protected_names_are_skipped() {
        let fx = fixture();
        std::fs::write(fx.target.join("updater.exe"), b"running").expect("write");
        std::fs::write(fx.staging.join("updater.exe"), b"replacement").expect("write");

        let changes = ChangeSet {
            added: Vec::new(),
            modified: paths(&["updater.exe"]),
            deleted: Vec::new(),
        };
        let retry = RetryPolicy::once();
        let ops = FileOps::new(&LocalTransfer, &retry);
        let skip = SkipList::new(["updater.exe"]);
        let ctx = ApplyContext {
            target: &fx.target,
            staging: &fx.staging,
            ops,
            skip: &skip,
        };
        let mut backup = BackupManager::new(&fx.target, ops);

        let report = apply_incremental(&ctx, &changes, &mut backup).await;

        assert!(report.is_success());
        assert_eq!(
            report.changes.status_of(Path::new("updater.exe"), FileOp::Modify),
            Some(&FileStatus::Skipped)
        );
        assert_eq!(
            std::fs::read(fx.target.join("updater.exe")).expect("updater.exe"),
            b"running"
        );
    }

    #[tokio::test]
    async fn added_path_that_exists_is_backed_up_not_recorded_as_new() {
        let fx = fixture();
        std::fs::write(fx.target.join("readme.txt"), b"v1").expect("write");
        std::fs::write(fx.staging.join("readme.txt"), b"v2").expect("write");

        let changes = ChangeSet {
            added: paths(&["readme.txt"]),
            modified: Vec::new(),
            deleted: Vec::new(),
        };
        let retry = RetryPolicy::once();
        let ops = FileOps::new(&LocalTransfer, &retry);
        let skip = SkipList::default();
        let ctx = ApplyContext {
            target: &fx.target,
            staging: &fx.staging,
            ops,
            skip: &skip,
        };
        let mut backup = BackupManager::new(&fx.target, ops);

        let report = apply_incremental(&ctx, &changes, &mut backup).await;

        assert!(report.is_success());
        assert!(backup.backed_up().contains(Path::new("readme.txt")));
        assert!(backup.created().is_empty());
    }

    #[tokio::test]
    async fn modified_entry_without_staged_source_is_left_alone() {
        let fx = fixture();
        std::fs::write(fx.target.join("core.dll"), b"core-v1").expect("write");
        std::fs::write(fx.target.join("keep.dll"), b"keep-v1").expect("write");
        std::fs::write(fx.staging.join("core.dll"), b"core-v2").expect("write");

        let changes = ChangeSet {
            added: Vec::new(),
            modified: paths(&["core.dll", "keep.dll"]),
            deleted: Vec::new(),
        };
        let retry = RetryPolicy::once();
        let ops = FileOps::new(&LocalTransfer, &retry);
        let skip = SkipList::default();
        let ctx = ApplyContext {
            target: &fx.target,
            staging: &fx.staging,
            ops,
            skip: &skip,
        };
        let mut backup = BackupManager::new(&fx.target, ops);

        let report = apply_incremental(&ctx, &changes, &mut backup).await;

        assert!(report.is_success());
        assert_eq!(
            report.changes.status_of(Path::new("keep.dll"), FileOp::Modify),
            Some(&FileStatus::Skipped)
        );
        assert_eq!(std::fs::read(fx.target.join("keep.dll")).expect("keep.dll"), b"keep-v1");
        assert_eq!(std::fs::read(fx.target.join("core.dll")).expect("core.dll"), b"core-v2");
    }

    #[tokio::test]
    async fn empty_change_set_touches_nothing() {
        let fx = fixture();
        let retry = RetryPolicy::once();
        let ops = FileOps::new(&LocalTransfer, &retry);
        let skip = SkipList::default();
        let ctx = ApplyContext {
            target: &fx.target,
            staging: &fx.staging,
            ops,
            skip: &skip,
        };
        let mut backup = BackupManager::new(&fx.target, ops);

        let report = apply_incremental(&ctx, &ChangeSet::default(), &mut backup).await;

        assert!(report.changes.outcomes().is_empty());
        assert!(backup.area().is_none());
    }
}
