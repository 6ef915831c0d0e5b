use std::path::PathBuf;

use hotswap_platform::paths::STAGING_PREFIX;
use hotswap_platform::{InstallPaths, ProcessProbe, SystemProbe};
use log::{error, info, warn};

use crate::apply::{ApplyContext, apply_full, apply_incremental};
use crate::backup::BackupManager;
use crate::error::EngineError;
use crate::extract::{extract_package, verify_package_checksum};
use crate::lock::RunLock;
use crate::manifest::ChangeSet;
use crate::report::{ApplyReport, BatchReport};
use crate::restart::restart_application;
use crate::settings::EngineSettings;
use crate::skip::SkipList;
use crate::transfer::{FileOps, FileTransfer, LocalTransfer};
use crate::waiter::wait_for_process_exit;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UpdateMode {
    Incremental,
    #[default]
    Full,
}

impl std::fmt::Display for UpdateMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Incremental => f.write_str("incremental"),
            Self::Full => f.write_str("full"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UpdateRequest {
    pub package: PathBuf,
    pub mode: UpdateMode,
    pub restart: Option<String>,
    pub wait_pid: Option<u32>,
    pub expected_sha256: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    WaitingForExit,
    Extracting,
    Applying,
    Success,
    Restore,
    Cleanup,
    Restart,
    Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Files updated; any restart has been attempted.
    Succeeded,
    /// The apply failed and the backup was copied back.
    Restored,
    /// A fatal error before any installation file was touched.
    Aborted,
}

/// Everything a run observed, in order.
#[derive(Debug, Default)]
pub struct RunReport {
    pub states: Vec<EngineState>,
    pub process_exited: Option<bool>,
    pub apply: Option<ApplyReport>,
    pub restore: Option<BatchReport>,
    /// Backup area left in place because the restore did not complete.
    pub kept_backup: Option<PathBuf>,
    pub restart_pid: Option<u32>,
    pub error: Option<EngineError>,
}

impl RunReport {
    fn enter(&mut self, state: EngineState) {
        info!("State: {state:?}");
        self.states.push(state);
    }

    fn abort(mut self, error: EngineError) -> Self {
        error!("Update aborted: {error}");
        self.enter(EngineState::Failure);
        self.error = Some(error);
        self
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    #[must_use]
    pub fn outcome(&self) -> RunOutcome {
        match &self.error {
            None => RunOutcome::Succeeded,
            Some(error) if error.is_pre_mutation() => RunOutcome::Aborted,
            Some(_) => RunOutcome::Restored,
        }
    }

    #[must_use]
    pub fn exit_code(&self) -> u8 {
        u8::from(!self.is_success())
    }
}

/// Sequences one update run against a single installation.
pub struct Engine {
    paths: InstallPaths,
    settings: EngineSettings,
    skip: SkipList,
    transfer: Box<dyn FileTransfer>,
    probe: Box<dyn ProcessProbe>,
}

impl Engine {
    #[must_use]
    pub fn new(paths: InstallPaths, settings: EngineSettings) -> Self {
        let skip = settings.skip_list();
        Self {
            paths,
            settings,
            skip,
            transfer: Box::new(LocalTransfer),
            probe: Box::new(SystemProbe::new()),
        }
    }

    #[must_use]
    pub fn with_transfer(mut self, transfer: Box<dyn FileTransfer>) -> Self {
        self.transfer = transfer;
        self
    }

    #[must_use]
    pub fn with_probe(mut self, probe: Box<dyn ProcessProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Protect an additional file name from being overwritten, typically the
    /// running executable's own name.
    pub fn protect(&mut self, name: &str) {
        self.skip.insert(name);
    }

    #[must_use]
    pub fn paths(&self) -> &InstallPaths {
        &self.paths
    }

    /// Run the whole pipeline. Never panics on I/O failure; the outcome,
    /// including any fatal error, is in the returned report.
    pub async fn run(&mut self, request: &UpdateRequest) -> RunReport {
        let mut report = RunReport::default();
        let target = self.paths.target_dir.clone();
        let package = self.paths.package_path(&request.package);

        info!("==================== update started ====================");
        info!("Package: {}", package.display());
        info!("Mode: {}", request.mode);
        info!("Target: {}", target.display());

        let _lock = match RunLock::acquire(&self.paths.lock_file()) {
            Ok(lock) => lock,
            Err(err) => return report.abort(err.into()),
        };

        if let Some(pid) = request.wait_pid {
            report.enter(EngineState::WaitingForExit);
            let exited =
                wait_for_process_exit(self.probe.as_mut(), Some(pid), &self.settings.wait_policy())
                    .await;
            report.process_exited = Some(exited);
            tokio::time::sleep(self.settings.grace_delay()).await;
        }

        report.enter(EngineState::Extracting);
        if let Some(expected) = &request.expected_sha256
            && let Err(err) = verify_package_checksum(&package, expected)
        {
            return report.abort(err.into());
        }
        let staging = match tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(&target)
        {
            Ok(staging) => staging,
            Err(err) => return report.abort(EngineError::Staging(err)),
        };
        if let Err(err) = extract_package(&package, staging.path()) {
            return report.abort(err.into());
        }
        let changes = match request.mode {
            UpdateMode::Incremental => match ChangeSet::load(staging.path()) {
                Ok(changes) => Some(changes),
                Err(err) => return report.abort(err),
            },
            UpdateMode::Full => None,
        };

        report.enter(EngineState::Applying);
        let retry = self.settings.retry_policy();
        let ops = FileOps::new(self.transfer.as_ref(), &retry);
        let ctx = ApplyContext {
            target: &target,
            staging: staging.path(),
            ops,
            skip: &self.skip,
        };
        let mut backup = BackupManager::new(&target, ops);
        let apply = match &changes {
            Some(changes) => apply_incremental(&ctx, changes, &mut backup).await,
            None => apply_full(&ctx, &mut backup).await,
        };
        let failed = apply.changes.failure_count();
        report.apply = Some(apply);

        if failed > 0 {
            error!("{failed} file operation(s) failed, restoring from backup");
            report.enter(EngineState::Restore);
            let restore = backup.restore().await;
            if !restore.is_success() {
                error!(
                    "Restore incomplete, installation may be in a mixed state: {}",
                    restore.summary()
                );
            }
            report.restore = Some(restore);
        } else {
            report.enter(EngineState::Success);
        }

        report.enter(EngineState::Cleanup);
        let restore_failed = report
            .restore
            .as_ref()
            .is_some_and(|restore| !restore.is_success());
        if restore_failed {
            if let Some(kept) = backup.keep() {
                error!("Backup kept at {} for manual recovery", kept.display());
                report.kept_backup = Some(kept);
            }
        } else if let Err(err) = backup.cleanup() {
            warn!("Failed to remove backup area: {err}");
        }
        let staging_path = staging.path().to_path_buf();
        if let Err(err) = staging.close() {
            warn!("Failed to remove staging area {}: {err}", staging_path.display());
        }

        if failed > 0 {
            report.enter(EngineState::Failure);
            report.error = Some(EngineError::Apply { failed });
            error!("==================== update failed ====================");
            return report;
        }

        info!("==================== update completed ====================");
        if let Some(program) = &request.restart {
            report.enter(EngineState::Restart);
            match restart_application(&self.paths, program) {
                Ok(pid) => report.restart_pid = Some(pid),
                Err(err) => error!("Restart failed: {err}"),
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::{EngineState, RunOutcome, RunReport, UpdateMode};
    use crate::error::EngineError;

    #[test]
    fn default_mode_is_full() {
        assert_eq!(UpdateMode::default(), UpdateMode::Full);
        assert_eq!(UpdateMode::Incremental.to_string(), "incremental");
    }

    #[test]
    fn outcome_and_exit_code_follow_error() {
        let success = RunReport::default();
        assert_eq!(success.outcome(), RunOutcome::Succeeded);
        assert_eq!(success.exit_code(), 0);

        let restored = RunReport {
            error: Some(EngineError::Apply { failed: 1 }),
            ..RunReport::default()
        };
        assert_eq!(restored.outcome(), RunOutcome::Restored);
        assert_eq!(restored.exit_code(), 1);

        let aborted = RunReport::default().abort(EngineError::ManifestMissing {
            path: "changes.json".into(),
        });
        assert_eq!(aborted.outcome(), RunOutcome::Aborted);
        assert_eq!(aborted.states, vec![EngineState::Failure]);
        assert_eq!(aborted.exit_code(), 1);
    }
}
