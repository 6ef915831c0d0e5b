//! Standalone update engine.
//!
//! Applies a downloaded zip package to an installed application's directory
//! while the application is not running:
//! - Waits for the application process to exit.
//! - Extracts the package into a staging area inside the installation.
//! - Backs up every entry about to be overwritten or deleted.
//! - Applies either an incremental change set or a full overwrite.
//! - Restores the backup when any file operation fails.
//! - Relaunches the application after a successful update.

mod apply;
mod backup;
mod engine;
mod error;
mod extract;
mod lock;
mod manifest;
mod report;
mod restart;
mod retry;
mod settings;
mod skip;
mod transfer;
mod waiter;

/// Appliers for the two package kinds.
pub use apply::{ApplyContext, apply_full, apply_incremental};
/// Backup area management and restore.
pub use backup::BackupManager;
/// Orchestrator, run request and run report.
pub use engine::{Engine, EngineState, RunOutcome, RunReport, UpdateMode, UpdateRequest};
pub use error::{EngineError, ExtractionError};
/// Package verification and extraction.
pub use extract::{extract_package, verify_package_checksum};
pub use lock::{LockError, RunLock};
/// Incremental change set read from `changes.json`.
pub use manifest::{ChangeSet, MANIFEST_FILE};
/// Per-file outcome collections.
pub use report::{ApplyReport, BatchReport, FileFailure, FileOp, FileOutcome, FileStatus};
pub use restart::{RestartError, restart_application};
pub use retry::RetryPolicy;
pub use settings::{EngineSettings, SettingsError};
pub use skip::SkipList;
pub use transfer::{FileOps, FileTransfer, LocalTransfer, entry_exists, walk_files};
pub use waiter::{WaitPolicy, wait_for_process_exit};
