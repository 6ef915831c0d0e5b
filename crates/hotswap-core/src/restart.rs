use std::path::PathBuf;

use hotswap_platform::{InstallPaths, spawn_detached};
use log::info;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RestartError {
    #[error("restart program {} does not exist", .0.display())]
    NotFound(PathBuf),
    #[error("failed to launch {}: {source}", .path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Launch `program` (relative to the installation) as a detached process
/// rooted at the installation directory. Returns the new pid.
///
/// # Errors
/// Returns an error when the program is missing or cannot be spawned.
pub fn restart_application(paths: &InstallPaths, program: &str) -> Result<u32, RestartError> {
    let path = paths.restart_program(program);
    if !path.is_file() {
        return Err(RestartError::NotFound(path));
    }

    info!("Launching {}", path.display());
    let pid = spawn_detached(&path, &paths.target_dir)
        .map_err(|source| RestartError::Spawn {
            path: path.clone(),
            source,
        })?;
    info!("Launched {} as pid {pid}", path.display());
    Ok(pid)
}
