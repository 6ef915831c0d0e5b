use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

#[cfg(windows)]
use std::os::windows::process::CommandExt;

#[cfg(unix)]
use std::os::unix::process::CommandExt;

#[cfg(windows)]
const DETACHED_PROCESS: u32 = 0x0000_0008;
#[cfg(windows)]
const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;

/// Configure a command so the spawned process outlives its parent and shares
/// neither its console nor its process group.
pub trait Detach {
    fn detach(&mut self) -> &mut Self;
}

impl Detach for Command {
    #[cfg(windows)]
    fn detach(&mut self) -> &mut Self {
        self.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP)
    }

    #[cfg(unix)]
    fn detach(&mut self) -> &mut Self {
        self.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .process_group(0)
    }

    #[cfg(not(any(unix, windows)))]
    fn detach(&mut self) -> &mut Self {
        self.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
    }
}

/// Launch `program` detached with `working_dir` as its current directory and
/// return its pid. The child handle is dropped immediately; nobody waits on it.
///
/// # Errors
/// Returns the spawn error when the program cannot be started.
pub fn spawn_detached(program: &Path, working_dir: &Path) -> io::Result<u32> {
    let child = Command::new(program)
        .current_dir(working_dir)
        .detach()
        .spawn()?;
    Ok(child.id())
}
