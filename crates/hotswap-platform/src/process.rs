use sysinfo::{Pid, ProcessStatus, System};

/// Answers whether an external process is still alive.
pub trait ProcessProbe {
    fn is_running(&mut self, pid: u32) -> bool;
}

pub struct SystemProbe {
    system: System,
}

impl SystemProbe {
    #[must_use]
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessProbe for SystemProbe {
    fn is_running(&mut self, pid: u32) -> bool {
        let pid = Pid::from_u32(pid);
        if !self.system.refresh_process(pid) {
            return false;
        }

        // A zombie has released its files even though the pid is still listed.
        self.system
            .process(pid)
            .is_some_and(|process| {
                !matches!(
                    process.status(),
                    ProcessStatus::Zombie | ProcessStatus::Dead
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::{ProcessProbe, SystemProbe};

    #[test]
    fn current_process_is_reported_running() {
        let mut probe = SystemProbe::new();
        assert!(probe.is_running(std::process::id()));
    }

    #[cfg(unix)]
    #[test]
    fn reaped_child_is_reported_gone() {
        let mut child = std::process::Command::new("sleep")
            .arg("30")
            .spawn()
            .expect("sleep should spawn");
        let pid = child.id();
        child.kill().expect("child should be killable");
        child.wait().expect("child should be reaped");

        let mut probe = SystemProbe::new();
        assert!(!probe.is_running(pid));
    }

    #[test]
    fn unused_pid_is_reported_gone() {
        let mut probe = SystemProbe::new();
        assert!(!probe.is_running(u32::MAX - 1));
    }
}
