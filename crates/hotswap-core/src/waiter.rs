use std::time::Duration;

use hotswap_platform::ProcessProbe;
use log::{info, warn};
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

/// Poll until `pid` is gone or the timeout elapses.
///
/// Returns `true` when the process exited (or no pid was given) and `false`
/// on timeout. A timeout is logged as a warning, never an error.
pub async fn wait_for_process_exit(
    probe: &mut dyn ProcessProbe,
    pid: Option<u32>,
    policy: &WaitPolicy,
) -> bool {
    let Some(pid) = pid else {
        return true;
    };

    if !probe.is_running(pid) {
        info!("Process {pid} had already exited");
        return true;
    }

    info!("Waiting for process {pid} to exit");
    let deadline = Instant::now() + policy.timeout;
    loop {
        let now = Instant::now();
        if now >= deadline {
            warn!(
                "Process {pid} still running after {}s, continuing anyway",
                policy.timeout.as_secs()
            );
            return false;
        }

        tokio::time::sleep(policy.poll_interval.min(deadline - now)).await;

        if !probe.is_running(pid) {
            info!("Process {pid} exited");
            return true;
        }
    }
}
