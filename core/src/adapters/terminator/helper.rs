//! Termination steps that delegate to a helper program.
//!
//! Helpers are started with all stdio discarded and waited on with a bound,
//! so a stuck helper can never stall the terminator thread.

use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error, trace, warn};

use crate::config::{CTRL_BREAK_EVENT, CTRL_C_EVENT};
use crate::domain::{ProcessState, TerminationTarget};
use crate::ports::TerminationStep;

/// Interval between exit checks of a running helper.
const HELPER_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Run a helper program and wait at most `timeout` for it to exit.
///
/// Returns `Ok(None)` if the helper overran and was killed.
pub fn run_helper(
    program: &Path,
    args: &[String],
    timeout: Duration,
) -> std::io::Result<Option<ExitStatus>> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(HELPER_POLL_INTERVAL);
    }
}

/// Delivers a console control event through `ctrlsender`.
#[derive(Debug, Clone)]
pub struct CtrlEventStep {
    ctrl_sender: Option<PathBuf>,
    event: u32,
    timeout: Duration,
}

impl CtrlEventStep {
    pub fn new(ctrl_sender: Option<PathBuf>, event: u32, timeout: Duration) -> Self {
        Self {
            ctrl_sender,
            event,
            timeout,
        }
    }

    fn event_name(&self) -> &'static str {
        match self.event {
            CTRL_C_EVENT => "C",
            CTRL_BREAK_EVENT => "BREAK",
            _ => "?",
        }
    }
}

impl TerminationStep for CtrlEventStep {
    fn state(&self) -> ProcessState {
        ProcessState::CtrlC
    }

    fn applies_to(&self, _target: &TerminationTarget<'_>) -> bool {
        self.ctrl_sender.is_some()
    }

    fn attempt(&self, target: &TerminationTarget<'_>) -> bool {
        let Some(ctrl_sender) = &self.ctrl_sender else {
            return false;
        };
        trace!(pid = target.pid, name = target.name, "Attempting to stop process with CtrlSender");

        let args = [target.pid.to_string(), self.event.to_string()];
        match run_helper(ctrl_sender, &args, self.timeout) {
            Ok(Some(status)) if status.success() => {
                trace!(
                    pid = target.pid,
                    name = target.name,
                    "Ctrl + {} sent with CtrlSender",
                    self.event_name()
                );
                true
            }
            Ok(Some(status)) if status.code() == Some(1) => {
                trace!(pid = target.pid, name = target.name, "CtrlSender could not attach to process");
                false
            }
            Ok(Some(status)) => {
                warn!(exit_code = ?status.code(), "An internal error caused CtrlSender to fail");
                false
            }
            Ok(None) => {
                debug!(pid = target.pid, name = target.name, "CtrlSender timed out");
                false
            }
            Err(e) => {
                error!(pid = target.pid, name = target.name, error = %e, "CtrlSender failed to start");
                false
            }
        }
    }
}

/// Runs `taskkill /PID <pid>`.
#[derive(Debug, Clone)]
pub struct TaskKillStep {
    task_kill: Option<PathBuf>,
    timeout: Duration,
}

impl TaskKillStep {
    pub fn new(task_kill: Option<PathBuf>, timeout: Duration) -> Self {
        Self { task_kill, timeout }
    }
}

impl TerminationStep for TaskKillStep {
    fn state(&self) -> ProcessState {
        ProcessState::TaskKilled
    }

    fn applies_to(&self, _target: &TerminationTarget<'_>) -> bool {
        self.task_kill.is_some()
    }

    fn attempt(&self, target: &TerminationTarget<'_>) -> bool {
        let Some(task_kill) = &self.task_kill else {
            return false;
        };
        trace!(pid = target.pid, name = target.name, "Attempting to stop process with TaskKill");

        let args = ["/PID".to_string(), target.pid.to_string()];
        match run_helper(task_kill, &args, self.timeout) {
            Ok(Some(status)) if status.success() => {
                trace!(pid = target.pid, name = target.name, "TaskKill performed");
                true
            }
            Ok(Some(status)) => {
                debug!(
                    pid = target.pid,
                    name = target.name,
                    exit_code = ?status.code(),
                    "TaskKill failed"
                );
                false
            }
            Ok(None) => {
                debug!(pid = target.pid, name = target.name, "TaskKill timed out");
                false
            }
            Err(e) => {
                error!(pid = target.pid, name = target.name, error = %e, "TaskKill failed to start");
                false
            }
        }
    }
}
