//! Lifecycle states of a tracked process.

use std::fmt;

/// The termination stage a tracked process has reached.
///
/// Windows processes progress `Running -> WmClosed -> CtrlC -> TaskKilled ->
/// TerminateProcessCalled`, POSIX processes `Running -> SigTerm -> SigAlrm ->
/// SigKill`. A state names the last termination technique that was applied
/// successfully, so the next escalation starts with the technique after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessState {
    /// No termination attempt has been made yet.
    Running,
    /// `WM_CLOSE` was posted to the process' windows.
    WmClosed,
    /// A Ctrl+C control event was delivered.
    CtrlC,
    /// `taskkill /PID` succeeded.
    TaskKilled,
    /// `TerminateProcess` was called.
    TerminateProcessCalled,
    /// `SIGTERM` was sent.
    SigTerm,
    /// `SIGALRM` was sent.
    SigAlrm,
    /// `SIGKILL` was sent.
    SigKill,
}

impl ProcessState {
    /// Whether any termination technique has been applied yet.
    pub fn is_running(self) -> bool {
        self == ProcessState::Running
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcessState::Running => "RUNNING",
            ProcessState::WmClosed => "WM_CLOSED",
            ProcessState::CtrlC => "CTRL_C",
            ProcessState::TaskKilled => "TASKKILL",
            ProcessState::TerminateProcessCalled => "TERMINATEPROCESS",
            ProcessState::SigTerm => "SIGTERM",
            ProcessState::SigAlrm => "SIGALRM",
            ProcessState::SigKill => "SIGKILL",
        };
        f.write_str(s)
    }
}
