//! POSIX termination steps: SIGTERM, SIGALRM for interactive transcoders, SIGKILL.

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use regex::Regex;
use tracing::{debug, trace};

use crate::domain::{PosixSignal, ProcessState, TerminationTarget};
use crate::ports::TerminationStep;

impl From<PosixSignal> for Signal {
    fn from(signal: PosixSignal) -> Self {
        match signal {
            PosixSignal::SigHup => Signal::SIGHUP,
            PosixSignal::SigInt => Signal::SIGINT,
            PosixSignal::SigQuit => Signal::SIGQUIT,
            PosixSignal::SigIll => Signal::SIGILL,
            PosixSignal::SigAbrt => Signal::SIGABRT,
            PosixSignal::SigFpe => Signal::SIGFPE,
            PosixSignal::SigKill => Signal::SIGKILL,
            PosixSignal::SigSegv => Signal::SIGSEGV,
            PosixSignal::SigPipe => Signal::SIGPIPE,
            PosixSignal::SigAlrm => Signal::SIGALRM,
            PosixSignal::SigTerm => Signal::SIGTERM,
        }
    }
}

/// Send a signal to a process.
pub fn send_signal(target: &TerminationTarget<'_>, signal: PosixSignal) -> bool {
    trace!(pid = target.pid, name = target.name, %signal, "Attempting to send signal");

    let raw = match i32::try_from(target.pid) {
        Ok(raw) if raw > 0 => raw,
        _ => {
            debug!(pid = target.pid, name = target.name, "Refusing to signal invalid PID");
            return false;
        }
    };

    match kill(Pid::from_raw(raw), Signal::from(signal)) {
        Ok(()) => {
            trace!(pid = target.pid, name = target.name, %signal, "Signal sent");
            true
        }
        Err(e) => {
            debug!(
                pid = target.pid,
                name = target.name,
                signal = signal.value(),
                error = %e,
                "kill failed"
            );
            false
        }
    }
}

/// Sends one signal, optionally only to processes whose name matches.
#[derive(Debug, Clone)]
pub struct SignalStep {
    signal: PosixSignal,
    state: ProcessState,
    only_for: Option<Regex>,
}

impl SignalStep {
    pub fn term() -> Self {
        Self {
            signal: PosixSignal::SigTerm,
            state: ProcessState::SigTerm,
            only_for: None,
        }
    }

    /// MPlayer and MEncoder respond to SIGALRM by finishing up.
    pub fn alarm(only_for: Regex) -> Self {
        Self {
            signal: PosixSignal::SigAlrm,
            state: ProcessState::SigAlrm,
            only_for: Some(only_for),
        }
    }

    pub fn kill() -> Self {
        Self {
            signal: PosixSignal::SigKill,
            state: ProcessState::SigKill,
            only_for: None,
        }
    }
}

impl TerminationStep for SignalStep {
    fn state(&self) -> ProcessState {
        self.state
    }

    fn applies_to(&self, target: &TerminationTarget<'_>) -> bool {
        self.only_for
            .as_ref()
            .map_or(true, |pattern| pattern.is_match(target.name))
    }

    fn attempt(&self, target: &TerminationTarget<'_>) -> bool {
        send_signal(target, self.signal)
    }
}
