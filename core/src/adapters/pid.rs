//! Process handle adapter for processes known only by PID.

use tracing::debug;

use super::probe;
use crate::error::{Error, Result};
use crate::ports::ProcessHandle;

/// A process this program did not spawn, e.g. a leftover transcoder.
///
/// There are no streams to close, and destroying it kills it by PID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PidProcess {
    pid: u32,
}

impl PidProcess {
    /// Wrap a running process.
    pub fn new(pid: u32) -> Result<Self> {
        if pid == 0 {
            return Err(Error::PidUnavailable {
                name: pid.to_string(),
            });
        }
        if !probe::pid_is_alive(pid) {
            return Err(Error::ProcessNotAlive {
                name: pid.to_string(),
            });
        }
        Ok(Self { pid })
    }
}

impl ProcessHandle for PidProcess {
    fn pid(&self) -> Option<u32> {
        Some(self.pid)
    }

    fn is_alive(&self) -> bool {
        probe::pid_is_alive(self.pid)
    }

    fn close_streams(&self) {}

    fn destroy(&self) {
        if probe::pid_is_alive(self.pid) && !probe::force_kill(self.pid) {
            debug!(pid = self.pid, "Could not destroy process");
        }
    }
}
