//! Tickets queued by callers and the processes the terminator tracks.

use std::fmt;
use std::time::Duration;

use crate::domain::{ProcessState, TerminationTarget};
use crate::error::{Error, Result};
use crate::ports::SharedProcess;

/// What a ticket asks the terminator to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketAction {
    /// Start tracking the process.
    Add,
    /// Stop tracking the process without touching it.
    Remove,
    /// Start terminating a tracked process now.
    Shutdown,
}

impl fmt::Display for TicketAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TicketAction::Add => "ADD",
            TicketAction::Remove => "REMOVE",
            TicketAction::Shutdown => "SHUTDOWN",
        };
        f.write_str(s)
    }
}

/// An immutable request from a caller thread to the terminator.
#[derive(Clone)]
pub struct ProcessTicket {
    pub process: SharedProcess,
    pub name: String,
    pub action: TicketAction,
    /// Time before the first termination attempt. Only used by `Add`.
    pub timeout: Duration,
    /// Time allowed for each termination technique to take effect.
    pub terminate_timeout: Duration,
}

impl ProcessTicket {
    pub fn new(
        process: SharedProcess,
        name: impl Into<String>,
        action: TicketAction,
        timeout: Duration,
        terminate_timeout: Duration,
    ) -> Self {
        Self {
            process,
            name: name.into(),
            action,
            timeout,
            terminate_timeout,
        }
    }
}

impl fmt::Debug for ProcessTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessTicket")
            .field("name", &self.name)
            .field("action", &self.action)
            .field("timeout", &self.timeout)
            .field("terminate_timeout", &self.terminate_timeout)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ProcessTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} \"{}\" (timeout: {} ms, terminate timeout: {} ms)",
            self.action,
            self.name,
            self.timeout.as_millis(),
            self.terminate_timeout.as_millis()
        )
    }
}

/// A process under management. Owned and mutated by the terminator thread only.
pub struct TrackedProcess {
    pub process: SharedProcess,
    pub name: String,
    pub pid: u32,
    pub terminate_timeout: Duration,
    pub state: ProcessState,
}

impl TrackedProcess {
    /// Start tracking the process of an `Add` ticket.
    ///
    /// The PID is resolved once and cached. A process whose PID can't be
    /// resolved is not tracked.
    pub fn from_ticket(ticket: ProcessTicket) -> Result<Self> {
        let pid = match ticket.process.pid() {
            Some(pid) if pid != 0 => pid,
            _ => return Err(Error::PidUnavailable { name: ticket.name }),
        };
        Ok(Self {
            process: ticket.process,
            name: ticket.name,
            pid,
            terminate_timeout: ticket.terminate_timeout,
            state: ProcessState::Running,
        })
    }

    pub fn target(&self) -> TerminationTarget<'_> {
        TerminationTarget::new(self.pid, &self.name)
    }
}

impl fmt::Debug for TrackedProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedProcess")
            .field("name", &self.name)
            .field("pid", &self.pid)
            .field("terminate_timeout", &self.terminate_timeout)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for TrackedProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.target(), f)
    }
}
