//! POSIX signals used to terminate processes.

use std::fmt;

/// The subset of POSIX signals the terminator knows how to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PosixSignal {
    SigHup,
    SigInt,
    SigQuit,
    SigIll,
    SigAbrt,
    SigFpe,
    SigKill,
    SigSegv,
    SigPipe,
    SigAlrm,
    SigTerm,
}

impl PosixSignal {
    /// The numeric signal value, as passed to `kill -<value>`.
    pub fn value(self) -> i32 {
        match self {
            PosixSignal::SigHup => 1,
            PosixSignal::SigInt => 2,
            PosixSignal::SigQuit => 3,
            PosixSignal::SigIll => 4,
            PosixSignal::SigAbrt => 6,
            PosixSignal::SigFpe => 8,
            PosixSignal::SigKill => 9,
            PosixSignal::SigSegv => 11,
            PosixSignal::SigPipe => 13,
            PosixSignal::SigAlrm => 14,
            PosixSignal::SigTerm => 15,
        }
    }

    /// The conventional signal name, e.g. `SIGTERM`.
    pub fn name(self) -> &'static str {
        match self {
            PosixSignal::SigHup => "SIGHUP",
            PosixSignal::SigInt => "SIGINT",
            PosixSignal::SigQuit => "SIGQUIT",
            PosixSignal::SigIll => "SIGILL",
            PosixSignal::SigAbrt => "SIGABRT",
            PosixSignal::SigFpe => "SIGFPE",
            PosixSignal::SigKill => "SIGKILL",
            PosixSignal::SigSegv => "SIGSEGV",
            PosixSignal::SigPipe => "SIGPIPE",
            PosixSignal::SigAlrm => "SIGALRM",
            PosixSignal::SigTerm => "SIGTERM",
        }
    }
}

impl fmt::Display for PosixSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
