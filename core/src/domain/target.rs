//! Borrowed view of a process handed to termination steps.

use std::fmt;

/// The identity a termination technique acts upon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminationTarget<'a> {
    /// OS process id.
    pub pid: u32,
    /// Human readable process name, usually the executable name.
    pub name: &'a str,
}

impl<'a> TerminationTarget<'a> {
    pub fn new(pid: u32, name: &'a str) -> Self {
        Self { pid, name }
    }
}

impl fmt::Display for TerminationTarget<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" ({})", self.name, self.pid)
    }
}
