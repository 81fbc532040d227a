//! Termination step port (interface).

use crate::domain::{ProcessState, TerminationTarget};

/// One way of asking a process to end.
///
/// Steps are stateless and synchronous. Any helper program a step runs must be
/// waited on with a bound, because the terminator thread is blocked meanwhile.
pub trait TerminationStep: Send {
    /// The lifecycle state a process enters once this step succeeded.
    fn state(&self) -> ProcessState;

    /// Whether the step should be tried for this process at all.
    fn applies_to(&self, _target: &TerminationTarget<'_>) -> bool {
        true
    }

    /// Attempt the technique. `false` means it could not be applied.
    fn attempt(&self, target: &TerminationTarget<'_>) -> bool;
}
