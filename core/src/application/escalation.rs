//! Escalation state machine for a single tracked process.

use std::time::Duration;

use tracing::{debug, warn};

use super::tracked::TrackedProcess;
use crate::adapters::platform_steps;
use crate::config::TerminatorConfig;
use crate::error::Result;
use crate::ports::{release, TerminationStep};

/// Result of firing a tracked process' deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The process has exited and its handle was released.
    Exited,
    /// A technique succeeded; check again after the delay.
    Advanced(Duration),
    /// Every technique was exhausted and the process was destroyed.
    Destroyed,
}

/// Ordered table of termination steps, least forceful first.
///
/// A process in state `S` continues with the step after the one that
/// produces `S`; a process still `Running` starts with the first step.
pub struct EscalationPlan {
    steps: Vec<Box<dyn TerminationStep>>,
    final_step_min_timeout: Duration,
}

impl EscalationPlan {
    pub fn new(steps: Vec<Box<dyn TerminationStep>>, final_step_min_timeout: Duration) -> Self {
        Self {
            steps,
            final_step_min_timeout,
        }
    }

    /// The plan for the platform this program runs on.
    pub fn for_platform(config: &TerminatorConfig) -> Result<Self> {
        Ok(Self::new(
            platform_steps(config)?,
            config.final_step_min_timeout(),
        ))
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Index of the first step still to try for this process.
    fn next_step(&self, tracked: &TrackedProcess) -> usize {
        if tracked.state.is_running() {
            return 0;
        }
        self.steps
            .iter()
            .position(|step| step.state() == tracked.state)
            .map_or(self.steps.len(), |i| i + 1)
    }

    /// Move a process whose deadline fired one stage further.
    ///
    /// Steps that fail fall through to the next one immediately. When none is
    /// left the process is destroyed.
    pub fn escalate(&self, tracked: &mut TrackedProcess) -> Outcome {
        if !tracked.process.is_alive() {
            debug!(pid = tracked.pid, name = %tracked.name, "Process has terminated");
            release(tracked.process.as_ref());
            return Outcome::Exited;
        }

        debug!(
            pid = tracked.pid,
            name = %tracked.name,
            state = %tracked.state,
            "Trying to terminate process since its allowed run time has expired"
        );

        let last = self.steps.len().saturating_sub(1);
        for (index, step) in self.steps.iter().enumerate().skip(self.next_step(tracked)) {
            let target = tracked.target();
            if !step.applies_to(&target) || !step.attempt(&target) {
                continue;
            }
            tracked.state = step.state();
            let delay = if index == last {
                tracked.terminate_timeout.max(self.final_step_min_timeout)
            } else {
                tracked.terminate_timeout
            };
            return Outcome::Advanced(delay);
        }

        warn!(
            pid = tracked.pid,
            name = %tracked.name,
            "All attempts to terminate process have failed, destroying it"
        );
        release(tracked.process.as_ref());
        Outcome::Destroyed
    }
}
