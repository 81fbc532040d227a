//! Fakes shared by the application layer tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::domain::{ProcessState, TerminationTarget};
use crate::ports::{ProcessHandle, SharedProcess, TerminationStep};

/// A process that stays in whatever liveness state the test sets.
pub struct FakeProcess {
    pid: Option<u32>,
    alive: AtomicBool,
    pub closed: AtomicUsize,
    pub destroyed: AtomicUsize,
}

impl FakeProcess {
    pub fn alive(pid: u32) -> Arc<Self> {
        Arc::new(Self {
            pid: Some(pid),
            alive: AtomicBool::new(true),
            closed: AtomicUsize::new(0),
            destroyed: AtomicUsize::new(0),
        })
    }

    pub fn dead(pid: u32) -> Arc<Self> {
        let process = Self::alive(pid);
        process.set_alive(false);
        process
    }

    pub fn without_pid() -> Arc<Self> {
        Arc::new(Self {
            pid: None,
            alive: AtomicBool::new(true),
            closed: AtomicUsize::new(0),
            destroyed: AtomicUsize::new(0),
        })
    }

    pub fn set_alive(&self, alive: bool) {
        self.alive.store(alive, Ordering::SeqCst);
    }

    pub fn destroyed(&self) -> usize {
        self.destroyed.load(Ordering::SeqCst)
    }

    pub fn shared(self: &Arc<Self>) -> SharedProcess {
        Arc::clone(self) as SharedProcess
    }
}

impl ProcessHandle for FakeProcess {
    fn pid(&self) -> Option<u32> {
        self.pid
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn close_streams(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }

    fn destroy(&self) {
        self.destroyed.fetch_add(1, Ordering::SeqCst);
        self.alive.store(false, Ordering::SeqCst);
    }
}

/// Attempts recorded by [`RecordingStep`]s, as `(pid, state)`.
pub type AttemptLog = Arc<Mutex<Vec<(u32, ProcessState)>>>;

/// A step that records every attempt and returns a fixed result.
pub struct RecordingStep {
    pub state: ProcessState,
    pub succeeds: bool,
    pub only_for: Option<&'static str>,
    pub log: AttemptLog,
}

impl RecordingStep {
    pub fn boxed(state: ProcessState, succeeds: bool, log: &AttemptLog) -> Box<dyn TerminationStep> {
        Box::new(Self {
            state,
            succeeds,
            only_for: None,
            log: Arc::clone(log),
        })
    }
}

impl TerminationStep for RecordingStep {
    fn state(&self) -> ProcessState {
        self.state
    }

    fn applies_to(&self, target: &TerminationTarget<'_>) -> bool {
        self.only_for.map_or(true, |name| target.name.contains(name))
    }

    fn attempt(&self, target: &TerminationTarget<'_>) -> bool {
        self.log.lock().push((target.pid, self.state));
        self.succeeds
    }
}

/// Attempts made so far, states only.
pub fn attempted_states(log: &AttemptLog) -> Vec<ProcessState> {
    log.lock().iter().map(|(_, state)| *state).collect()
}
