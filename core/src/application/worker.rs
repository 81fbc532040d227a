//! The process terminator: the single thread that owns the schedule.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error, trace};

use super::escalation::{EscalationPlan, Outcome};
use super::schedule::{deadline_after, Schedule};
use super::tracked::{ProcessTicket, TicketAction, TrackedProcess};
use crate::ports::{release, same_process};

/// Messages consumed by the terminator.
pub(crate) enum Message {
    Ticket(ProcessTicket),
    /// Stop request addressed to the terminator of this generation.
    Stop(u64),
}

/// How a terminator run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WorkerExit {
    /// Stopped on request after every tracked process was handled.
    Stopped,
    /// Died from an internal fault after an emergency shutdown.
    Faulted,
}

/// Timing applied when the terminator shuts down.
#[derive(Debug, Clone, Copy)]
pub struct ShutdownPolicy {
    /// Cap on the terminate timeout of processes still running.
    pub terminate_timeout: Duration,
    /// Offset between consecutive rescheduled processes.
    pub stagger: Duration,
}

pub(crate) struct Worker {
    generation: u64,
    schedule: Schedule,
    plan: EscalationPlan,
    policy: ShutdownPolicy,
    shutting_down: bool,
}

impl Worker {
    pub(crate) fn new(generation: u64, plan: EscalationPlan, policy: ShutdownPolicy) -> Self {
        Self {
            generation,
            schedule: Schedule::new(),
            plan,
            policy,
            shutting_down: false,
        }
    }

    /// Run until stopped and every tracked process is handled.
    pub(crate) fn run(mut self, inbox: &Receiver<Message>) -> WorkerExit {
        debug!(generation = self.generation, "Process terminator is starting");

        let exit = match panic::catch_unwind(AssertUnwindSafe(|| self.work(inbox))) {
            Ok(()) => WorkerExit::Stopped,
            Err(payload) => {
                error!(
                    reason = panic_message(payload.as_ref()),
                    "Unexpected error in process terminator, shutting down managed processes"
                );
                self.begin_shutdown();
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| self.work(inbox))) {
                    error!(
                        reason = panic_message(payload.as_ref()),
                        remaining = self.schedule.len(),
                        "Unexpected error in process terminator while shutting down, \
                         leaving managed processes behind"
                    );
                }
                WorkerExit::Faulted
            }
        };

        debug!(generation = self.generation, "Process terminator has stopped");
        exit
    }

    fn work(&mut self, inbox: &Receiver<Message>) {
        loop {
            if !self.shutting_down {
                self.drain_inbox(inbox);
            }

            while let Some(tracked) = self.schedule.pop_due(Instant::now()) {
                self.fire(tracked);
            }

            match self.schedule.next_deadline() {
                None if self.shutting_down => break,
                None => {
                    trace!("Process terminator is waiting for new tickets");
                    match inbox.recv() {
                        Ok(message) => self.handle(message),
                        Err(_) => self.begin_shutdown(),
                    }
                }
                Some(deadline) => {
                    let wait = deadline.saturating_duration_since(Instant::now());
                    if wait.is_zero() {
                        continue;
                    }
                    trace!(wait_ms = wait.as_millis() as u64, "Process terminator is waiting");
                    if self.shutting_down {
                        thread::sleep(wait);
                        continue;
                    }
                    match inbox.recv_timeout(wait) {
                        Ok(message) => self.handle(message),
                        Err(RecvTimeoutError::Timeout) => {}
                        Err(RecvTimeoutError::Disconnected) => self.begin_shutdown(),
                    }
                }
            }
        }
    }

    /// Apply every queued message without blocking.
    fn drain_inbox(&mut self, inbox: &Receiver<Message>) {
        while !self.shutting_down {
            match inbox.try_recv() {
                Ok(message) => self.handle(message),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => self.begin_shutdown(),
            }
        }
    }

    fn handle(&mut self, message: Message) {
        match message {
            Message::Ticket(ticket) => self.apply(ticket),
            Message::Stop(generation) if generation == self.generation => {
                debug!("Shutting down process terminator");
                self.begin_shutdown();
            }
            Message::Stop(generation) => {
                trace!(generation = generation, "Ignoring stop request of a previous terminator");
            }
        }
    }

    fn apply(&mut self, ticket: ProcessTicket) {
        match ticket.action {
            TicketAction::Add => {
                let timeout = ticket.timeout;
                match TrackedProcess::from_ticket(ticket) {
                    Ok(tracked) => {
                        trace!(
                            pid = tracked.pid,
                            name = %tracked.name,
                            delay_ms = timeout.as_millis() as u64,
                            "Scheduled shutdown of process"
                        );
                        self.schedule.insert(deadline_after(Instant::now(), timeout), tracked);
                    }
                    Err(e) => error!(error = %e, "Process will not be managed"),
                }
            }
            TicketAction::Remove => {
                let removed = self.take_matching(&ticket);
                if removed.is_empty() {
                    debug!(name = %ticket.name, "Couldn't find process to remove from process management");
                }
                for tracked in removed {
                    trace!(pid = tracked.pid, name = %tracked.name, "Unscheduled process");
                }
            }
            TicketAction::Shutdown => {
                let found = self.take_matching(&ticket);
                if found.is_empty() {
                    debug!(
                        name = %ticket.name,
                        "No matching process found to reschedule for immediate shutdown"
                    );
                }
                let now = Instant::now();
                for mut tracked in found {
                    if !ticket.terminate_timeout.is_zero() {
                        tracked.terminate_timeout = ticket.terminate_timeout;
                    }
                    trace!(
                        pid = tracked.pid,
                        name = %tracked.name,
                        "Rescheduled process for immediate shutdown"
                    );
                    self.schedule.insert(now, tracked);
                }
            }
        }
    }

    fn take_matching(&mut self, ticket: &ProcessTicket) -> Vec<TrackedProcess> {
        self.schedule
            .take_where(|tracked| same_process(&tracked.process, &ticket.process))
    }

    fn fire(&mut self, mut tracked: TrackedProcess) {
        let plan = &self.plan;
        match panic::catch_unwind(AssertUnwindSafe(|| plan.escalate(&mut tracked))) {
            Ok(Outcome::Advanced(delay)) => {
                self.schedule.insert(deadline_after(Instant::now(), delay), tracked);
            }
            Ok(Outcome::Exited | Outcome::Destroyed) => {}
            Err(payload) => {
                // The entry is already off the schedule, so nothing else will reach it
                error!(
                    pid = tracked.pid,
                    name = %tracked.name,
                    "Failed to terminate process, destroying it"
                );
                let process = &tracked.process;
                let _ = panic::catch_unwind(AssertUnwindSafe(|| release(process.as_ref())));
                panic::resume_unwind(payload);
            }
        }
    }

    /// Enter shutdown mode and pull every deadline in.
    ///
    /// Processes not yet asked to terminate are due now, one stagger apart.
    /// Processes already escalating keep their deadline unless it lies beyond
    /// the shutdown terminate timeout. Every terminate timeout is capped.
    fn begin_shutdown(&mut self) {
        if self.shutting_down {
            return;
        }
        self.shutting_down = true;

        let cap = self.policy.terminate_timeout;
        let now = Instant::now();
        let latest = deadline_after(now, cap);
        let mut running = 0u32;
        for (deadline, mut tracked) in self.schedule.take_all() {
            tracked.terminate_timeout = tracked.terminate_timeout.min(cap);
            let deadline = if tracked.state.is_running() {
                let offset = self.policy.stagger.saturating_mul(running);
                running = running.saturating_add(1);
                deadline_after(now, offset)
            } else {
                deadline.min(latest)
            };
            self.schedule.insert(deadline, tracked);
        }
        if running > 0 {
            trace!(count = running, "Rescheduled processes for immediate shutdown");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{attempted_states, AttemptLog, FakeProcess, RecordingStep};
    use crate::domain::ProcessState;
    use crate::ports::{ProcessHandle, SharedProcess};
    use std::sync::mpsc::{self, Sender};
    use std::sync::Arc;

    const POLICY: ShutdownPolicy = ShutdownPolicy {
        terminate_timeout: Duration::from_millis(500),
        stagger: Duration::from_millis(1),
    };

    fn posix_like(log: &AttemptLog, succeeds: bool) -> EscalationPlan {
        EscalationPlan::new(
            vec![
                RecordingStep::boxed(ProcessState::SigTerm, succeeds, log),
                RecordingStep::boxed(ProcessState::SigKill, succeeds, log),
            ],
            Duration::from_millis(20),
        )
    }

    fn ticket(process: &SharedProcess, action: TicketAction, timeout_ms: u64, terminate_ms: u64) -> Message {
        Message::Ticket(ProcessTicket::new(
            Arc::clone(process),
            "proc",
            action,
            Duration::from_millis(timeout_ms),
            Duration::from_millis(terminate_ms),
        ))
    }

    fn spawn(plan: EscalationPlan) -> (Sender<Message>, thread::JoinHandle<WorkerExit>) {
        let (tx, rx) = mpsc::channel();
        let handle = thread::spawn(move || Worker::new(1, plan, POLICY).run(&rx));
        (tx, handle)
    }

    #[test]
    fn test_add_then_remove_never_attempts() {
        let log = AttemptLog::default();
        let mut worker = Worker::new(1, posix_like(&log, true), POLICY);
        let processes: Vec<SharedProcess> =
            (1..=10).map(|pid| FakeProcess::alive(pid).shared()).collect();

        for process in &processes {
            worker.handle(ticket(process, TicketAction::Add, 0, 100));
        }
        for process in processes.iter().rev() {
            worker.handle(ticket(process, TicketAction::Remove, 0, 0));
        }

        assert!(worker.schedule.is_empty());
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_add_without_pid_is_dropped() {
        let log = AttemptLog::default();
        let mut worker = Worker::new(1, posix_like(&log, true), POLICY);
        let process = FakeProcess::without_pid().shared();

        worker.handle(ticket(&process, TicketAction::Add, 0, 100));
        assert!(worker.schedule.is_empty());
    }

    #[test]
    fn test_shutdown_moves_deadline_and_overrides_timeout() {
        let log = AttemptLog::default();
        let mut worker = Worker::new(1, posix_like(&log, true), POLICY);
        let process = FakeProcess::alive(5).shared();

        worker.handle(ticket(&process, TicketAction::Add, 60_000, 100));
        let before = Instant::now();
        worker.handle(ticket(&process, TicketAction::Shutdown, 0, 2000));

        assert_eq!(worker.schedule.len(), 1);
        assert!(worker.schedule.next_deadline().unwrap() <= Instant::now());
        assert!(worker.schedule.next_deadline().unwrap() >= before);

        let tracked = worker.schedule.pop_due(Instant::now()).unwrap();
        assert_eq!(tracked.terminate_timeout, Duration::from_millis(2000));
    }

    #[test]
    fn test_shutdown_without_timeout_keeps_stored_one() {
        let log = AttemptLog::default();
        let mut worker = Worker::new(1, posix_like(&log, true), POLICY);
        let process = FakeProcess::alive(5).shared();

        worker.handle(ticket(&process, TicketAction::Add, 60_000, 300));
        worker.handle(ticket(&process, TicketAction::Shutdown, 0, 0));

        let tracked = worker.schedule.pop_due(Instant::now()).unwrap();
        assert_eq!(tracked.terminate_timeout, Duration::from_millis(300));
    }

    #[test]
    fn test_shutdown_of_untracked_process_is_ignored() {
        let log = AttemptLog::default();
        let mut worker = Worker::new(1, posix_like(&log, true), POLICY);
        let process = FakeProcess::alive(5).shared();

        worker.handle(ticket(&process, TicketAction::Shutdown, 0, 100));
        assert!(worker.schedule.is_empty());
    }

    #[test]
    fn test_begin_shutdown_collapses_running_only() {
        let log = AttemptLog::default();
        let mut worker = Worker::new(1, posix_like(&log, true), POLICY);

        for pid in 1..=3 {
            let process = FakeProcess::alive(pid).shared();
            worker.handle(ticket(&process, TicketAction::Add, 60_000, 5_000));
        }
        let escalated = FakeProcess::alive(9).shared();
        worker.handle(ticket(&escalated, TicketAction::Add, 0, 5_000));
        let due = worker.schedule.pop_due(Instant::now()).unwrap();
        worker.fire(due);
        assert_eq!(attempted_states(&log), vec![ProcessState::SigTerm]);

        worker.begin_shutdown();

        let soon = Instant::now() + Duration::from_millis(50);
        let mut collapsed = Vec::new();
        while let Some(tracked) = worker.schedule.pop_due(soon) {
            collapsed.push(tracked);
        }
        assert_eq!(collapsed.len(), 3);
        assert!(collapsed
            .iter()
            .all(|t| t.terminate_timeout == Duration::from_millis(500)));
        // The escalated process keeps escalating, within the shutdown cap
        assert_eq!(worker.schedule.len(), 1);
        let escalated = worker
            .schedule
            .pop_due(Instant::now() + Duration::from_millis(500))
            .unwrap();
        assert_eq!(escalated.terminate_timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_stop_of_other_generation_is_ignored() {
        let log = AttemptLog::default();
        let mut worker = Worker::new(2, posix_like(&log, true), POLICY);
        worker.handle(Message::Stop(1));
        assert!(!worker.shutting_down);
        worker.handle(Message::Stop(2));
        assert!(worker.shutting_down);
    }

    #[test]
    fn test_run_escalates_until_destroyed() {
        let log = AttemptLog::default();
        let (tx, handle) = spawn(posix_like(&log, true));
        let process = FakeProcess::alive(7);

        tx.send(ticket(&process.shared(), TicketAction::Add, 0, 20)).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while process.destroyed() == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(process.destroyed(), 1);
        assert_eq!(
            attempted_states(&log),
            vec![ProcessState::SigTerm, ProcessState::SigKill]
        );

        tx.send(Message::Stop(1)).unwrap();
        assert_eq!(handle.join().unwrap(), WorkerExit::Stopped);
    }

    #[test]
    fn test_stop_drains_schedule() {
        let log = AttemptLog::default();
        let (tx, handle) = spawn(posix_like(&log, false));
        let processes: Vec<Arc<FakeProcess>> = (1..=10).map(FakeProcess::alive).collect();

        for process in &processes {
            tx.send(ticket(&process.shared(), TicketAction::Add, 60_000, 60_000)).unwrap();
        }
        let start = Instant::now();
        tx.send(Message::Stop(1)).unwrap();
        assert_eq!(handle.join().unwrap(), WorkerExit::Stopped);

        assert!(start.elapsed() < Duration::from_secs(5));
        assert!(processes.iter().all(|p| p.destroyed() == 1));
        assert_eq!(log.lock().len(), 20);
    }

    #[test]
    fn test_dropped_sender_stops_worker() {
        let log = AttemptLog::default();
        let (tx, handle) = spawn(posix_like(&log, true));
        let process = FakeProcess::dead(3);
        tx.send(ticket(&process.shared(), TicketAction::Add, 60_000, 100)).unwrap();
        drop(tx);

        assert_eq!(handle.join().unwrap(), WorkerExit::Stopped);
        assert_eq!(process.destroyed(), 1);
        assert!(log.lock().is_empty());
    }

    struct Exploding {
        calls: std::sync::atomic::AtomicUsize,
    }

    impl ProcessHandle for Exploding {
        fn pid(&self) -> Option<u32> {
            Some(66)
        }

        fn is_alive(&self) -> bool {
            // First probe panics, later probes report the process gone
            let calls = self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if calls == 0 {
                panic!("probe failed");
            }
            false
        }

        fn close_streams(&self) {}

        fn destroy(&self) {}
    }

    #[test]
    fn test_fault_triggers_emergency_shutdown() {
        let log = AttemptLog::default();
        let (tx, handle) = spawn(posix_like(&log, true));

        let exploding: SharedProcess = Arc::new(Exploding {
            calls: std::sync::atomic::AtomicUsize::new(0),
        });
        let bystander = FakeProcess::alive(8);
        tx.send(ticket(&bystander.shared(), TicketAction::Add, 60_000, 60_000)).unwrap();
        tx.send(ticket(&exploding, TicketAction::Add, 0, 100)).unwrap();

        assert_eq!(handle.join().unwrap(), WorkerExit::Faulted);
        // The bystander was escalated instead of being abandoned
        assert_eq!(bystander.destroyed(), 1);
        assert_eq!(
            attempted_states(&log),
            vec![ProcessState::SigTerm, ProcessState::SigKill]
        );
    }

    fn add_ticket(process: &SharedProcess, timeout: Duration, terminate_timeout: Duration) -> Message {
        Message::Ticket(ProcessTicket::new(
            Arc::clone(process),
            "proc",
            TicketAction::Add,
            timeout,
            terminate_timeout,
        ))
    }

    #[test]
    fn test_never_timeout_is_scheduled_far_out() {
        let log = AttemptLog::default();
        let mut worker = Worker::new(1, posix_like(&log, true), POLICY);
        let process = FakeProcess::alive(4).shared();

        worker.handle(add_ticket(&process, Duration::MAX, Duration::from_millis(100)));

        let now = Instant::now();
        assert_eq!(worker.schedule.len(), 1);
        assert!(worker.schedule.next_deadline().unwrap() > now + Duration::from_secs(365 * 24 * 3600));
        assert!(worker.schedule.pop_due(now).is_none());
    }

    #[test]
    fn test_huge_terminate_timeout_reschedules_far_out() {
        let log = AttemptLog::default();
        let mut worker = Worker::new(1, posix_like(&log, true), POLICY);
        let process = FakeProcess::alive(4).shared();

        worker.handle(add_ticket(&process, Duration::ZERO, Duration::MAX));
        let due = worker.schedule.pop_due(Instant::now()).unwrap();
        worker.fire(due);

        assert_eq!(attempted_states(&log), vec![ProcessState::SigTerm]);
        assert!(worker.schedule.pop_due(Instant::now() + Duration::from_secs(3600)).is_none());

        // Shutting down pulls the far deadline in and caps the timeout
        worker.begin_shutdown();
        let latest = Instant::now() + POLICY.terminate_timeout;
        let tracked = worker.schedule.pop_due(latest).unwrap();
        assert_eq!(tracked.terminate_timeout, POLICY.terminate_timeout);
    }

    #[test]
    fn test_huge_stagger_saturates() {
        let log = AttemptLog::default();
        let policy = ShutdownPolicy {
            terminate_timeout: Duration::from_millis(500),
            stagger: Duration::MAX,
        };
        let mut worker = Worker::new(1, posix_like(&log, true), policy);
        for pid in 1..=3 {
            let process = FakeProcess::alive(pid).shared();
            worker.handle(add_ticket(&process, Duration::from_secs(60), Duration::from_secs(1)));
        }

        worker.begin_shutdown();

        assert_eq!(worker.schedule.len(), 3);
        assert!(worker.schedule.pop_due(Instant::now()).is_some());
        assert!(worker.schedule.pop_due(Instant::now() + Duration::from_secs(3600)).is_none());
    }

    #[test]
    fn test_never_timeout_leaves_others_alone() {
        let log = AttemptLog::default();
        let (tx, handle) = spawn(posix_like(&log, true));
        let bystander = FakeProcess::alive(1);
        let forever = FakeProcess::alive(2);

        tx.send(add_ticket(&bystander.shared(), Duration::from_secs(3600), Duration::from_millis(100)))
            .unwrap();
        tx.send(add_ticket(&forever.shared(), Duration::MAX, Duration::MAX)).unwrap();

        thread::sleep(Duration::from_millis(100));
        assert!(!handle.is_finished());
        assert!(log.lock().is_empty());
        assert_eq!(bystander.destroyed(), 0);

        forever.set_alive(false);
        bystander.set_alive(false);
        tx.send(Message::Stop(1)).unwrap();
        assert_eq!(handle.join().unwrap(), WorkerExit::Stopped);
    }

    struct AlwaysPanics {
        destroyed: std::sync::atomic::AtomicUsize,
    }

    impl ProcessHandle for AlwaysPanics {
        fn pid(&self) -> Option<u32> {
            Some(77)
        }

        fn is_alive(&self) -> bool {
            panic!("probe failed");
        }

        fn close_streams(&self) {}

        fn destroy(&self) {
            self.destroyed.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }
    }

    #[test]
    fn test_faulting_process_is_destroyed() {
        let log = AttemptLog::default();
        let (tx, handle) = spawn(posix_like(&log, true));

        let faulty = Arc::new(AlwaysPanics {
            destroyed: std::sync::atomic::AtomicUsize::new(0),
        });
        let shared: SharedProcess = faulty.clone();
        tx.send(ticket(&shared, TicketAction::Add, 0, 100)).unwrap();

        assert_eq!(handle.join().unwrap(), WorkerExit::Faulted);
        assert_eq!(faulty.destroyed.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert!(log.lock().is_empty());
    }
}

