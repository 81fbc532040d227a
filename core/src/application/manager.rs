//! Public facade of the process lifecycle manager.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, error, warn};

use super::escalation::EscalationPlan;
use super::tracked::{ProcessTicket, TicketAction};
use super::worker::{Message, ShutdownPolicy, Worker, WorkerExit};
use crate::config::TerminatorConfig;
use crate::error::{Error, Result};
use crate::ports::SharedProcess;

type PlanFactory = Box<dyn Fn() -> Result<EscalationPlan> + Send + Sync>;

/// A running terminator thread.
struct Terminator {
    generation: u64,
    handle: JoinHandle<WorkerExit>,
}

#[derive(Default)]
struct TerminatorSlot {
    current: Option<Terminator>,
    next_generation: u64,
}

/// Keeps track of external processes and makes sure they are terminated.
///
/// Callers hand over processes with a timeout. When the timeout expires, or
/// when [`shutdown_process`](Self::shutdown_process) is called, a dedicated
/// terminator thread escalates through the platform's termination techniques
/// until the process is gone. None of the tracking calls block beyond queuing
/// a ticket.
///
/// # Usage Pattern
/// ```no_run
/// use std::process::Command;
/// use std::time::Duration;
/// use dms_procman_core::{ChildProcess, ProcessManager, TerminatorConfig};
///
/// # fn example() -> dms_procman_core::Result<()> {
/// let manager = ProcessManager::new(TerminatorConfig::default())?;
/// manager.start()?;
///
/// let ffmpeg = ChildProcess::spawn(Command::new("ffmpeg").arg("-version"))?;
/// manager.add_process(ffmpeg.clone(), "ffmpeg", Duration::from_secs(30), Duration::from_secs(2))?;
/// // ... once ffmpeg exited on its own:
/// manager.remove_process(ffmpeg, "ffmpeg");
///
/// manager.stop()?;
/// # Ok(())
/// # }
/// ```
pub struct ProcessManager {
    sender: Sender<Message>,
    inbox: Arc<Mutex<Receiver<Message>>>,
    terminator: Mutex<TerminatorSlot>,
    plan_factory: PlanFactory,
    policy: ShutdownPolicy,
    min_terminate_timeout: Duration,
}

impl ProcessManager {
    /// Create a stopped manager using the platform's termination techniques.
    pub fn new(config: TerminatorConfig) -> Result<Self> {
        config.validate()?;
        // Surface plan errors here rather than on start
        EscalationPlan::for_platform(&config)?;

        let plan_config = config.clone();
        Ok(Self::with_factory(
            &config,
            Box::new(move || EscalationPlan::for_platform(&plan_config)),
        ))
    }

    /// Create a stopped manager with a custom escalation plan.
    ///
    /// The factory is called on every [`start`](Self::start).
    pub fn with_plan<F>(config: &TerminatorConfig, factory: F) -> Self
    where
        F: Fn() -> EscalationPlan + Send + Sync + 'static,
    {
        Self::with_factory(config, Box::new(move || Ok(factory())))
    }

    fn with_factory(config: &TerminatorConfig, plan_factory: PlanFactory) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender,
            inbox: Arc::new(Mutex::new(receiver)),
            terminator: Mutex::new(TerminatorSlot::default()),
            plan_factory,
            policy: ShutdownPolicy {
                terminate_timeout: config.shutdown_terminate_timeout(),
                stagger: config.shutdown_stagger(),
            },
            min_terminate_timeout: config.min_terminate_timeout(),
        }
    }

    /// Start the terminator thread. Does nothing if it is already running.
    ///
    /// Tickets queued while no terminator was running are processed now.
    pub fn start(&self) -> Result<()> {
        let mut slot = self.terminator.lock();
        if let Some(terminator) = slot.current.take() {
            if !terminator.handle.is_finished() {
                warn!("Process manager is already running, start attempt ignored");
                slot.current = Some(terminator);
                return Ok(());
            }
            if !matches!(terminator.handle.join(), Ok(WorkerExit::Stopped)) {
                warn!("Previous process terminator died unexpectedly, restarting it");
            }
        }

        let plan = (self.plan_factory)()?;
        let generation = slot.next_generation;
        slot.next_generation += 1;

        let inbox = Arc::clone(&self.inbox);
        let policy = self.policy;
        let handle = thread::Builder::new()
            .name("process-terminator".to_string())
            .spawn(move || {
                let inbox = inbox.lock();
                Worker::new(generation, plan, policy).run(&inbox)
            })
            .map_err(Error::WorkerSpawn)?;

        debug!(generation = generation, "Started process manager");
        slot.current = Some(Terminator { generation, handle });
        Ok(())
    }

    /// Stop the terminator thread, terminating every managed process first.
    ///
    /// Processes that haven't been asked to terminate yet are scheduled
    /// immediately, with their terminate timeout capped. Blocks until all of
    /// them are handled. Does nothing if the manager isn't running.
    ///
    /// Returns [`Error::WorkerDied`] if the terminator had died on its own.
    pub fn stop(&self) -> Result<()> {
        let Some(terminator) = self.terminator.lock().current.take() else {
            return Ok(());
        };

        debug!(generation = terminator.generation, "Stopping process manager");
        // Fails only if the terminator is gone, which join reports below
        let _ = self.sender.send(Message::Stop(terminator.generation));

        match terminator.handle.join() {
            Ok(WorkerExit::Stopped) => Ok(()),
            Ok(WorkerExit::Faulted) | Err(_) => {
                warn!("Process terminator had died before it was stopped");
                Err(Error::WorkerDied)
            }
        }
    }

    /// Whether a terminator thread is currently processing tickets.
    pub fn is_running(&self) -> bool {
        self.terminator
            .lock()
            .current
            .as_ref()
            .map_or(false, |terminator| !terminator.handle.is_finished())
    }

    /// Manage a process, starting its termination once `timeout` expires.
    ///
    /// `terminate_timeout` is the time each termination technique is given to
    /// take effect, and is raised to the configured minimum. `Duration::MAX`
    /// works as a timeout that never expires. Fails, without managing the
    /// process, if the name is empty or its PID can't be resolved.
    pub fn add_process(
        &self,
        process: SharedProcess,
        name: &str,
        timeout: Duration,
        terminate_timeout: Duration,
    ) -> Result<()> {
        if name.is_empty() {
            error!("Process handed over without a name, the process will not be managed");
            return Err(Error::EmptyName);
        }
        if !matches!(process.pid(), Some(pid) if pid != 0) {
            error!(name = name, "Could not resolve process id, the process will not be managed");
            return Err(Error::PidUnavailable {
                name: name.to_string(),
            });
        }

        self.enqueue(ProcessTicket::new(
            process,
            name,
            TicketAction::Add,
            timeout,
            terminate_timeout.max(self.min_terminate_timeout),
        ));
        Ok(())
    }

    /// Start terminating a managed process now, keeping its terminate timeout.
    pub fn shutdown_process(&self, process: SharedProcess, name: &str) {
        self.shutdown_process_with_timeout(process, name, Duration::ZERO);
    }

    /// Start terminating a managed process now.
    ///
    /// A non-zero `terminate_timeout` replaces the one given when the process
    /// was added. Processes that aren't managed are left alone.
    pub fn shutdown_process_with_timeout(
        &self,
        process: SharedProcess,
        name: &str,
        terminate_timeout: Duration,
    ) {
        self.enqueue(ProcessTicket::new(
            process,
            name,
            TicketAction::Shutdown,
            Duration::ZERO,
            terminate_timeout,
        ));
    }

    /// Stop managing a process without touching it.
    ///
    /// The caller becomes responsible for the process again.
    pub fn remove_process(&self, process: SharedProcess, name: &str) {
        self.enqueue(ProcessTicket::new(
            process,
            name,
            TicketAction::Remove,
            Duration::ZERO,
            Duration::ZERO,
        ));
    }

    fn enqueue(&self, ticket: ProcessTicket) {
        if !self.is_running() {
            warn!(%ticket, "Ticket queued while no process terminator is processing tickets");
        }
        if self.sender.send(Message::Ticket(ticket)).is_err() {
            // The receiver lives as long as the manager itself
            error!("Process manager ticket queue is closed");
        }
    }
}

impl Drop for ProcessManager {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            debug!(error = %e, "Process manager stopped with an error");
        }
    }
}
