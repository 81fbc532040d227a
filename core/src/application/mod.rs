//! Application layer - Process lifecycle orchestration.
//!
//! [`ProcessManager`] is the entry point. It queues tickets for a single
//! terminator thread, which owns the [`Schedule`] of tracked processes and
//! drives each one through an [`EscalationPlan`] when its deadline fires.

mod escalation;
mod manager;
mod schedule;
mod tracked;
mod worker;

#[cfg(test)]
mod testing;

pub use escalation::{EscalationPlan, Outcome};
pub use manager::ProcessManager;
pub use schedule::Schedule;
pub use tracked::{ProcessTicket, TicketAction, TrackedProcess};
pub use worker::ShutdownPolicy;
