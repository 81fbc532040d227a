//! Domain layer - Pure data describing managed processes.
//!
//! These types have no I/O dependencies and can be tested in isolation.

mod signal;
mod state;
mod target;

// Re-export all domain types
pub use signal::PosixSignal;
pub use state::ProcessState;
pub use target::TerminationTarget;
