//! Ports layer - Trait definitions (interfaces).
//!
//! The application layer only talks to processes and to the operating
//! system through these traits. Implementations live in `adapters`.

mod handle;
mod step;

pub use handle::{release, same_process, ProcessHandle, SharedProcess};
pub use step::TerminationStep;
