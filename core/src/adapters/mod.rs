//! Adapters layer - External system implementations.
//!
//! This module contains implementations of the port traits defined in `ports`.
//! Each adapter handles communication with the operating system.

mod child;
mod pid;
pub mod probe;
pub mod terminator;

// Re-export main types for convenience
pub use child::ChildProcess;
pub use pid::PidProcess;
pub use terminator::platform_steps;
