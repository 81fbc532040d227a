//! DMS Process Manager Core Library
//!
//! Lifecycle management for external processes spawned by a media server,
//! such as transcoders. Provides functionality to:
//! - Track processes with a maximum allowed run time
//! - Terminate them on demand or when their time runs out
//! - Escalate from polite termination requests to forced kills
//! - Terminate every tracked process when the manager is stopped
//!
//! # Architecture
//! This library follows hexagonal architecture (ports & adapters):
//! - `domain`: Pure data describing managed processes
//! - `ports`: Trait definitions (interfaces)
//! - `adapters`: Operating system implementations
//! - `application`: The process manager and its terminator thread
//!
//! # Platform Support
//! - Unix: `SIGTERM`, then `SIGALRM` for interactive transcoders, then `SIGKILL`
//! - Windows: `WM_CLOSE`, console `CTRL_C`, `taskkill`, then `TerminateProcess`

// Hexagonal architecture layers
pub mod domain;
pub mod ports;
pub mod adapters;
pub mod application;

pub mod config;
pub mod error;

// Re-export domain types (primary API)
pub use domain::{PosixSignal, ProcessState, TerminationTarget};

// Re-export other commonly used types
pub use adapters::{ChildProcess, PidProcess};
pub use application::{EscalationPlan, ProcessManager, ShutdownPolicy};
pub use config::{ConfigStore, TerminatorConfig};
pub use error::{Error, Result};
pub use ports::{ProcessHandle, SharedProcess, TerminationStep};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
