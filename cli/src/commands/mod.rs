//! CLI subcommands.

pub mod config;
pub mod reap;
pub mod run;

use std::time::Duration;

/// How often commands check on the processes they wait for.
const POLL_INTERVAL: Duration = Duration::from_millis(50);
