//! Run command - run a program with a maximum run time.

use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result};
use dms_procman_core::{ChildProcess, ProcessManager, TerminatorConfig};
use tracing::info;

use super::POLL_INTERVAL;

pub async fn run(
    config: TerminatorConfig,
    name: Option<String>,
    timeout: Duration,
    terminate_timeout: Duration,
    command: Vec<String>,
) -> Result<()> {
    let (program, args) = command.split_first().context("No program given")?;
    let name = name.unwrap_or_else(|| program.clone());

    let manager = ProcessManager::new(config)?;
    manager.start()?;

    let child = ChildProcess::spawn(Command::new(program).args(args))
        .with_context(|| format!("Failed to start {}", program))?;
    manager.add_process(child.clone(), &name, timeout, terminate_timeout)?;
    info!(name = %name, timeout_ms = timeout.as_millis() as u64, "Started program");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    let status = loop {
        tokio::select! {
            _ = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                info!(name = %name, "Interrupted, terminating program");
                manager.shutdown_process(child.clone(), &name);
            }
            _ = tokio::time::sleep(POLL_INTERVAL) => {
                if let Some(status) = child.try_wait()? {
                    break status;
                }
            }
        }
    };

    // It exited; whatever the terminator still has scheduled is moot
    manager.remove_process(child, &name);
    manager.stop()?;

    info!(name = %name, status = %status, "Program has exited");
    if !status.success() {
        std::process::exit(status.code().unwrap_or(1));
    }
    Ok(())
}
