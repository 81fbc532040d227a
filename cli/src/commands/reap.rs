//! Reap command - terminate a running process by PID.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use dms_procman_core::{
    EscalationPlan, PidProcess, ProcessHandle, ProcessManager, TerminationTarget, TerminatorConfig,
};

use super::POLL_INTERVAL;

pub async fn run(
    config: TerminatorConfig,
    pid: u32,
    name: Option<String>,
    terminate_timeout: Duration,
) -> Result<()> {
    let process = Arc::new(PidProcess::new(pid)?);
    let name = name.unwrap_or_else(|| format!("pid {}", pid));

    // Every technique gets its terminate timeout, plus slack for the last check
    let steps = EscalationPlan::for_platform(&config)?.len() as u32;
    let per_step = terminate_timeout
        .max(config.min_terminate_timeout())
        .max(config.final_step_min_timeout());
    let bound = per_step
        .saturating_mul(steps + 1)
        .saturating_add(Duration::from_secs(1));
    // Too far out to represent means waiting for as long as it takes
    let deadline = Instant::now().checked_add(bound);

    let manager = ProcessManager::new(config)?;
    manager.start()?;
    manager.add_process(process.clone(), &name, Duration::ZERO, terminate_timeout)?;

    while process.is_alive() && deadline.map_or(true, |deadline| Instant::now() < deadline) {
        tokio::time::sleep(POLL_INTERVAL).await;
    }
    manager.stop()?;

    let target = TerminationTarget::new(pid, &name);
    if process.is_alive() {
        bail!("{} survived every termination attempt", target);
    }
    println!("Terminated {}", target);
    Ok(())
}
