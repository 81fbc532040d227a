//! Platform termination steps.
//!
//! The order of the returned steps is the escalation order.

mod helper;
#[cfg(unix)]
mod posix;
#[cfg(windows)]
mod windows;

pub use helper::{run_helper, CtrlEventStep, TaskKillStep};
#[cfg(unix)]
pub use posix::{send_signal, SignalStep};
#[cfg(windows)]
pub use windows::{TerminateProcessStep, WmCloseStep};

use crate::config::TerminatorConfig;
use crate::error::Result;
use crate::ports::TerminationStep;

/// Termination steps for the current platform, least forceful first.
#[cfg(windows)]
pub fn platform_steps(config: &TerminatorConfig) -> Result<Vec<Box<dyn TerminationStep>>> {
    use crate::config::CTRL_C_EVENT;

    Ok(vec![
        Box::new(WmCloseStep),
        Box::new(CtrlEventStep::new(
            config.ctrl_sender.clone(),
            CTRL_C_EVENT,
            config.helper_timeout(),
        )),
        Box::new(TaskKillStep::new(
            config.resolve_task_kill(),
            config.helper_timeout(),
        )),
        Box::new(TerminateProcessStep),
    ])
}

/// Termination steps for the current platform, least forceful first.
#[cfg(unix)]
pub fn platform_steps(config: &TerminatorConfig) -> Result<Vec<Box<dyn TerminationStep>>> {
    Ok(vec![
        Box::new(SignalStep::term()),
        Box::new(SignalStep::alarm(config.transcoder_pattern()?)),
        Box::new(SignalStep::kill()),
    ])
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::domain::{ProcessState, TerminationTarget};

    #[test]
    fn test_posix_order() {
        let steps = platform_steps(&TerminatorConfig::default()).unwrap();
        let states: Vec<_> = steps.iter().map(|s| s.state()).collect();
        assert_eq!(
            states,
            vec![ProcessState::SigTerm, ProcessState::SigAlrm, ProcessState::SigKill]
        );

        let ffmpeg = TerminationTarget::new(1, "ffmpeg");
        assert!(!steps[1].applies_to(&ffmpeg));
        assert!(steps[1].applies_to(&TerminationTarget::new(1, "mplayer")));
    }
}
