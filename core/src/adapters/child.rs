//! Process handle adapter for children spawned with `std::process`.

use std::io;
use std::process::{Child, Command, ExitStatus};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::error::Result;
use crate::ports::ProcessHandle;

/// A spawned child process that can be handed to the process manager.
///
/// The child is kept behind a lock so the launching code can keep waiting for
/// it while the terminator probes and, if needed, destroys it.
#[derive(Debug)]
pub struct ChildProcess {
    pid: u32,
    child: Mutex<Child>,
}

impl ChildProcess {
    /// Wrap an already spawned child.
    pub fn new(child: Child) -> Self {
        Self {
            pid: child.id(),
            child: Mutex::new(child),
        }
    }

    /// Spawn a command and wrap the resulting child.
    ///
    /// Spawn failures are reported as [`Error::Io`](crate::Error::Io).
    pub fn spawn(command: &mut Command) -> Result<Arc<Self>> {
        let child = command.spawn()?;
        trace!(pid = child.id(), "Spawned child process");
        Ok(Arc::new(Self::new(child)))
    }

    /// The exit status if the child has exited, without blocking.
    pub fn try_wait(&self) -> io::Result<Option<ExitStatus>> {
        self.child.lock().try_wait()
    }

    /// Run a closure with exclusive access to the underlying child.
    pub fn with_child<R>(&self, f: impl FnOnce(&mut Child) -> R) -> R {
        f(&mut self.child.lock())
    }
}

impl ProcessHandle for ChildProcess {
    fn pid(&self) -> Option<u32> {
        (self.pid != 0).then_some(self.pid)
    }

    fn is_alive(&self) -> bool {
        // An error means the status can't be queried anymore, treat as gone
        matches!(self.child.lock().try_wait(), Ok(None))
    }

    fn close_streams(&self) {
        let mut child = self.child.lock();
        drop(child.stdin.take());
        drop(child.stdout.take());
        drop(child.stderr.take());
    }

    fn destroy(&self) {
        let mut child = self.child.lock();
        if let Err(e) = child.kill() {
            trace!(pid = self.pid, error = %e, "Kill of child process failed");
        }
        // Reap if already gone, never block the caller
        let _ = child.try_wait();
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::Stdio;
    use std::thread;
    use std::time::{Duration, Instant};

    fn sleeper(secs: &str) -> Arc<ChildProcess> {
        ChildProcess::spawn(
            Command::new("sleep")
                .arg(secs)
                .stdin(Stdio::piped())
                .stdout(Stdio::piped()),
        )
        .unwrap()
    }

    fn wait_dead(process: &ChildProcess) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if !process.is_alive() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn test_pid_and_liveness() {
        let process = sleeper("30");
        assert!(process.pid().is_some());
        assert!(process.is_alive());

        process.destroy();
        assert!(wait_dead(&process));
    }

    #[test]
    fn test_close_streams() {
        let process = sleeper("30");
        process.close_streams();
        process.with_child(|child| {
            assert!(child.stdin.is_none());
            assert!(child.stdout.is_none());
        });
        process.destroy();
        assert!(wait_dead(&process));
    }

    #[test]
    fn test_exited_child_is_not_alive() {
        let process = ChildProcess::spawn(&mut Command::new("true")).unwrap();
        assert!(wait_dead(&process));
        assert!(process.try_wait().unwrap().is_some());
    }

    #[test]
    fn test_spawn_failure_is_io_error() {
        let result = ChildProcess::spawn(&mut Command::new("/nonexistent/dms-transcoder"));
        assert!(matches!(result, Err(crate::Error::Io(_))));
    }
}
