//! Process handle port (interface).

use std::sync::Arc;

/// Capabilities of an external process as supplied by whoever launched it.
///
/// Implementations must be callable from the terminator thread while the
/// launching code keeps its own reference, so every method takes `&self`.
pub trait ProcessHandle: Send + Sync {
    /// The OS process id, or `None` if it cannot be determined.
    fn pid(&self) -> Option<u32>;

    /// Check if the process is still running.
    fn is_alive(&self) -> bool;

    /// Close any pipes attached to the process.
    fn close_streams(&self);

    /// Unconditionally destroy the process.
    fn destroy(&self);
}

/// A process handle shared between its owner and the process manager.
pub type SharedProcess = Arc<dyn ProcessHandle>;

/// Whether two shared handles refer to the same process object.
///
/// Compares the allocation only; two handles wrapping the same PID are still
/// distinct unless they are clones of one `Arc`.
pub fn same_process(a: &SharedProcess, b: &SharedProcess) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// Close the streams of a process and destroy it.
pub fn release(process: &dyn ProcessHandle) {
    process.close_streams();
    process.destroy();
}
