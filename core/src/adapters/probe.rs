//! PID liveness probing and last-resort killing by PID.
//!
//! Used for processes the manager only knows by PID. Handles that wrap a
//! [`std::process::Child`] should prefer the child's own accessors.

use tracing::trace;

/// Check whether a process with this PID currently exists.
#[cfg(unix)]
pub fn pid_is_alive(pid: u32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let raw = match i32::try_from(pid) {
        Ok(raw) if raw > 0 => raw,
        _ => return false,
    };

    // Signal 0 performs the permission and existence checks only
    match kill(Pid::from_raw(raw), None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(e) => {
            trace!(pid = pid, error = %e, "Process probe failed");
            false
        }
    }
}

/// Check whether a process with this PID currently exists.
#[cfg(windows)]
pub fn pid_is_alive(pid: u32) -> bool {
    use windows::Win32::Foundation::{CloseHandle, STILL_ACTIVE};
    use windows::Win32::System::Threading::{
        GetExitCodeProcess, OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION,
    };

    if pid == 0 {
        return false;
    }

    unsafe {
        let handle = match OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid) {
            Ok(h) if !h.is_invalid() => h,
            _ => {
                trace!(pid = pid, "Failed to open process for probing");
                return false;
            }
        };
        let mut exit_code = 0u32;
        let queried = GetExitCodeProcess(handle, &mut exit_code).is_ok();
        let _ = CloseHandle(handle);
        queried && exit_code == STILL_ACTIVE.0 as u32
    }
}

/// Forcefully kill a process by PID (SIGKILL on Unix, TerminateProcess on Windows).
#[cfg(unix)]
pub fn force_kill(pid: u32) -> bool {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let raw = match i32::try_from(pid) {
        Ok(raw) if raw > 0 => raw,
        _ => return false,
    };

    match kill(Pid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) => true,
        Err(e) => {
            trace!(pid = pid, error = %e, "SIGKILL failed");
            false
        }
    }
}

/// Forcefully kill a process by PID (SIGKILL on Unix, TerminateProcess on Windows).
#[cfg(windows)]
pub fn force_kill(pid: u32) -> bool {
    use windows::Win32::Foundation::CloseHandle;
    use windows::Win32::System::Threading::{OpenProcess, TerminateProcess, PROCESS_TERMINATE};

    if pid == 0 {
        return false;
    }

    unsafe {
        let handle = match OpenProcess(PROCESS_TERMINATE, false, pid) {
            Ok(h) if !h.is_invalid() => h,
            _ => {
                trace!(pid = pid, "Failed to get Windows handle for TerminateProcess");
                return false;
            }
        };

        let result = TerminateProcess(handle, 1);
        let _ = CloseHandle(handle);

        match result {
            Ok(()) => true,
            Err(e) => {
                trace!(pid = pid, error = %e, "TerminateProcess failed");
                false
            }
        }
    }
}
