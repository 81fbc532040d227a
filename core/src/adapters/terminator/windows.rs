//! Windows termination steps: WM_CLOSE and TerminateProcess.
//!
//! The helper-based steps in between (Ctrl+C, taskkill) live in `helper`.

use windows::Win32::Foundation::{CloseHandle, BOOL, HWND, LPARAM, TRUE, WPARAM};
use windows::Win32::System::Threading::{OpenProcess, PROCESS_SYNCHRONIZE, PROCESS_TERMINATE};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetWindowThreadProcessId, PostMessageW, WM_CLOSE,
};
use tracing::trace;

use crate::adapters::probe;
use crate::domain::{ProcessState, TerminationTarget};
use crate::ports::TerminationStep;

/// State shared with the `EnumWindows` callback.
struct CloseRequest {
    pid: u32,
    posted: bool,
}

unsafe extern "system" fn close_windows_of(hwnd: HWND, lparam: LPARAM) -> BOOL {
    let request = &mut *(lparam.0 as *mut CloseRequest);
    let mut owner = 0u32;
    GetWindowThreadProcessId(hwnd, Some(&mut owner as *mut u32));
    if owner == request.pid && PostMessageW(hwnd, WM_CLOSE, WPARAM(0), LPARAM(0)).is_ok() {
        request.posted = true;
    }
    TRUE
}

/// Posts `WM_CLOSE` to every top-level window owned by the process.
///
/// Equivalent to SIGTERM for GUI programs. Fails when the process owns no
/// windows, which is the normal case for console transcoders.
#[derive(Debug, Clone, Copy, Default)]
pub struct WmCloseStep;

impl TerminationStep for WmCloseStep {
    fn state(&self) -> ProcessState {
        ProcessState::WmClosed
    }

    fn attempt(&self, target: &TerminationTarget<'_>) -> bool {
        trace!(pid = target.pid, name = target.name, "Attempting to stop process with WM_CLOSE");

        unsafe {
            let handle = match OpenProcess(PROCESS_SYNCHRONIZE | PROCESS_TERMINATE, false, target.pid) {
                Ok(h) if !h.is_invalid() => h,
                _ => {
                    trace!(
                        pid = target.pid,
                        name = target.name,
                        "Failed to get Windows handle during WM_CLOSE"
                    );
                    return false;
                }
            };

            let mut request = CloseRequest {
                pid: target.pid,
                posted: false,
            };
            let _ = EnumWindows(
                Some(close_windows_of),
                LPARAM(&mut request as *mut CloseRequest as isize),
            );
            let _ = CloseHandle(handle);

            if request.posted {
                trace!(pid = target.pid, name = target.name, "WM_CLOSE sent with PostMessage");
            } else {
                trace!(
                    pid = target.pid,
                    name = target.name,
                    "Can't find any windows belonging to process, unable to send WM_CLOSE"
                );
            }
            request.posted
        }
    }
}

/// Calls `TerminateProcess`. Equivalent to SIGKILL.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminateProcessStep;

impl TerminationStep for TerminateProcessStep {
    fn state(&self) -> ProcessState {
        ProcessState::TerminateProcessCalled
    }

    fn attempt(&self, target: &TerminationTarget<'_>) -> bool {
        trace!(pid = target.pid, name = target.name, "Attempting to stop process with TerminateProcess");
        let result = probe::force_kill(target.pid);
        if result {
            trace!(pid = target.pid, name = target.name, "TerminateProcess performed");
        }
        result
    }
}
