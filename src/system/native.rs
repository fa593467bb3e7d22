//! Win32 backend for the `WindowSystem` boundary. Process identity comes
//! from sysinfo; window operations go straight to user32.

use std::path::PathBuf;

use log::warn;
use windows::Win32::Foundation::{CloseHandle, HWND, LPARAM};
use windows::Win32::System::Threading::{OpenProcess, TerminateProcess, PROCESS_TERMINATE};
use windows::Win32::UI::WindowsAndMessaging::{
    BringWindowToTop, EnumWindows, GetForegroundWindow, GetWindowRect,
    GetWindowThreadProcessId, IsWindow, IsWindowVisible, SetForegroundWindow,
};

use super::processes::ProcessTable;
use super::{ProcessId, ProcessInfo, Rect, WindowHandle, WindowSystem};

pub struct NativeSystem {
    processes: ProcessTable,
}

impl NativeSystem {
    pub fn new() -> Self {
        Self {
            processes: ProcessTable::new(),
        }
    }
}

impl Default for NativeSystem {
    fn default() -> Self {
        Self::new()
    }
}

fn to_hwnd(window: WindowHandle) -> HWND {
    HWND(window.0 as *mut core::ffi::c_void)
}

struct EnumState {
    pid: ProcessId,
    windows: Vec<WindowHandle>,
}

unsafe extern "system" fn collect_windows_for_pid(
    hwnd: HWND,
    lparam: LPARAM,
) -> windows::Win32::Foundation::BOOL {
    let state = &mut *(lparam.0 as *mut EnumState);

    let mut owner_pid: u32 = 0;
    GetWindowThreadProcessId(hwnd, Some(&mut owner_pid));
    if owner_pid == state.pid {
        state.windows.push(WindowHandle(hwnd.0 as isize));
    }

    true.into()
}

impl WindowSystem for NativeSystem {
    fn snapshot_processes(&self) -> Vec<ProcessInfo> {
        self.processes.snapshot()
    }

    fn executable_path(&self, pid: ProcessId) -> Option<PathBuf> {
        self.processes.executable_path(pid)
    }

    fn top_level_windows(&self, pid: ProcessId) -> Vec<WindowHandle> {
        let mut state = EnumState {
            pid,
            windows: Vec::new(),
        };

        let result = unsafe {
            EnumWindows(
                Some(collect_windows_for_pid),
                LPARAM(&mut state as *mut EnumState as isize),
            )
        };
        if let Err(err) = result {
            warn!("EnumWindows failed: {err}");
            return Vec::new();
        }

        state.windows
    }

    fn window_exists(&self, window: WindowHandle) -> bool {
        unsafe { IsWindow(to_hwnd(window)).as_bool() }
    }

    fn window_is_visible(&self, window: WindowHandle) -> bool {
        unsafe { IsWindowVisible(to_hwnd(window)).as_bool() }
    }

    fn window_rect(&self, window: WindowHandle) -> Option<Rect> {
        let mut rect = windows::Win32::Foundation::RECT::default();
        unsafe { GetWindowRect(to_hwnd(window), &mut rect) }.ok()?;
        Some(Rect {
            x: rect.left,
            y: rect.top,
            width: rect.right - rect.left,
            height: rect.bottom - rect.top,
        })
    }

    fn foreground_window(&self) -> Option<WindowHandle> {
        let hwnd = unsafe { GetForegroundWindow() };
        if hwnd.is_invalid() {
            None
        } else {
            Some(WindowHandle(hwnd.0 as isize))
        }
    }

    fn terminate_window_owner(&self, window: WindowHandle) -> bool {
        let mut owner_pid: u32 = 0;
        unsafe { GetWindowThreadProcessId(to_hwnd(window), Some(&mut owner_pid)) };
        if owner_pid == 0 {
            return false;
        }

        let handle = match unsafe { OpenProcess(PROCESS_TERMINATE, false, owner_pid) } {
            Ok(handle) => handle,
            Err(err) => {
                warn!("OpenProcess({owner_pid}) for termination failed: {err}");
                return false;
            }
        };

        let terminated = unsafe { TerminateProcess(handle, 0) };
        if let Err(err) = &terminated {
            warn!("TerminateProcess({owner_pid}) failed: {err}");
        }
        let _ = unsafe { CloseHandle(handle) };

        terminated.is_ok()
    }
}

/// Raises a native window above its target; used by Win32 overlay surfaces.
pub fn bring_to_foreground(window: WindowHandle) {
    unsafe {
        let hwnd = to_hwnd(window);
        let _ = BringWindowToTop(hwnd);
        let _ = SetForegroundWindow(hwnd);
    }
}
