//! In-memory `WindowSystem`/`OverlaySurface` fakes shared by engine,
//! controller, overlay, and host tests.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use super::{OverlaySurface, ProcessId, ProcessInfo, Rect, WindowHandle, WindowSystem};

#[derive(Default)]
struct FakeState {
    processes: Vec<ProcessInfo>,
    exe_paths: HashMap<ProcessId, PathBuf>,
    windows: HashMap<WindowHandle, ProcessId>,
    hidden: HashMap<WindowHandle, bool>,
    rects: HashMap<WindowHandle, Rect>,
    foreground: Option<WindowHandle>,
    terminated: Vec<ProcessId>,
    fail_snapshot: bool,
    fail_terminate: bool,
}

#[derive(Default)]
pub struct FakeSystem {
    state: Mutex<FakeState>,
}

impl FakeSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_process(&self, pid: ProcessId, name: &str, exe: Option<&str>) {
        let mut state = self.state.lock().unwrap();
        state.processes.push(ProcessInfo {
            pid,
            name: name.to_string(),
        });
        if let Some(exe) = exe {
            state.exe_paths.insert(pid, PathBuf::from(exe));
        }
    }

    pub fn add_window(&self, pid: ProcessId, window: WindowHandle) {
        let mut state = self.state.lock().unwrap();
        state.windows.insert(window, pid);
        state.rects.insert(
            window,
            Rect {
                x: 0,
                y: 0,
                width: 800,
                height: 600,
            },
        );
    }

    pub fn remove_window(&self, window: WindowHandle) {
        let mut state = self.state.lock().unwrap();
        state.windows.remove(&window);
        state.rects.remove(&window);
        state.hidden.remove(&window);
        if state.foreground == Some(window) {
            state.foreground = None;
        }
    }

    pub fn set_window_hidden(&self, window: WindowHandle, hidden: bool) {
        self.state.lock().unwrap().hidden.insert(window, hidden);
    }

    pub fn set_window_rect(&self, window: WindowHandle, rect: Rect) {
        self.state.lock().unwrap().rects.insert(window, rect);
    }

    pub fn set_foreground(&self, window: Option<WindowHandle>) {
        self.state.lock().unwrap().foreground = window;
    }

    pub fn set_snapshot_failure(&self, fail: bool) {
        self.state.lock().unwrap().fail_snapshot = fail;
    }

    pub fn set_terminate_failure(&self, fail: bool) {
        self.state.lock().unwrap().fail_terminate = fail;
    }

    pub fn terminated_pids(&self) -> Vec<ProcessId> {
        self.state.lock().unwrap().terminated.clone()
    }
}

impl WindowSystem for FakeSystem {
    fn snapshot_processes(&self) -> Vec<ProcessInfo> {
        let state = self.state.lock().unwrap();
        if state.fail_snapshot {
            return Vec::new();
        }
        state.processes.clone()
    }

    fn executable_path(&self, pid: ProcessId) -> Option<PathBuf> {
        self.state.lock().unwrap().exe_paths.get(&pid).cloned()
    }

    fn top_level_windows(&self, pid: ProcessId) -> Vec<WindowHandle> {
        let state = self.state.lock().unwrap();
        let mut windows: Vec<WindowHandle> = state
            .windows
            .iter()
            .filter(|(_, owner)| **owner == pid)
            .map(|(window, _)| *window)
            .collect();
        windows.sort_by_key(|window| window.0);
        windows
    }

    fn window_exists(&self, window: WindowHandle) -> bool {
        self.state.lock().unwrap().windows.contains_key(&window)
    }

    fn window_is_visible(&self, window: WindowHandle) -> bool {
        let state = self.state.lock().unwrap();
        state.windows.contains_key(&window) && !state.hidden.get(&window).copied().unwrap_or(false)
    }

    fn window_rect(&self, window: WindowHandle) -> Option<Rect> {
        self.state.lock().unwrap().rects.get(&window).copied()
    }

    fn foreground_window(&self) -> Option<WindowHandle> {
        self.state.lock().unwrap().foreground
    }

    fn terminate_window_owner(&self, window: WindowHandle) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.fail_terminate {
            return false;
        }
        let Some(pid) = state.windows.get(&window).copied() else {
            return false;
        };

        state.terminated.push(pid);
        state.processes.retain(|process| process.pid != pid);
        state.windows.retain(|_, owner| *owner != pid);
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceCall {
    Show,
    SetRect(Rect),
    Raise,
    Close,
}

/// Surface that records the calls the overlay state machine makes.
pub struct FakeSurface {
    calls: Arc<Mutex<Vec<SurfaceCall>>>,
}

impl FakeSurface {
    pub fn new() -> (Box<dyn OverlaySurface>, Arc<Mutex<Vec<SurfaceCall>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let surface = FakeSurface {
            calls: Arc::clone(&calls),
        };
        (Box::new(surface), calls)
    }
}

impl OverlaySurface for FakeSurface {
    fn show(&mut self) {
        self.calls.lock().unwrap().push(SurfaceCall::Show);
    }

    fn set_rect(&mut self, rect: Rect) {
        self.calls.lock().unwrap().push(SurfaceCall::SetRect(rect));
    }

    fn raise(&mut self) {
        self.calls.lock().unwrap().push(SurfaceCall::Raise);
    }

    fn close(&mut self) {
        self.calls.lock().unwrap().push(SurfaceCall::Close);
    }
}
