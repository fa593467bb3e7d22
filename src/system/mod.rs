use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub mod processes;

#[cfg(windows)]
pub mod native;

#[cfg(test)]
pub mod testing;

pub type ProcessId = u32;

/// Opaque OS window identifier. The OS owns the underlying resource; this is
/// only an equality/hash key for the match cache and overlay targeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowHandle(pub isize);

/// Screen rectangle of a top-level window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: ProcessId,
    pub name: String,
}

/// Boundary to the OS process/window table. Platform backends implement
/// this; the engine and overlay only ever talk to the trait, so the core
/// stays portable and testable.
///
/// All operations fail soft: a backend that cannot answer returns an empty
/// list / `None` / `false` and the caller retries on its next tick.
pub trait WindowSystem: Send + Sync + 'static {
    fn snapshot_processes(&self) -> Vec<ProcessInfo>;

    fn executable_path(&self, pid: ProcessId) -> Option<PathBuf>;

    /// Top-level windows owned by the process, in OS enumeration order.
    fn top_level_windows(&self, pid: ProcessId) -> Vec<WindowHandle>;

    fn window_exists(&self, window: WindowHandle) -> bool;

    fn window_is_visible(&self, window: WindowHandle) -> bool;

    fn window_rect(&self, window: WindowHandle) -> Option<Rect>;

    fn foreground_window(&self) -> Option<WindowHandle>;

    /// Best-effort kill of the process owning `window`; returns whether the
    /// termination request was accepted.
    fn terminate_window_owner(&self, window: WindowHandle) -> bool;
}

/// The widget the enforcement overlay drives. The UI collaborator supplies
/// the real implementation; the state machine in `crate::overlay` decides
/// when each call happens.
pub trait OverlaySurface: Send + 'static {
    fn show(&mut self);

    fn set_rect(&mut self, rect: Rect);

    /// Re-assert the overlay above the target and reclaim activation.
    fn raise(&mut self);

    fn close(&mut self);
}
