mod controller;
mod engine;

use serde::Serialize;

use crate::system::{ProcessId, WindowHandle};

pub use controller::MonitorController;
pub use engine::MonitorEngine;

/// Raised once per newly observed blocked window. The host decides what to
/// do with it (typically: spawn an enforcement overlay); the engine itself
/// never constructs UI.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockedWindowEvent {
    pub window: WindowHandle,
    pub pid: ProcessId,
    pub app_path: String,
    pub app_name: String,
}
