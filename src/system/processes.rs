use std::path::PathBuf;
use std::sync::Mutex;

use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};

use super::{ProcessId, ProcessInfo};

/// Process names that must never be blocked: the shell and core OS
/// processes, plus the monitor's own executable.
const PROTECTED_NAME_PREFIX: &str = "system";
const PROTECTED_NAMES: &[&str] = &["explorer.exe"];
const SELF_MARKER: &str = "foccuss";

/// Whether a process is off-limits for blocking, by case-insensitive name
/// match. Blocking the shell or ourselves would destabilize the session.
pub fn is_protected_process(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.starts_with(PROTECTED_NAME_PREFIX)
        || lower.contains(SELF_MARKER)
        || PROTECTED_NAMES.contains(&lower.as_str())
}

/// Whether an executable path belongs to the monitoring application itself.
pub fn is_own_executable(path: &str) -> bool {
    path.to_lowercase().contains(SELF_MARKER)
}

/// Cross-platform process table built on sysinfo. Refreshing needs `&mut`,
/// so the inner `System` sits behind a mutex and callers stay `&self`.
pub struct ProcessTable {
    system: Mutex<System>,
}

impl ProcessTable {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }

    /// Snapshots the process table. A poisoned lock yields an empty
    /// snapshot; the next tick retries.
    pub fn snapshot(&self) -> Vec<ProcessInfo> {
        let Ok(mut system) = self.system.lock() else {
            return Vec::new();
        };

        // everything() ensures names and exe paths are populated.
        system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            ProcessRefreshKind::everything(),
        );

        system
            .processes()
            .iter()
            .map(|(pid, process)| ProcessInfo {
                pid: pid.as_u32(),
                name: process.name().to_string_lossy().into_owned(),
            })
            .collect()
    }

    /// Executable path from the most recent snapshot. `None` when the
    /// process exited mid-scan or the path is not readable.
    pub fn executable_path(&self, pid: ProcessId) -> Option<PathBuf> {
        let system = self.system.lock().ok()?;
        system
            .process(sysinfo::Pid::from_u32(pid))
            .and_then(|process| process.exe().map(|path| path.to_path_buf()))
    }
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}
