use std::collections::HashSet;
use std::sync::Arc;

use chrono::Local;
use log::warn;
use tokio::sync::mpsc::UnboundedSender;

use crate::db::Database;
use crate::models::normalize_exe_path;
use crate::system::processes::{is_own_executable, is_protected_process};
use crate::system::{WindowHandle, WindowSystem};

use super::BlockedWindowEvent;

/// One tick's worth of scanning: schedule gate, process/window scan, the
/// per-window match cache, and at-most-once event emission.
///
/// The cache holds every window handle an event has already been raised
/// for while that window is still enumerable. Handles that vanish are
/// evicted the same tick, so a later window of the same process gets
/// reported again.
pub struct MonitorEngine<S: WindowSystem> {
    db: Database,
    system: Arc<S>,
    events: UnboundedSender<BlockedWindowEvent>,
    cache: HashSet<WindowHandle>,
}

impl<S: WindowSystem> MonitorEngine<S> {
    pub fn new(db: Database, system: Arc<S>, events: UnboundedSender<BlockedWindowEvent>) -> Self {
        Self {
            db,
            system,
            events,
            cache: HashSet::new(),
        }
    }

    pub fn reset_cache(&mut self) {
        self.cache.clear();
    }

    /// Runs one scan cycle. Every failure mode here is soft: a missing
    /// schedule or a failed storage read means "don't block", a process
    /// that can't be inspected is skipped, and the next tick retries.
    pub async fn tick(&mut self) {
        let schedule = match self.db.get_block_schedule().await {
            Ok(Some(schedule)) => schedule,
            Ok(None) => return,
            Err(err) => {
                warn!("Schedule read failed, skipping tick: {err:#}");
                return;
            }
        };

        // Outside the blocking window the cache is deliberately left
        // untouched; only start/stop clear it.
        if !schedule.is_blocking_at(Local::now()) {
            return;
        }

        let mut seen = HashSet::new();

        for process in self.system.snapshot_processes() {
            if is_protected_process(&process.name) {
                continue;
            }

            let Some(path) = self.system.executable_path(process.pid) else {
                continue;
            };
            let app_path = normalize_exe_path(&path.to_string_lossy());
            if is_own_executable(&app_path) {
                continue;
            }

            let blocked = match self.db.is_app_blocked(&app_path).await {
                Ok(blocked) => blocked,
                Err(err) => {
                    warn!("Blocklist lookup for {app_path} failed: {err:#}");
                    false
                }
            };
            if !blocked {
                continue;
            }

            for window in self.system.top_level_windows(process.pid) {
                seen.insert(window);

                if self.cache.insert(window) {
                    let _ = self.events.send(BlockedWindowEvent {
                        window,
                        pid: process.pid,
                        app_path: app_path.clone(),
                        app_name: process.name.clone(),
                    });
                }
            }
        }

        // Set-difference eviction, always after detection: a window cannot
        // be evicted and re-detected within the same tick.
        self.cache.retain(|window| seen.contains(window));
    }
}
