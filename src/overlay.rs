//! Enforcement overlay state machine. One instance per detected blocked
//! window; it keeps a host-supplied surface pinned over the target window
//! until the target goes away or the user dismisses/terminates it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{info, warn};
use serde::Serialize;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::system::{OverlaySurface, WindowHandle, WindowSystem};

const TRACK_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OverlayState {
    Created,
    Shown,
    Tracking,
    Closing,
    Closed,
}

pub struct BlockOverlay<S: WindowSystem> {
    system: Arc<S>,
    surface: Mutex<Box<dyn OverlaySurface>>,
    target: WindowHandle,
    app_path: String,
    app_name: String,
    state: Mutex<OverlayState>,
    /// Guard against duplicate close handling; a close can race in from
    /// the tracking tick and a user action at the same time.
    closing: AtomicBool,
    cancel: CancellationToken,
    nudge: Notify,
    tracker: Mutex<Option<JoinHandle<()>>>,
}

impl<S: WindowSystem> BlockOverlay<S> {
    pub fn new(
        system: Arc<S>,
        surface: Box<dyn OverlaySurface>,
        target: WindowHandle,
        app_path: impl Into<String>,
        app_name: impl Into<String>,
    ) -> Arc<Self> {
        Arc::new(Self {
            system,
            surface: Mutex::new(surface),
            target,
            app_path: app_path.into(),
            app_name: app_name.into(),
            state: Mutex::new(OverlayState::Created),
            closing: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            nudge: Notify::new(),
            tracker: Mutex::new(None),
        })
    }

    pub fn target(&self) -> WindowHandle {
        self.target
    }

    pub fn app_path(&self) -> &str {
        &self.app_path
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn state(&self) -> OverlayState {
        match self.state.lock() {
            Ok(state) => *state,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn set_state(&self, next: OverlayState) {
        match self.state.lock() {
            Ok(mut state) => *state = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }

    /// Positions the surface over the target, displays it, and starts the
    /// tracking loop. A target that is already gone or invisible skips
    /// straight to closing. Must run inside a tokio runtime.
    pub fn show(self: &Arc<Self>) {
        if self.closing.load(Ordering::SeqCst) {
            return;
        }

        if !self.system.window_exists(self.target) || !self.system.window_is_visible(self.target) {
            info!(
                "Target window {:?} gone before overlay shown; closing",
                self.target
            );
            self.close();
            return;
        }

        if let Ok(mut surface) = self.surface.lock() {
            if let Some(rect) = self.system.window_rect(self.target) {
                surface.set_rect(rect);
            }
            surface.show();
            surface.raise();
        }
        self.set_state(OverlayState::Shown);

        let mut tracker = match self.tracker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if tracker.is_some() {
            // At most one tracking timer per overlay instance.
            return;
        }

        let overlay = Arc::clone(self);
        *tracker = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(TRACK_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = overlay.cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if overlay.track_tick() {
                            break;
                        }
                    }
                    // Display/activation change notifications from the host
                    // count as tracking triggers too, so abrupt workspace
                    // changes are caught between timer ticks.
                    _ = overlay.nudge.notified() => {
                        if overlay.track_tick() {
                            break;
                        }
                    }
                }
            }
        }));
    }

    /// One tracking step. Returns true once the overlay has closed and the
    /// loop should stop.
    fn track_tick(&self) -> bool {
        if self.closing.load(Ordering::SeqCst) {
            return true;
        }

        if !self.system.window_exists(self.target) || !self.system.window_is_visible(self.target) {
            info!("Target window {:?} disappeared; closing overlay", self.target);
            self.close();
            return true;
        }

        self.set_state(OverlayState::Tracking);

        if let Ok(mut surface) = self.surface.lock() {
            // The target may have moved or resized since the last tick.
            if let Some(rect) = self.system.window_rect(self.target) {
                surface.set_rect(rect);
            }

            // The blocked application grabbing focus back gets the overlay
            // re-asserted above it.
            if self.system.foreground_window() == Some(self.target) {
                surface.raise();
            }
        }

        false
    }

    /// Host hook for OS display/activation change notifications.
    pub fn notify_system_change(&self) {
        self.nudge.notify_one();
    }

    /// Closes the overlay and leaves the target process running.
    pub fn dismiss(&self) {
        self.close();
    }

    /// Requests OS-level termination of the target's owning process, then
    /// closes. Termination failures are logged and swallowed; the overlay
    /// closes either way.
    pub fn force_terminate(&self) {
        if !self.system.terminate_window_owner(self.target) {
            warn!(
                "Failed to terminate process owning {:?} ({})",
                self.target, self.app_name
            );
        }
        self.close();
    }

    /// Idempotent: safe to call from the tracking tick, a user action, and
    /// an external stop-all request concurrently.
    pub fn close(&self) {
        if self.closing.swap(true, Ordering::SeqCst) {
            return;
        }

        self.set_state(OverlayState::Closing);
        self.cancel.cancel();
        if let Ok(mut surface) = self.surface.lock() {
            surface.close();
        }
        self.set_state(OverlayState::Closed);
    }
}
