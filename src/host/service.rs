//! Headless hosting: runs the monitor engine on a dedicated worker thread
//! instead of an interactive runtime, for service-style deployments where
//! no event loop exists to piggyback on.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use log::{error, info, warn};
use tokio::sync::Mutex as AsyncMutex;

use crate::monitor::MonitorEngine;
use crate::system::WindowSystem;

/// How long the worker sleeps between stop-flag checks. Bounded well below
/// the tick interval so a stop request never waits out a full tick.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Drives a `MonitorEngine` from its own named thread. The thread owns a
/// single-threaded tokio runtime for the engine's async storage calls; the
/// loop itself is plain blocking code with a stop flag.
pub struct ServiceHost {
    stop_flag: Arc<AtomicBool>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
}

impl ServiceHost {
    pub fn new() -> Self {
        Self {
            stop_flag: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
        }
    }

    /// Spawns the worker thread. Calling while already running is an
    /// informational no-op.
    pub fn start<S: WindowSystem>(
        &self,
        engine: Arc<AsyncMutex<MonitorEngine<S>>>,
        tick_interval: Duration,
    ) {
        let mut worker = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if worker.is_some() {
            info!("Service worker already running");
            return;
        }

        self.stop_flag.store(false, Ordering::SeqCst);
        let stop_flag = Arc::clone(&self.stop_flag);

        let spawned = thread::Builder::new()
            .name("foccuss-monitor".to_string())
            .spawn(move || run_worker(engine, stop_flag, tick_interval));

        match spawned {
            Ok(handle) => {
                *worker = Some(handle);
                info!("Service worker started");
            }
            Err(err) => error!("Failed to spawn service worker thread: {err}"),
        }
    }

    /// Signals the worker to stop and joins it, so no tick executes after
    /// this returns. Idempotent.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::SeqCst);

        let handle = {
            let mut worker = match self.worker.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            worker.take()
        };

        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!("Service worker thread panicked");
            }
            info!("Service worker stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        match self.worker.lock() {
            Ok(worker) => worker.is_some(),
            Err(poisoned) => poisoned.into_inner().is_some(),
        }
    }
}

impl Default for ServiceHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ServiceHost {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_worker<S: WindowSystem>(
    engine: Arc<AsyncMutex<MonitorEngine<S>>>,
    stop_flag: Arc<AtomicBool>,
    tick_interval: Duration,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("Service worker could not build a runtime: {err}");
            return;
        }
    };

    runtime.block_on(engine.lock()).reset_cache();
    info!("Service monitor loop running, tick interval {tick_interval:?}");

    // First tick fires immediately; later ones wait out the interval in
    // short sleeps so the stop flag stays responsive.
    let mut last_tick: Option<Instant> = None;
    while !stop_flag.load(Ordering::SeqCst) {
        let due = match last_tick {
            Some(at) => at.elapsed() >= tick_interval,
            None => true,
        };

        if due {
            last_tick = Some(Instant::now());
            runtime.block_on(async {
                engine.lock().await.tick().await;
            });
        } else {
            thread::sleep(STOP_POLL_INTERVAL.min(tick_interval));
        }
    }

    runtime.block_on(engine.lock()).reset_cache();
    info!("Service monitor loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::temp_db;
    use crate::db::Database;
    use crate::models::{BlockSchedule, WeekdayMask};
    use crate::monitor::BlockedWindowEvent;
    use crate::system::testing::FakeSystem;
    use crate::system::WindowHandle;
    use chrono::NaiveTime;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    fn seeded_engine(
        runtime: &tokio::runtime::Runtime,
    ) -> (
        Arc<AsyncMutex<MonitorEngine<FakeSystem>>>,
        Arc<FakeSystem>,
        UnboundedReceiver<BlockedWindowEvent>,
        Database,
    ) {
        let db = runtime.block_on(async {
            let db = temp_db();
            let midnight = NaiveTime::from_hms_opt(0, 0, 0).unwrap();
            db.update_block_schedule(&BlockSchedule {
                start: midnight,
                end: midnight,
                days: WeekdayMask::ALL,
                active: true,
            })
            .await
            .expect("schedule");
            db.add_blocked_app("C:/Games/game.exe", "game.exe")
                .await
                .expect("blocklist");
            db
        });

        let system = Arc::new(FakeSystem::new());
        system.add_process(7, "game.exe", Some("C:/Games/game.exe"));
        system.add_window(7, WindowHandle(100));

        let (tx, rx) = mpsc::unbounded_channel();
        let engine = Arc::new(AsyncMutex::new(MonitorEngine::new(
            db.clone(),
            Arc::clone(&system),
            tx,
        )));
        (engine, system, rx, db)
    }

    #[test]
    fn worker_thread_detects_blocked_window() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (engine, _system, mut rx, _db) = seeded_engine(&runtime);

        let host = ServiceHost::new();
        host.start(engine, Duration::from_millis(20));
        assert!(host.is_running());

        thread::sleep(Duration::from_millis(150));
        host.stop();
        assert!(!host.is_running());

        assert_eq!(rx.try_recv().expect("one event").window, WindowHandle(100));
        assert!(rx.try_recv().is_err(), "window must be reported once");
    }

    #[test]
    fn second_start_is_a_noop() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (engine, _system, mut rx, _db) = seeded_engine(&runtime);

        let host = ServiceHost::new();
        host.start(Arc::clone(&engine), Duration::from_millis(20));
        host.start(engine, Duration::from_millis(20));

        thread::sleep(Duration::from_millis(150));
        host.stop();

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn stop_joins_before_returning() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (engine, system, mut rx, _db) = seeded_engine(&runtime);

        let host = ServiceHost::new();
        host.start(engine, Duration::from_millis(20));
        thread::sleep(Duration::from_millis(80));
        host.stop();
        while rx.try_recv().is_ok() {}

        // No tick may run once stop has returned.
        system.add_window(7, WindowHandle(101));
        thread::sleep(Duration::from_millis(100));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn stop_without_start_is_idempotent() {
        let host = ServiceHost::new();
        host.stop();
        host.stop();
        assert!(!host.is_running());
    }

    #[test]
    fn restart_behaves_as_cold_start() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (engine, _system, mut rx, _db) = seeded_engine(&runtime);

        let host = ServiceHost::new();
        host.start(Arc::clone(&engine), Duration::from_millis(20));
        thread::sleep(Duration::from_millis(80));
        host.stop();
        assert!(rx.try_recv().is_ok());

        host.start(engine, Duration::from_millis(20));
        thread::sleep(Duration::from_millis(80));
        host.stop();
        assert!(rx.try_recv().is_ok(), "cache cleared across restart");
    }
}
