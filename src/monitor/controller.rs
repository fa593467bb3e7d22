use std::sync::Arc;
use std::time::Duration;

use log::{error, info};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::system::WindowSystem;

use super::engine::MonitorEngine;

const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

struct MonitorWorker {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

/// Interactive-host driver for the monitor engine: one engine, one
/// cooperative ticker task on the host's runtime.
#[derive(Clone)]
pub struct MonitorController<S: WindowSystem> {
    engine: Arc<Mutex<MonitorEngine<S>>>,
    worker: Arc<Mutex<Option<MonitorWorker>>>,
    tick_interval: Duration,
}

impl<S: WindowSystem> MonitorController<S> {
    pub fn new(engine: MonitorEngine<S>) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
            worker: Arc::new(Mutex::new(None)),
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Starts the monitor loop. Calling while already running is an
    /// informational no-op; no second ticker is spawned. The first tick
    /// runs immediately rather than waiting out the interval.
    pub async fn start_monitoring(&self) {
        let mut worker = self.worker.lock().await;
        if worker.is_some() {
            info!("Monitoring already active");
            return;
        }

        self.engine.lock().await.reset_cache();

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(monitor_loop(
            Arc::clone(&self.engine),
            cancel.clone(),
            self.tick_interval,
        ));

        *worker = Some(MonitorWorker { handle, cancel });
        info!("Monitoring started");
    }

    /// Stops the loop and joins the ticker task, so no tick executes after
    /// this returns. Idempotent.
    pub async fn stop_monitoring(&self) {
        let Some(MonitorWorker { handle, cancel }) = self.worker.lock().await.take() else {
            return;
        };

        cancel.cancel();
        if let Err(err) = handle.await {
            error!("Monitor loop task failed to join: {err}");
        }

        self.engine.lock().await.reset_cache();
        info!("Monitoring stopped");
    }

    pub async fn is_monitoring(&self) -> bool {
        self.worker.lock().await.is_some()
    }
}

async fn monitor_loop<S: WindowSystem>(
    engine: Arc<Mutex<MonitorEngine<S>>>,
    cancel: CancellationToken,
    tick_interval: Duration,
) {
    let mut ticker = tokio::time::interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                engine.lock().await.tick().await;
            }
            _ = cancel.cancelled() => {
                info!("Monitor loop shutting down");
                break;
            }
        }
    }
}
