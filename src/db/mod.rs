use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use chrono::{NaiveTime, Timelike};
use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::oneshot;

mod migrations;

use crate::models::{normalize_exe_path, BlockSchedule, BlockedApp, WeekdayMask};
use migrations::run_migrations;

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Shutdown,
}

struct DatabaseInner {
    sender: mpsc::Sender<DbCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(DbCommand::Shutdown) {
                error!("Failed to send shutdown to DB thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join DB thread: {join_err:?}");
            }
        }
    }
}

fn time_from_parts(hour: i64, minute: i64) -> Result<NaiveTime> {
    NaiveTime::from_hms_opt(hour as u32, minute as u32, 0)
        .ok_or_else(|| anyhow!("invalid schedule time {hour:02}:{minute:02}"))
}

/// Clone-able handle over a dedicated worker thread that owns the SQLite
/// connection. Callers submit closures and await the reply.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
    db_path: Arc<PathBuf>,
}

impl Database {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let path_for_thread = db_path.clone();

        let worker = thread::Builder::new()
            .name("foccuss-db".into())
            .spawn(move || {
                let mut conn = match Connection::open(&path_for_thread) {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = ready_tx.send(
                            Err(anyhow::Error::new(err).context("failed to open SQLite database")),
                        );
                        return;
                    }
                };

                if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                    error!("Failed to enable WAL mode: {err}");
                }

                let init_result =
                    run_migrations(&mut conn).context("failed to run database migrations");
                if ready_tx.send(init_result).is_err() {
                    error!("DB initialization receiver dropped before ready signal");
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        DbCommand::Execute(task) => {
                            task(&mut conn);
                        }
                        DbCommand::Shutdown => break,
                    }
                }

                info!("Database thread shutting down");
            })
            .with_context(|| "failed to spawn database worker thread")?;

        ready_rx
            .recv()
            .context("database worker exited before signaling readiness")??;

        info!("Database initialized at {}", db_path.as_path().display());

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
            db_path: Arc::new(db_path),
        })
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sender = self.inner.sender.clone();
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = DbCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("DB caller dropped before receiving result");
            }
        }));

        sender
            .send(command)
            .map_err(|err| anyhow!("failed to send command to DB thread: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("database thread terminated unexpectedly"))?
    }

    /// Adds (or re-activates) a blocklist entry. The path is stored in its
    /// normalized form; the column collates NOCASE so lookups are
    /// case-insensitive.
    pub async fn add_blocked_app(&self, path: &str, name: &str) -> Result<()> {
        let path = normalize_exe_path(path);
        let name = name.to_string();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO blocked_apps (app_path, app_name, is_blocked)
                 VALUES (?1, ?2, 1)
                 ON CONFLICT(app_path) DO UPDATE SET
                     app_name = excluded.app_name,
                     is_blocked = 1",
                params![path, name],
            )
            .with_context(|| "failed to insert blocked app")?;
            Ok(())
        })
        .await
    }

    /// Soft delete: the row stays behind with `is_blocked = 0`.
    pub async fn remove_blocked_app(&self, path: &str) -> Result<()> {
        let path = normalize_exe_path(path);
        self.execute(move |conn| {
            conn.execute(
                "UPDATE blocked_apps SET is_blocked = 0 WHERE app_path = ?1",
                params![path],
            )
            .with_context(|| "failed to unblock app")?;
            Ok(())
        })
        .await
    }

    pub async fn is_app_blocked(&self, path: &str) -> Result<bool> {
        let path = normalize_exe_path(path);
        self.execute(move |conn| {
            let found = conn
                .query_row(
                    "SELECT 1 FROM blocked_apps WHERE app_path = ?1 AND is_blocked = 1",
                    params![path],
                    |_| Ok(()),
                )
                .optional()
                .with_context(|| "failed to query blocked app")?;
            Ok(found.is_some())
        })
        .await
    }

    /// Active entries only; soft-deleted rows are filtered out.
    pub async fn get_blocked_apps(&self) -> Result<Vec<BlockedApp>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT app_path, app_name FROM blocked_apps
                 WHERE is_blocked = 1
                 ORDER BY app_name",
            )?;

            let mut rows = stmt.query([])?;
            let mut apps = Vec::new();
            while let Some(row) = rows.next()? {
                apps.push(BlockedApp {
                    path: row.get(0)?,
                    name: row.get(1)?,
                    blocked: true,
                });
            }

            Ok(apps)
        })
        .await
    }

    /// The singleton schedule row. `None` means the row is absent, which
    /// callers must treat as "blocking inactive" rather than an error.
    pub async fn get_block_schedule(&self) -> Result<Option<BlockSchedule>> {
        self.execute(|conn| {
            let row = conn
                .query_row(
                    "SELECT start_hour, start_minute, end_hour, end_minute,
                            monday, tuesday, wednesday, thursday, friday,
                            saturday, sunday, is_active
                     FROM block_schedule WHERE id = 1",
                    [],
                    |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, i64>(1)?,
                            row.get::<_, i64>(2)?,
                            row.get::<_, i64>(3)?,
                            WeekdayMask {
                                monday: row.get(4)?,
                                tuesday: row.get(5)?,
                                wednesday: row.get(6)?,
                                thursday: row.get(7)?,
                                friday: row.get(8)?,
                                saturday: row.get(9)?,
                                sunday: row.get(10)?,
                            },
                            row.get::<_, bool>(11)?,
                        ))
                    },
                )
                .optional()
                .with_context(|| "failed to read block schedule")?;

            match row {
                Some((start_hour, start_minute, end_hour, end_minute, days, active)) => {
                    Ok(Some(BlockSchedule {
                        start: time_from_parts(start_hour, start_minute)?,
                        end: time_from_parts(end_hour, end_minute)?,
                        days,
                        active,
                    }))
                }
                None => Ok(None),
            }
        })
        .await
    }

    /// Upsert on the singleton row; the schedule is never deleted.
    pub async fn update_block_schedule(&self, schedule: &BlockSchedule) -> Result<()> {
        let schedule = schedule.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO block_schedule (
                     id, start_hour, start_minute, end_hour, end_minute,
                     monday, tuesday, wednesday, thursday, friday,
                     saturday, sunday, is_active
                 ) VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                 ON CONFLICT(id) DO UPDATE SET
                     start_hour = excluded.start_hour,
                     start_minute = excluded.start_minute,
                     end_hour = excluded.end_hour,
                     end_minute = excluded.end_minute,
                     monday = excluded.monday,
                     tuesday = excluded.tuesday,
                     wednesday = excluded.wednesday,
                     thursday = excluded.thursday,
                     friday = excluded.friday,
                     saturday = excluded.saturday,
                     sunday = excluded.sunday,
                     is_active = excluded.is_active",
                params![
                    schedule.start.hour(),
                    schedule.start.minute(),
                    schedule.end.hour(),
                    schedule.end.minute(),
                    schedule.days.monday,
                    schedule.days.tuesday,
                    schedule.days.wednesday,
                    schedule.days.thursday,
                    schedule.days.friday,
                    schedule.days.saturday,
                    schedule.days.sunday,
                    schedule.active,
                ],
            )
            .with_context(|| "failed to update block schedule")?;
            Ok(())
        })
        .await
    }

    pub async fn is_blocking_active(&self) -> Result<bool> {
        Ok(self
            .get_block_schedule()
            .await?
            .map(|schedule| schedule.active)
            .unwrap_or(false))
    }
}
