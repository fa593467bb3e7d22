use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{Local, NaiveTime};
use clap::{Parser, Subcommand};

use foccuss::db::Database;
use foccuss::models::{normalize_exe_path, BlockSchedule, WeekdayMask};
use foccuss::system::processes::{is_protected_process, ProcessTable};

#[derive(Parser)]
#[command(name = "foccuss", about = "Schedule-gated application blocker", version)]
struct Cli {
    /// SQLite database location. Defaults to the per-user data directory.
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the monitor until interrupted.
    Run {
        /// Scan interval in milliseconds.
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,

        /// Host the monitor on a dedicated worker thread instead of the
        /// interactive runtime loop.
        #[arg(long)]
        service: bool,
    },
    /// List blocklist entries.
    List,
    /// Add an executable to the blocklist.
    Block {
        path: String,

        /// Display name; defaults to the executable's file stem.
        #[arg(long)]
        name: Option<String>,
    },
    /// Remove an executable from the blocklist.
    Unblock { path: String },
    /// Show currently running processes eligible for blocking.
    Running,
    /// Inspect or change the blocking schedule.
    Schedule {
        #[command(subcommand)]
        command: ScheduleCommands,
    },
}

#[derive(Subcommand)]
enum ScheduleCommands {
    Show,
    Set {
        /// Window start, HH:MM.
        #[arg(long)]
        start: String,

        /// Window end, HH:MM. An end before the start wraps past midnight.
        #[arg(long)]
        end: String,

        /// Comma-separated days, e.g. "mon,tue,wed,thu,fri".
        #[arg(long)]
        days: String,

        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        active: bool,
    },
}

fn default_db_path() -> Result<PathBuf> {
    let base = dirs::data_dir().ok_or_else(|| anyhow!("no user data directory available"))?;
    Ok(base.join("foccuss").join("foccuss.sqlite3"))
}

fn parse_time(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .with_context(|| format!("invalid time {value:?}, expected HH:MM"))
}

fn parse_days(value: &str) -> Result<WeekdayMask> {
    let mut days = WeekdayMask::default();
    for token in value.split(',') {
        match token.trim().to_lowercase().as_str() {
            "mon" | "monday" => days.monday = true,
            "tue" | "tuesday" => days.tuesday = true,
            "wed" | "wednesday" => days.wednesday = true,
            "thu" | "thursday" => days.thursday = true,
            "fri" | "friday" => days.friday = true,
            "sat" | "saturday" => days.saturday = true,
            "sun" | "sunday" => days.sunday = true,
            other => bail!("unknown day {other:?}"),
        }
    }
    Ok(days)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::parse();
    let db_path = match cli.db_path {
        Some(path) => path,
        None => default_db_path()?,
    };
    let db = Database::new(db_path)?;

    match cli.command {
        Commands::Run {
            interval_ms,
            service,
        } => run_monitor(db, Duration::from_millis(interval_ms), service).await,
        Commands::List => {
            let apps = db.get_blocked_apps().await?;
            if apps.is_empty() {
                println!("Blocklist is empty");
                return Ok(());
            }
            for app in apps {
                println!("{}\t{}", app.name, app.path);
            }
            Ok(())
        }
        Commands::Block { path, name } => {
            let name = match name {
                Some(name) => name,
                None => PathBuf::from(&path)
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .ok_or_else(|| anyhow!("cannot derive a name from {path:?}"))?,
            };
            db.add_blocked_app(&path, &name).await?;
            println!("Blocked {} ({})", name, normalize_exe_path(&path));
            Ok(())
        }
        Commands::Unblock { path } => {
            db.remove_blocked_app(&path).await?;
            println!("Unblocked {}", normalize_exe_path(&path));
            Ok(())
        }
        Commands::Running => {
            let table = ProcessTable::new();
            let mut processes = table.snapshot();
            processes.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
            for process in processes {
                if is_protected_process(&process.name) {
                    continue;
                }
                let path = table
                    .executable_path(process.pid)
                    .map(|path| normalize_exe_path(&path.to_string_lossy()))
                    .unwrap_or_default();
                println!("{}\t{}\t{}", process.pid, process.name, path);
            }
            Ok(())
        }
        Commands::Schedule { command } => match command {
            ScheduleCommands::Show => {
                match db.get_block_schedule().await? {
                    Some(schedule) => {
                        println!("{}", serde_json::to_string_pretty(&schedule)?);
                        println!(
                            "Blocking right now: {}",
                            schedule.is_blocking_at(Local::now())
                        );
                    }
                    None => println!("No schedule configured; blocking is inactive"),
                }
                Ok(())
            }
            ScheduleCommands::Set {
                start,
                end,
                days,
                active,
            } => {
                let schedule = BlockSchedule {
                    start: parse_time(&start)?,
                    end: parse_time(&end)?,
                    days: parse_days(&days)?,
                    active,
                };
                db.update_block_schedule(&schedule).await?;
                println!("{}", serde_json::to_string_pretty(&schedule)?);
                Ok(())
            }
        },
    }
}

#[cfg(windows)]
async fn run_monitor(db: Database, interval: Duration, service: bool) -> Result<()> {
    use std::sync::Arc;

    use log::info;

    use foccuss::host::ServiceHost;
    use foccuss::monitor::{MonitorController, MonitorEngine};
    use foccuss::system::native::NativeSystem;

    let system = Arc::new(NativeSystem::new());
    let (events, mut event_rx) = tokio::sync::mpsc::unbounded_channel();
    let engine = MonitorEngine::new(db, system, events);

    // Headless consumer: every detection is logged. GUI collaborators
    // subscribe to the same channel and drive overlays from it.
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            info!(
                "Blocked window detected: {} ({}) pid {} window {:?}",
                event.app_name, event.app_path, event.pid, event.window
            );
        }
    });

    if service {
        let engine = Arc::new(tokio::sync::Mutex::new(engine));
        let host = ServiceHost::new();
        host.start(engine, interval);
        tokio::signal::ctrl_c().await?;
        host.stop();
    } else {
        let controller = MonitorController::new(engine).with_tick_interval(interval);
        controller.start_monitoring().await;
        tokio::signal::ctrl_c().await?;
        controller.stop_monitoring().await;
    }

    info!("Shutdown complete");
    Ok(())
}

#[cfg(not(windows))]
async fn run_monitor(_db: Database, _interval: Duration, _service: bool) -> Result<()> {
    bail!("process monitoring requires Windows")
}
