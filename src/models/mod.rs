mod app;
mod schedule;

pub use app::{normalize_exe_path, BlockedApp};
pub use schedule::{BlockSchedule, WeekdayMask};
