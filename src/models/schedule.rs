use chrono::{DateTime, Datelike, Local, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// Per-weekday enable flags for the blocking window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekdayMask {
    pub monday: bool,
    pub tuesday: bool,
    pub wednesday: bool,
    pub thursday: bool,
    pub friday: bool,
    pub saturday: bool,
    pub sunday: bool,
}

impl WeekdayMask {
    pub const WEEKDAYS: WeekdayMask = WeekdayMask {
        monday: true,
        tuesday: true,
        wednesday: true,
        thursday: true,
        friday: true,
        saturday: false,
        sunday: false,
    };

    pub const ALL: WeekdayMask = WeekdayMask {
        monday: true,
        tuesday: true,
        wednesday: true,
        thursday: true,
        friday: true,
        saturday: true,
        sunday: true,
    };

    pub fn contains(&self, day: Weekday) -> bool {
        match day {
            Weekday::Mon => self.monday,
            Weekday::Tue => self.tuesday,
            Weekday::Wed => self.wednesday,
            Weekday::Thu => self.thursday,
            Weekday::Fri => self.friday,
            Weekday::Sat => self.saturday,
            Weekday::Sun => self.sunday,
        }
    }
}

/// The singleton blocking schedule: a recurring time-of-day window plus
/// enabled weekdays and a master switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSchedule {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub days: WeekdayMask,
    pub active: bool,
}

impl Default for BlockSchedule {
    fn default() -> Self {
        // Matches the seed row created on first database initialization.
        Self {
            start: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default(),
            end: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or_default(),
            days: WeekdayMask::WEEKDAYS,
            active: true,
        }
    }
}

impl BlockSchedule {
    /// Whether the blocking window is open at the given time-of-day and
    /// weekday. Pure; callers re-evaluate every tick since both the clock
    /// and the stored schedule can change underneath them.
    ///
    /// An `end` numerically below `start` means the window spans midnight
    /// (e.g. 22:00-06:00). The weekday gate always uses the weekday of the
    /// queried instant, including for ranges that cross midnight.
    pub fn allows(&self, time: NaiveTime, day: Weekday) -> bool {
        if !self.active {
            return false;
        }

        let in_range = if self.start < self.end {
            self.start <= time && time <= self.end
        } else {
            time >= self.start || time <= self.end
        };

        in_range && self.days.contains(day)
    }

    pub fn is_blocking_at(&self, now: DateTime<Local>) -> bool {
        self.allows(now.time(), now.weekday())
    }
}
