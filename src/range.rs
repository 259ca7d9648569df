//! Day and week date windows.

use chrono::{DateTime, Datelike, Days, Local, NaiveTime, TimeZone, Utc};
use std::fmt;

const DATE_FORMAT: &str = "%b %d %a";

/// A half-open date window `[start, end)` spanning `days` calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub days: u32,
}

impl TimeRange {
    /// Today only, starting at local midnight.
    pub fn today() -> Self {
        Self::day_of(&Local::now())
    }

    /// The single day containing `now`, starting at midnight in `now`'s zone.
    pub fn day_of<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        let start = beginning_of_day(now);
        Self {
            start,
            end: start + Days::new(1),
            days: 1,
        }
    }

    /// The week containing today.
    pub fn this_week() -> Self {
        Self::today().week()
    }

    /// Switch to week granularity, anchored on the current start day.
    pub fn week(&self) -> Self {
        self.week_in(&Local)
    }

    /// Switch to week granularity using weekdays as seen in `tz`.
    ///
    /// The window opens on the day before the first day of the ISO week
    /// containing `start`. Sunday counts as day 7, so a range starting on a
    /// Sunday moves back a full week.
    pub fn week_in<Tz: TimeZone>(&self, tz: &Tz) -> Self {
        let weekday = self.start.with_timezone(tz).weekday().number_from_monday();
        let start = self.start - Days::new(u64::from(weekday));
        Self {
            start,
            end: start + Days::new(7),
            days: 7,
        }
    }

    pub fn is_week(&self) -> bool {
        self.days > 1
    }

    /// Move to the previous day or week.
    pub fn prev(&self) -> Self {
        let shift = Days::new(u64::from(self.days));
        Self {
            start: self.start - shift,
            end: self.end - shift,
            days: self.days,
        }
    }

    /// Move to the next day or week.
    pub fn next(&self) -> Self {
        let shift = Days::new(u64::from(self.days));
        Self {
            start: self.start + shift,
            end: self.end + shift,
            days: self.days,
        }
    }

    pub fn start_ms(&self) -> i64 {
        self.start.timestamp_millis()
    }

    pub fn end_ms(&self) -> i64 {
        self.end.timestamp_millis()
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }

    /// Render in `tz`. The end is exclusive, so the last day shown is the day
    /// before `end`.
    pub fn display_in<Tz: TimeZone>(&self, tz: &Tz) -> String
    where
        Tz::Offset: fmt::Display,
    {
        let start = self.start.with_timezone(tz).format(DATE_FORMAT);
        if self.days <= 1 {
            return start.to_string();
        }
        let last = (self.end - Days::new(1)).with_timezone(tz).format(DATE_FORMAT);
        format!("{} to {}", start, last)
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        Self::today()
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_in(&Local))
    }
}

fn beginning_of_day<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
    let tz = now.timezone();
    let midnight = now.date_naive().and_time(NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        // Midnight skipped by a DST jump; fall back to the UTC reading.
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}
