//! Timesheet subcommands for mort CLI

use crate::range::TimeRange;
use clap::Args;

/// Arguments for the timesheet subcommand
#[derive(Args, Debug, Default)]
pub struct TimesheetArgs {
    /// Show the whole week instead of one day
    #[arg(short, long)]
    pub week: bool,

    /// Page back (negative) or forward by whole days or weeks
    #[arg(short, long, default_value_t = 0, allow_hyphen_values = true)]
    pub offset: i32,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl TimesheetArgs {
    /// The range these flags select.
    pub fn range(&self) -> TimeRange {
        let mut range = if self.week {
            TimeRange::this_week()
        } else {
            TimeRange::today()
        };
        for _ in 0..self.offset.unsigned_abs() {
            range = if self.offset < 0 {
                range.prev()
            } else {
                range.next()
            };
        }
        range
    }
}

/// Arguments for the timesheet-edit subcommand
#[derive(Args, Debug)]
pub struct TimesheetEditArgs {
    /// Timesheet entry id
    pub entry_id: i64,

    /// New start time (HH:MM)
    #[arg(long, value_name = "HH:MM")]
    pub start: Option<String>,

    /// New end time (HH:MM)
    #[arg(long, value_name = "HH:MM")]
    pub end: Option<String>,
}
