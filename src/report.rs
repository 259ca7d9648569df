//! Time aggregation over timesheet entries.

use crate::db::Database;
use crate::range::TimeRange;
use crate::types::TimesheetEntry;
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Tracked time for one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectTotal {
    pub project: String,
    #[serde(serialize_with = "serialize_minutes")]
    pub duration: Duration,
}

/// Per-project breakdown of a timesheet, alphabetical by project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimesheetSummary {
    pub by_project: Vec<ProjectTotal>,
    #[serde(serialize_with = "serialize_minutes")]
    pub total: Duration,
    /// An interval is still running and counted up to `now`.
    pub open: bool,
}

fn serialize_minutes<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_i64(d.num_minutes())
}

/// Sum entry durations per project. Open entries count up to `now`.
pub fn summarize(entries: &[TimesheetEntry], now: DateTime<Utc>) -> TimesheetSummary {
    let mut by_project: BTreeMap<&str, Duration> = BTreeMap::new();
    let mut total = Duration::zero();
    let mut open = false;

    for entry in entries {
        let duration = entry.duration(now);
        *by_project.entry(entry.project.as_str()).or_insert_with(Duration::zero) += duration;
        total += duration;
        open |= entry.is_open();
    }

    TimesheetSummary {
        by_project: by_project
            .into_iter()
            .map(|(project, duration)| ProjectTotal {
                project: project.to_string(),
                duration,
            })
            .collect(),
        total,
        open,
    }
}

/// Closed time booked against `project`.
pub fn closed_total_for_project(entries: &[TimesheetEntry], project: &str) -> Duration {
    entries
        .iter()
        .filter(|e| e.project == project)
        .filter_map(|e| e.clockout_at.map(|end| end - e.clockin_at))
        .fold(Duration::zero(), |acc, d| acc + d)
}

/// What the clock is doing right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckinStatus {
    /// A task is clocked in; `elapsed` since its clock-in.
    Active { project: String, elapsed: Duration },
    /// A task is paused; `today` is its project's closed time today.
    Paused { project: String, today: Duration },
    Idle,
}

impl Database {
    /// Timesheet for `range` aggregated per project.
    pub fn timesheet_summary(&self, range: &TimeRange) -> Result<TimesheetSummary> {
        let entries = self.get_timesheet(range)?;
        Ok(summarize(&entries, Utc::now()))
    }

    pub fn checkin_status(&self) -> Result<CheckinStatus> {
        let session = self.session()?;
        let now = Utc::now();

        if let Some(task_id) = session.active_task_id {
            let task = self.require_task(task_id)?;
            let elapsed = task
                .clockin_at
                .map(|at| now - at)
                .unwrap_or_else(Duration::zero);
            return Ok(CheckinStatus::Active {
                project: task.project,
                elapsed,
            });
        }

        if let Some(task_id) = session.paused_task_id {
            let task = self.require_task(task_id)?;
            let entries = self.get_timesheet(&TimeRange::today())?;
            let today = closed_total_for_project(&entries, &task.project);
            return Ok(CheckinStatus::Paused {
                project: task.project,
                today,
            });
        }

        Ok(CheckinStatus::Idle)
    }
}
