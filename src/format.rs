//! Output formatting for task lists and timesheets.

use crate::report::{CheckinStatus, TimesheetSummary};
use crate::types::{ClockState, Task, TimesheetEntry};
use anyhow::Result;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::json;
use std::fmt::Display;

/// Zero-padded `HH:MM`. Hours are not wrapped at a day.
pub fn format_duration(d: Duration) -> String {
    let minutes = d.num_minutes().max(0);
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// One task line: marker, age-dependent timestamp, optional state, title.
///
/// `A` marks the active task, `P` the paused one, `X` an archived one.
pub fn format_task_line<Tz: TimeZone>(task: &Task, now: DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: Display,
{
    let age = now - task.updated_at;
    let updated = task.updated_at.with_timezone(tz);
    let ts = if age > Duration::days(6) {
        updated.format("%b %d").to_string()
    } else if age > Duration::hours(23) {
        updated.format("%a   ").to_string()
    } else {
        updated.format("%H:%M ").to_string()
    };

    let prefix = match task.clock_state() {
        ClockState::Active => "A ",
        ClockState::Paused => "P ",
        ClockState::Idle if task.is_archived() => "X ",
        ClockState::Idle => "  ",
    };

    match &task.state {
        Some(state) => format!("{}{} {:>3} {} {}", prefix, ts, task.id, state, task.title),
        None => format!("{}{} {:>3} {}", prefix, ts, task.id, task.title),
    }
}

pub fn format_tasks<Tz: TimeZone>(tasks: &[Task], now: DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: Display,
{
    tasks
        .iter()
        .map(|task| format_task_line(task, now, tz))
        .collect::<Vec<_>>()
        .join("\n")
}

/// One timesheet line: `day start - end = duration title`.
pub fn format_entry_line<Tz: TimeZone>(entry: &TimesheetEntry, now: DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: Display,
{
    let start = entry.clockin_at.with_timezone(tz);
    let end = entry
        .clockout_at
        .map(|at| at.with_timezone(tz).format("%H:%M").to_string())
        .unwrap_or_default();

    format!(
        "{} {:>5} - {:>5} = {:>5} {}",
        start.format("%b %d %a"),
        start.format("%H:%M"),
        end,
        format_duration(entry.duration(now)),
        entry.title
    )
}

/// Entries followed by the per-project totals and the grand total.
pub fn format_timesheet<Tz: TimeZone>(
    entries: &[TimesheetEntry],
    summary: &TimesheetSummary,
    now: DateTime<Utc>,
    tz: &Tz,
) -> String
where
    Tz::Offset: Display,
{
    let mut lines: Vec<String> = entries
        .iter()
        .map(|entry| format_entry_line(entry, now, tz))
        .collect();

    if !summary.by_project.is_empty() {
        lines.push(String::new());
        for row in &summary.by_project {
            lines.push(format!("{:<15} {}", row.project, format_duration(row.duration)));
        }
        lines.push(format!("--------------- {}", format_duration(summary.total)));
    }

    lines.join("\n")
}

/// `project +HH:MM` while clocked in, `project HH:MM` while paused.
pub fn format_checkin(status: &CheckinStatus) -> Option<String> {
    match status {
        CheckinStatus::Active { project, elapsed } => {
            Some(format!("{} +{}", project, format_duration(*elapsed)))
        }
        CheckinStatus::Paused { project, today } => {
            Some(format!("{} {}", project, format_duration(*today)))
        }
        CheckinStatus::Idle => None,
    }
}

/// `today [+]HH:MM`; the plus marks a running interval.
pub fn format_today(summary: &TimesheetSummary) -> String {
    let marker = if summary.open { "+" } else { "" };
    format!("today {}{}", marker, format_duration(summary.total))
}

pub fn tasks_json(tasks: &[Task]) -> Result<String> {
    Ok(serde_json::to_string_pretty(tasks)?)
}

pub fn timesheet_json(entries: &[TimesheetEntry], summary: &TimesheetSummary) -> Result<String> {
    let value = json!({
        "entries": entries,
        "summary": summary,
    });
    Ok(serde_json::to_string_pretty(&value)?)
}
