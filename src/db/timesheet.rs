//! Timesheet retrieval and manual interval edits.

use super::clock::read_session;
use super::{Database, from_ms, opt_from_ms};
use crate::error::CoreError;
use crate::range::TimeRange;
use crate::types::TimesheetEntry;
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::info;

const ENTRY_COLUMNS: &str =
    "t.id, t.task_id, t.clockin_at, t.clockout_at, n.project, n.title";

fn parse_entry_row(row: &Row) -> rusqlite::Result<TimesheetEntry> {
    let clockin_at: i64 = row.get(2)?;
    let clockout_at: Option<i64> = row.get(3)?;

    Ok(TimesheetEntry {
        id: row.get(0)?,
        task_id: row.get(1)?,
        clockin_at: from_ms(clockin_at),
        clockout_at: opt_from_ms(clockout_at),
        project: row.get(4)?,
        title: row.get(5)?,
    })
}

fn get_entry_internal(conn: &Connection, entry_id: i64) -> Result<Option<TimesheetEntry>> {
    let sql = format!(
        "SELECT {ENTRY_COLUMNS} FROM timesheet t JOIN tasks n ON t.task_id = n.id WHERE t.id = ?1"
    );
    let entry = conn
        .query_row(&sql, params![entry_id], parse_entry_row)
        .optional()?;
    Ok(entry)
}

impl Database {
    /// Entries that started inside `range`.
    ///
    /// Closed entries must also end before `range.end`. Open entries are
    /// judged by their start alone, however long they have been running.
    pub fn get_timesheet(&self, range: &TimeRange) -> Result<Vec<TimesheetEntry>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {ENTRY_COLUMNS} FROM timesheet t
                 JOIN tasks n ON t.task_id = n.id
                 WHERE t.clockin_at >= ?1
                   AND (t.clockout_at < ?2 OR (t.clockout_at IS NULL AND t.clockin_at < ?2))
                 ORDER BY t.clockin_at ASC, t.id ASC"
            );

            let mut stmt = conn.prepare(&sql)?;
            let entries = stmt
                .query_map(params![range.start_ms(), range.end_ms()], parse_entry_row)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(entries)
        })
    }

    /// Get a single timesheet entry.
    pub fn get_timesheet_entry(&self, entry_id: i64) -> Result<Option<TimesheetEntry>> {
        self.with_conn(|conn| get_entry_internal(conn, entry_id))
    }

    /// Manually correct the start and/or end of an interval.
    ///
    /// The resulting start may not be after the resulting end. The open
    /// interval cannot be given an end here; clock out instead.
    pub fn update_timesheet_entry(
        &self,
        entry_id: i64,
        clockin_at: Option<DateTime<Utc>>,
        clockout_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let entry = get_entry_internal(&tx, entry_id)?
                .ok_or_else(|| CoreError::entry_not_found(entry_id))?;

            if clockout_at.is_some() && entry.is_open() {
                return Err(CoreError::invalid_value(
                    "clockout_at",
                    "Entry is still open; clock out first.",
                )
                .into());
            }

            let start = clockin_at.unwrap_or(entry.clockin_at);
            let end = clockout_at.or(entry.clockout_at);
            if let Some(end) = end
                && start > end
            {
                return Err(
                    CoreError::invalid_value("clockin_at", "Start is after end.").into(),
                );
            }

            if let Some(start) = clockin_at {
                tx.execute(
                    "UPDATE timesheet SET clockin_at = ?1 WHERE id = ?2",
                    params![start.timestamp_millis(), entry_id],
                )?;

                // Keep the active task's clock-in in step with its open entry.
                let session = read_session(&tx)?;
                if session.active_entry_id == Some(entry_id) {
                    tx.execute(
                        "UPDATE tasks SET clockin_at = ?1 WHERE id = ?2",
                        params![start.timestamp_millis(), entry.task_id],
                    )?;
                }
            }

            if let Some(end) = clockout_at {
                tx.execute(
                    "UPDATE timesheet SET clockout_at = ?1 WHERE id = ?2",
                    params![end.timestamp_millis(), entry_id],
                )?;
            }

            tx.commit()?;

            info!(entry_id, "Edited timesheet entry");
            Ok(())
        })
    }
}
