//! Clock-in, clock-out and pause.
//!
//! What is being worked on right now lives in the single-row `session` table:
//! the active task with its open timesheet entry, or the paused task. The
//! `clockin_at`/`paused_at` columns on `tasks` mirror that slot for display
//! and filtering.

use super::tasks::get_task_internal;
use super::{Database, now_ms};
use crate::error::CoreError;
use crate::types::Task;
use anyhow::Result;
use rusqlite::{Connection, params};
use tracing::{debug, info};

/// Snapshot of the session slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Session {
    pub active_task_id: Option<i64>,
    pub active_entry_id: Option<i64>,
    pub paused_task_id: Option<i64>,
}

impl Session {
    pub fn is_empty(&self) -> bool {
        self.active_task_id.is_none()
            && self.active_entry_id.is_none()
            && self.paused_task_id.is_none()
    }
}

pub(crate) fn read_session(conn: &Connection) -> Result<Session> {
    let session = conn.query_row(
        "SELECT active_task_id, active_entry_id, paused_task_id FROM session WHERE id = 1",
        [],
        |row| {
            Ok(Session {
                active_task_id: row.get(0)?,
                active_entry_id: row.get(1)?,
                paused_task_id: row.get(2)?,
            })
        },
    )?;
    Ok(session)
}

/// Clear the active and paused task and close the open interval.
///
/// Safe to call when nothing is active: an empty session performs no writes.
pub(crate) fn force_close(conn: &Connection, now: i64) -> Result<()> {
    let session = read_session(conn)?;
    if session.is_empty() {
        return Ok(());
    }

    if let Some(task_id) = session.active_task_id {
        conn.execute(
            "UPDATE tasks SET clockin_at = NULL WHERE id = ?1",
            params![task_id],
        )?;
    }

    if let Some(task_id) = session.paused_task_id {
        conn.execute(
            "UPDATE tasks SET paused_at = NULL WHERE id = ?1",
            params![task_id],
        )?;
    }

    if let Some(entry_id) = session.active_entry_id {
        // An entry whose start was edited past `now` closes at its start.
        conn.execute(
            "UPDATE timesheet SET clockout_at = MAX(clockin_at, ?1)
             WHERE id = ?2 AND clockout_at IS NULL",
            params![now, entry_id],
        )?;
    }

    conn.execute(
        "UPDATE session SET active_task_id = NULL, active_entry_id = NULL, paused_task_id = NULL
         WHERE id = 1",
        [],
    )?;

    debug!(
        active = ?session.active_task_id,
        paused = ?session.paused_task_id,
        entry = ?session.active_entry_id,
        "Closed session"
    );
    Ok(())
}

impl Database {
    /// Start working on a task.
    ///
    /// Whatever was active or paused before is closed first, so exactly one
    /// task is active and exactly one interval is open afterwards. Clocking
    /// in on the paused task resumes it with a fresh interval.
    pub fn clock_in(&self, task_id: i64) -> Result<()> {
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if get_task_internal(&tx, task_id)?.is_none() {
                return Err(CoreError::task_not_found(task_id).into());
            }

            force_close(&tx, now)?;

            tx.execute(
                "UPDATE tasks SET clockin_at = ?1, updated_at = ?1
                 WHERE id = ?2 AND clockin_at IS NULL",
                params![now, task_id],
            )?;

            tx.execute(
                "INSERT INTO timesheet (task_id, clockin_at) VALUES (?1, ?2)",
                params![task_id, now],
            )?;
            let entry_id = tx.last_insert_rowid();

            tx.execute(
                "UPDATE session SET active_task_id = ?1, active_entry_id = ?2 WHERE id = 1",
                params![task_id, entry_id],
            )?;

            tx.commit()?;

            info!(task_id, entry_id, "Clocked in");
            Ok(())
        })
    }

    /// Stop working. Leaves no active task, no paused task and no open interval.
    pub fn clock_out(&self) -> Result<()> {
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            force_close(&tx, now)?;
            tx.commit()?;

            info!("Clocked out");
            Ok(())
        })
    }

    /// Suspend the active task.
    ///
    /// Returns the paused task id, or `None` without writing anything when no
    /// task is active.
    pub fn pause(&self) -> Result<Option<i64>> {
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let Some(task_id) = read_session(&tx)?.active_task_id else {
                return Ok(None);
            };

            force_close(&tx, now)?;

            tx.execute(
                "UPDATE tasks SET paused_at = ?1 WHERE id = ?2",
                params![now, task_id],
            )?;
            tx.execute(
                "UPDATE session SET paused_task_id = ?1 WHERE id = 1",
                params![task_id],
            )?;

            tx.commit()?;

            info!(task_id, "Paused");
            Ok(Some(task_id))
        })
    }

    /// Current contents of the session slot.
    pub fn session(&self) -> Result<Session> {
        self.with_conn(read_session)
    }

    pub fn get_active_task_id(&self) -> Result<Option<i64>> {
        Ok(self.session()?.active_task_id)
    }

    pub fn get_paused_task_id(&self) -> Result<Option<i64>> {
        Ok(self.session()?.paused_task_id)
    }

    /// The active task, if any.
    pub fn get_active_task(&self) -> Result<Option<Task>> {
        self.with_conn(|conn| match read_session(conn)?.active_task_id {
            Some(task_id) => get_task_internal(conn, task_id),
            None => Ok(None),
        })
    }
}
