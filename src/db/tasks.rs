//! Task CRUD and the task query builder.

use super::{Database, from_ms, now_ms, opt_from_ms};
use crate::error::CoreError;
use crate::types::{NewTask, Task, TaskContent, TaskQuery, TodoState};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, ToSql, params};
use tracing::{debug, info};

pub fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    let created_at: i64 = row.get("created_at")?;
    let updated_at: i64 = row.get("updated_at")?;
    let scheduled_at: Option<i64> = row.get("scheduled_at")?;
    let clockin_at: Option<i64> = row.get("clockin_at")?;
    let paused_at: Option<i64> = row.get("paused_at")?;
    let archived_at: Option<i64> = row.get("archived_at")?;

    Ok(Task {
        id: row.get("id")?,
        created_at: from_ms(created_at),
        updated_at: from_ms(updated_at),
        scheduled_at: opt_from_ms(scheduled_at),
        clockin_at: opt_from_ms(clockin_at),
        paused_at: opt_from_ms(paused_at),
        archived_at: opt_from_ms(archived_at),
        parent_id: row.get("parent_id")?,
        project: row.get("project")?,
        title: row.get("title")?,
        body: row.get("body")?,
        state: row.get("state")?,
        state_idx: row.get("state_idx")?,
    })
}

/// Escape LIKE wildcards so user input only ever matches literally.
fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Translate a `TaskQuery` into SQL and its bound parameters.
///
/// Every supplied predicate is ANDed; only the parent clause contains an OR
/// (the parent itself or one of its direct children).
pub fn build_task_query(query: &TaskQuery) -> (String, Vec<Box<dyn ToSql>>) {
    let mut sql = String::from("SELECT * FROM tasks WHERE 1=1");
    let mut params_vec: Vec<Box<dyn ToSql>> = Vec::new();

    if !query.archived {
        sql.push_str(" AND archived_at IS NULL");
    }

    if let Some(project) = query.project.as_deref().filter(|p| !p.is_empty()) {
        sql.push_str(" AND project = ?");
        params_vec.push(Box::new(project.to_string()));
    }

    if let Some(pid) = query.parent_id.filter(|&id| id > 0) {
        sql.push_str(" AND (id = ? OR parent_id = ?)");
        params_vec.push(Box::new(pid));
        params_vec.push(Box::new(pid));
    }

    if let Some(needle) = query.search_title.as_deref().filter(|s| !s.is_empty()) {
        sql.push_str(" AND LOWER(title) LIKE ? ESCAPE '\\'");
        params_vec.push(Box::new(like_pattern(needle)));
    }

    if let Some(needle) = query.search_body.as_deref().filter(|s| !s.is_empty()) {
        sql.push_str(" AND LOWER(body) LIKE ? ESCAPE '\\'");
        params_vec.push(Box::new(like_pattern(needle)));
    }

    if let Some(range) = &query.range {
        sql.push_str(
            " AND ((created_at >= ? AND created_at < ?) OR (updated_at >= ? AND updated_at < ?))",
        );
        params_vec.push(Box::new(range.start_ms()));
        params_vec.push(Box::new(range.end_ms()));
        params_vec.push(Box::new(range.start_ms()));
        params_vec.push(Box::new(range.end_ms()));
    }

    if query.todo {
        sql.push_str(" AND state_idx IS NOT NULL");
        sql.push_str(" ORDER BY state_idx ASC, updated_at DESC, id DESC");
    } else {
        sql.push_str(" ORDER BY updated_at DESC, id DESC");
    }

    (sql, params_vec)
}

/// Internal helper to get a task using an existing connection (avoids deadlock).
pub(crate) fn get_task_internal(conn: &Connection, task_id: i64) -> Result<Option<Task>> {
    let task = conn
        .query_row(
            "SELECT * FROM tasks WHERE id = ?1",
            params![task_id],
            parse_task_row,
        )
        .optional()?;
    Ok(task)
}

fn task_exists(conn: &Connection, task_id: i64) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT id FROM tasks WHERE id = ?1", params![task_id], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(found.is_some())
}

/// Fail with `TaskNotFound` when an UPDATE touched no rows.
fn expect_one(updated: usize, task_id: i64) -> Result<()> {
    if updated == 0 {
        return Err(CoreError::task_not_found(task_id).into());
    }
    Ok(())
}

impl Database {
    /// List tasks matching every predicate of `query`.
    pub fn get_tasks(&self, query: &TaskQuery) -> Result<Vec<Task>> {
        let (sql, params_vec) = build_task_query(query);

        self.with_conn(|conn| {
            let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|b| b.as_ref()).collect();

            let mut stmt = conn.prepare(&sql)?;
            let tasks = stmt
                .query_map(params_refs.as_slice(), parse_task_row)?
                .collect::<Result<Vec<_>, _>>()?;

            debug!(count = tasks.len(), "Loaded tasks");
            Ok(tasks)
        })
    }

    /// Get a task by ID.
    pub fn get_task(&self, task_id: i64) -> Result<Option<Task>> {
        self.with_conn(|conn| get_task_internal(conn, task_id))
    }

    /// Get a task by ID, failing with `TaskNotFound` when it does not exist.
    pub fn require_task(&self, task_id: i64) -> Result<Task> {
        self.get_task(task_id)?
            .ok_or_else(|| CoreError::task_not_found(task_id).into())
    }

    /// Create a new task and return its id.
    pub fn create_task(&self, payload: &NewTask) -> Result<i64> {
        let now = now_ms();
        let parent_id = payload.parent_id.filter(|&id| id > 0);

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if let Some(pid) = parent_id
                && !task_exists(&tx, pid)?
            {
                return Err(CoreError::task_not_found(pid).with_field("parent_id").into());
            }

            tx.execute(
                "INSERT INTO tasks (created_at, updated_at, parent_id, project, title, body)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    now,
                    now,
                    parent_id,
                    &payload.content.project,
                    &payload.content.title,
                    &payload.content.body,
                ],
            )?;
            let task_id = tx.last_insert_rowid();

            tx.commit()?;

            info!(task_id, project = %payload.content.project, "Created task");
            Ok(task_id)
        })
    }

    /// Replace the content of a task and bump `updated_at`.
    pub fn update_task(&self, task_id: i64, content: &TaskContent) -> Result<()> {
        let now = now_ms();

        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE tasks SET updated_at = ?1, project = ?2, title = ?3, body = ?4
                 WHERE id = ?5",
                params![now, &content.project, &content.title, &content.body, task_id],
            )?;
            expect_one(updated, task_id)?;

            info!(task_id, "Updated task");
            Ok(())
        })
    }

    /// Archive or unarchive a task.
    pub fn set_archived(&self, task_id: i64, archived: bool) -> Result<()> {
        let archived_at = archived.then(now_ms);

        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE tasks SET archived_at = ?1 WHERE id = ?2",
                params![archived_at, task_id],
            )?;
            expect_one(updated, task_id)?;

            debug!(task_id, archived, "Set archived");
            Ok(())
        })
    }

    /// Set or clear the workflow state of a task.
    pub fn set_todo_state(&self, task_id: i64, state: Option<&TodoState>) -> Result<()> {
        let (idx, label) = match state {
            Some(s) if s.idx >= 0 && !s.label.is_empty() => (Some(s.idx), Some(s.label.as_str())),
            _ => (None, None),
        };

        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE tasks SET state_idx = ?1, state = ?2 WHERE id = ?3",
                params![idx, label, task_id],
            )?;
            expect_one(updated, task_id)?;

            debug!(task_id, state = ?label, "Set todo state");
            Ok(())
        })
    }

    /// Schedule a task, or clear its schedule.
    pub fn set_scheduled(&self, task_id: i64, at: Option<DateTime<Utc>>) -> Result<()> {
        let scheduled_at = at.map(|dt| dt.timestamp_millis());

        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE tasks SET scheduled_at = ?1 WHERE id = ?2",
                params![scheduled_at, task_id],
            )?;
            expect_one(updated, task_id)
        })
    }

    /// Delete a task together with its timesheet entries.
    ///
    /// A task that is active or paused is clocked out first so the session
    /// never points at a deleted row. Children become top-level tasks.
    pub fn delete_task(&self, task_id: i64) -> Result<()> {
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if !task_exists(&tx, task_id)? {
                return Err(CoreError::task_not_found(task_id).into());
            }

            let session = super::clock::read_session(&tx)?;
            if session.active_task_id == Some(task_id) || session.paused_task_id == Some(task_id) {
                super::clock::force_close(&tx, now)?;
            }

            tx.execute("DELETE FROM tasks WHERE id = ?1", params![task_id])?;
            tx.commit()?;

            info!(task_id, "Deleted task");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::TimeRange;
    use chrono::TimeZone;

    #[test]
    fn default_query_hides_archived_and_sorts_by_update() {
        let (sql, params) = build_task_query(&TaskQuery::default());
        assert!(sql.contains("archived_at IS NULL"));
        assert!(sql.ends_with("ORDER BY updated_at DESC, id DESC"));
        assert!(params.is_empty());
    }

    #[test]
    fn todo_query_orders_by_state_first() {
        let query = TaskQuery {
            todo: true,
            archived: true,
            ..Default::default()
        };
        let (sql, _) = build_task_query(&query);
        assert!(!sql.contains("archived_at IS NULL"));
        assert!(sql.contains("state_idx IS NOT NULL"));
        assert!(sql.ends_with("ORDER BY state_idx ASC, updated_at DESC, id DESC"));
    }

    #[test]
    fn filters_bind_in_order() {
        let range = TimeRange::day_of(&Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap());
        let query = TaskQuery {
            project: Some("work".into()),
            parent_id: Some(4),
            search_title: Some("Fix".into()),
            search_body: Some("50%".into()),
            range: Some(range),
            ..Default::default()
        };
        let (sql, params) = build_task_query(&query);
        assert!(sql.contains("project = ?"));
        assert!(sql.contains("(id = ? OR parent_id = ?)"));
        assert!(sql.contains("LOWER(title) LIKE ?"));
        assert!(sql.contains("LOWER(body) LIKE ?"));
        assert!(sql.contains("created_at >= ?"));
        // project, parent x2, title, body, range x4
        assert_eq!(params.len(), 9);
    }

    #[test]
    fn non_positive_parent_is_ignored() {
        let query = TaskQuery {
            parent_id: Some(0),
            ..Default::default()
        };
        let (sql, params) = build_task_query(&query);
        assert!(!sql.contains("parent_id"));
        assert!(params.is_empty());
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("Fix"), "%fix%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
