//! Application layer between the user-facing surface and the store.
//!
//! Holds the current filter state and the last status message. Failures are
//! returned as `CoreError` and also leave a short message behind; nothing
//! here panics or retries.

use crate::config::Config;
use crate::db::Database;
use crate::error::{CoreError, CoreResult, ErrorCode};
use crate::filter::FilterState;
use crate::types::{NewTask, Task, TaskContent, TimesheetEntry, TodoState};
use chrono::{DateTime, Local, NaiveTime, TimeZone, Timelike, Utc};
use tracing::{info, warn};

/// Which end of a timesheet entry to edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryEdge {
    Start,
    End,
}

/// Result of the pause/resume toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseOutcome {
    Paused(i64),
    Resumed(i64),
}

pub struct App {
    db: Database,
    config: Config,
    filter: FilterState,
    message: String,
}

impl App {
    pub fn new(db: Database, config: Config) -> Self {
        Self {
            db,
            config,
            filter: FilterState::default(),
            message: String::new(),
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    /// Replace the filter state as a whole.
    pub fn set_filter(&mut self, filter: FilterState) {
        self.filter = filter;
    }

    /// Last status message.
    pub fn message(&self) -> &str {
        &self.message
    }

    fn set_message(&mut self, msg: impl Into<String>) {
        self.message = msg.into();
    }

    /// Record a failure as the status message and hand the error back.
    fn fail(&mut self, action: &str, err: impl Into<CoreError>) -> CoreError {
        let err = err.into();
        if err.is_validation() {
            self.set_message(err.message.clone());
        } else {
            warn!(code = ?err.code, error = %err, "{} failed", action);
            self.set_message(format!("Failed to {}: {}", action, err));
        }
        err
    }

    /// Run the query described by the current filters.
    pub fn load_tasks(&mut self) -> CoreResult<Vec<Task>> {
        let tasks = self
            .db
            .get_tasks(&self.filter.to_query())
            .map_err(|e| self.fail("load tasks", e))?;
        self.set_message(self.filter.describe(tasks.len()));
        Ok(tasks)
    }

    /// Timesheet entries for the current range.
    pub fn load_timesheet(&mut self) -> CoreResult<Vec<TimesheetEntry>> {
        let entries = self
            .db
            .get_timesheet(&self.filter.range)
            .map_err(|e| self.fail("load timesheet", e))?;
        self.set_message(format!("Timesheet filter:range={}", self.filter.range));
        Ok(entries)
    }

    pub fn clock_in(&mut self, task_id: i64) -> CoreResult<()> {
        self.db
            .clock_in(task_id)
            .map_err(|e| self.fail("clock in", e))?;
        self.set_message("Clocked in.");
        Ok(())
    }

    /// Clock out, refusing up front when nothing is clocked in.
    pub fn clock_out(&mut self) -> CoreResult<()> {
        let active = self
            .db
            .get_active_task_id()
            .map_err(|e| self.fail("get active task", e))?;
        if active.is_none() {
            return Err(self.fail("clock out", CoreError::not_clocked_in()));
        }

        self.db.clock_out().map_err(|e| self.fail("clock out", e))?;
        self.set_message("Clocked out.");
        Ok(())
    }

    /// Pause the active task.
    pub fn pause(&mut self) -> CoreResult<i64> {
        match self.db.pause().map_err(|e| self.fail("pause", e))? {
            Some(task_id) => {
                self.set_message("Paused.");
                Ok(task_id)
            }
            None => Err(self.fail("pause", CoreError::nothing_to_pause())),
        }
    }

    /// Resume the paused task, or pause the active one.
    pub fn toggle_pause(&mut self) -> CoreResult<PauseOutcome> {
        let session = self.db.session().map_err(|e| self.fail("read session", e))?;

        if let Some(task_id) = session.paused_task_id {
            self.clock_in(task_id)?;
            self.set_message("Resumed.");
            return Ok(PauseOutcome::Resumed(task_id));
        }

        self.pause().map(PauseOutcome::Paused)
    }

    /// Advance the todo state of a task one step.
    pub fn toggle_todo_state(&mut self, task_id: i64) -> CoreResult<Option<TodoState>> {
        let task = self
            .db
            .require_task(task_id)
            .map_err(|e| self.fail("toggle state", e))?;

        let next = self.config.todo.states.advance(task.state.as_deref());
        self.db
            .set_todo_state(task_id, next.as_ref())
            .map_err(|e| self.fail("toggle state", e))?;

        self.set_message("");
        Ok(next)
    }

    /// Flip the archived flag; returns whether the task is now archived.
    pub fn toggle_archived(&mut self, task_id: i64) -> CoreResult<bool> {
        let task = self
            .db
            .require_task(task_id)
            .map_err(|e| self.fail("toggle archive", e))?;

        let archived = !task.is_archived();
        self.db
            .set_archived(task_id, archived)
            .map_err(|e| self.fail("toggle archive", e))?;

        self.set_message(if archived { "Archived" } else { "Unarchived" });
        Ok(archived)
    }

    /// Create a task from an edited draft body.
    ///
    /// An empty body or one identical to the template it started from is
    /// rejected without touching the store.
    pub fn create_task_from_body(
        &mut self,
        body: &str,
        template: &str,
        parent_id: Option<i64>,
    ) -> CoreResult<i64> {
        if body == template && !template.is_empty() {
            return Err(self.fail("store task", CoreError::unchanged_content("No content.")));
        }
        if body.is_empty() {
            return Err(self.fail("store task", CoreError::empty_content("Empty content.")));
        }

        let payload = NewTask {
            content: TaskContent::from_body(body, &self.config.default_project),
            parent_id,
        };
        let task_id = self
            .db
            .create_task(&payload)
            .map_err(|e| self.fail("store task", e))?;

        self.filter = self.filter.reset();
        self.set_message("Created task.");
        Ok(task_id)
    }

    /// Replace a task's body, re-deriving title and project.
    pub fn update_task_body(&mut self, task_id: i64, body: &str) -> CoreResult<()> {
        let task = self
            .db
            .require_task(task_id)
            .map_err(|e| self.fail("update task", e))?;

        if body.is_empty() {
            return Err(self.fail("update task", CoreError::empty_content("Empty body.")));
        }
        if body == task.body {
            return Err(self.fail("update task", CoreError::unchanged_content("No change.")));
        }

        let content = TaskContent::from_body(body, &self.config.default_project);
        self.db
            .update_task(task_id, &content)
            .map_err(|e| self.fail("update task", e))?;

        self.filter = self.filter.reset();
        self.set_message("Updated task.");
        Ok(())
    }

    /// Create a task from a project and a title, as `project: title`.
    pub fn new_task(&mut self, project: &str, title: &str) -> CoreResult<i64> {
        if project.is_empty() {
            return Err(self.fail(
                "store task",
                CoreError::invalid_value("project", "Please provide a project."),
            ));
        }
        if title.is_empty() {
            return Err(self.fail(
                "store task",
                CoreError::invalid_value("title", "Please provide a title."),
            ));
        }

        let text = format!("{}: {}", project, title);
        let payload = NewTask {
            content: TaskContent {
                project: project.to_string(),
                title: text.clone(),
                body: text,
            },
            parent_id: None,
        };
        let task_id = self
            .db
            .create_task(&payload)
            .map_err(|e| self.fail("store task", e))?;

        info!(task_id, "Created task from command line");
        self.set_message("Created task.");
        Ok(task_id)
    }

    /// Set the start or end of an entry to `HH:MM` on the local day it started.
    pub fn edit_timesheet_time(
        &mut self,
        entry_id: i64,
        hhmm: &str,
        edge: EntryEdge,
    ) -> CoreResult<()> {
        match edge {
            EntryEdge::Start => self.edit_timesheet_times(entry_id, Some(hhmm), None),
            EntryEdge::End => self.edit_timesheet_times(entry_id, None, Some(hhmm)),
        }
    }

    /// Set start and/or end of an entry to `HH:MM` on the local day it
    /// started. Both ends are validated together and written at once.
    pub fn edit_timesheet_times(
        &mut self,
        entry_id: i64,
        start: Option<&str>,
        end: Option<&str>,
    ) -> CoreResult<()> {
        let entry = self
            .db
            .get_timesheet_entry(entry_id)
            .map_err(|e| self.fail("update timesheet", e))?
            .ok_or_else(|| CoreError::entry_not_found(entry_id))
            .map_err(|e| self.fail("update timesheet", e))?;

        let parse = |hhmm: Option<&str>| {
            hhmm.map(|t| replace_clock_time(entry.clockin_at, t, &Local))
                .transpose()
        };
        let start_at = parse(start).map_err(|e| self.fail("update timesheet", e))?;
        let end_at = parse(end).map_err(|e| self.fail("update timesheet", e))?;

        self.db
            .update_timesheet_entry(entry_id, start_at, end_at)
            .map_err(|e| self.fail("update timesheet", e))?;

        self.set_message("Updated timesheet.");
        Ok(())
    }

    /// Position of the active task within `tasks`.
    pub fn go_to_active(&mut self, visible: &[Task]) -> CoreResult<usize> {
        let Some(task_id) = self
            .db
            .get_active_task_id()
            .map_err(|e| self.fail("get active task", e))?
        else {
            return Err(self.fail("go to active", CoreError::not_clocked_in()));
        };

        match visible.iter().position(|t| t.id == task_id) {
            Some(idx) => Ok(idx),
            None => {
                self.set_message("Active task not visible.");
                Err(CoreError::new(
                    ErrorCode::TaskNotFound,
                    "Active task not visible.",
                ))
            }
        }
    }

    /// Toggle the project filter from the selected task.
    pub fn toggle_project_filter(&mut self, selected: Option<&Task>) {
        match self.filter.toggle_project(selected) {
            Ok(filter) => self.filter = filter,
            Err(refusal) => self.set_message(refusal.to_string()),
        }
    }

    /// Toggle the parent filter from the selected task.
    pub fn toggle_parent_filter(&mut self, selected: Option<&Task>) {
        match self.filter.toggle_parent(selected) {
            Ok(filter) => self.filter = filter,
            Err(refusal) => self.set_message(refusal.to_string()),
        }
    }
}

/// Replace hour and minute of `at` as seen in `tz`, keeping date and seconds.
pub fn replace_clock_time<Tz: TimeZone>(
    at: DateTime<Utc>,
    hhmm: &str,
    tz: &Tz,
) -> CoreResult<DateTime<Utc>> {
    let invalid = || CoreError::invalid_value("time", "Expected time as HH:MM.");

    let (h, m) = hhmm.trim().split_once(':').ok_or_else(invalid)?;
    let hour: u32 = h.trim().parse().map_err(|_| invalid())?;
    let minute: u32 = m.trim().parse().map_err(|_| invalid())?;

    let local = at.with_timezone(tz);
    let time = NaiveTime::from_hms_opt(hour, minute, local.second()).ok_or_else(invalid)?;

    tz.from_local_datetime(&local.date_naive().and_time(time))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(invalid)
}
