//! Task list filter state.
//!
//! `FilterState` is a plain value. Every toggle returns a new state and leaves
//! the old one untouched; the caller swaps it in as a whole.

use crate::range::TimeRange;
use crate::types::{Task, TaskQuery};
use std::fmt;

/// Why a toggle could not be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleRefusal {
    NoTask,
    NoProject,
}

impl fmt::Display for ToggleRefusal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToggleRefusal::NoTask => f.write_str("No task."),
            ToggleRefusal::NoProject => f.write_str("No project."),
        }
    }
}

/// The filters currently applied to the task list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    pub archived: bool,
    pub todo: bool,
    pub title: Option<String>,
    pub body: Option<String>,
    pub project: Option<String>,
    pub parent_id: Option<i64>,
    /// Whether the date range restricts the task list. The timesheet always
    /// uses `range`.
    pub range_enabled: bool,
    pub range: TimeRange,
}

impl FilterState {
    pub fn new(range: TimeRange) -> Self {
        Self {
            archived: false,
            todo: false,
            title: None,
            body: None,
            project: None,
            parent_id: None,
            range_enabled: false,
            range,
        }
    }

    /// Narrow to the selected task's project, or drop the project filter.
    pub fn toggle_project(&self, selected: Option<&Task>) -> Result<Self, ToggleRefusal> {
        if self.project.is_some() {
            return Ok(Self {
                project: None,
                ..self.clone()
            });
        }

        let task = selected.ok_or(ToggleRefusal::NoTask)?;
        if task.project.is_empty() {
            return Err(ToggleRefusal::NoProject);
        }

        Ok(Self {
            project: Some(task.project.clone()),
            ..self.clone()
        })
    }

    /// Drill into the selected task's family, or drop the parent filter.
    ///
    /// A child selects its parent's family; a top-level task selects its own.
    pub fn toggle_parent(&self, selected: Option<&Task>) -> Result<Self, ToggleRefusal> {
        if self.parent_id.is_some_and(|id| id > 0) {
            return Ok(Self {
                parent_id: None,
                ..self.clone()
            });
        }

        let task = selected.ok_or(ToggleRefusal::NoTask)?;
        Ok(Self {
            parent_id: Some(task.parent_id.unwrap_or(task.id)),
            ..self.clone()
        })
    }

    pub fn toggle_todo(&self) -> Self {
        Self {
            todo: !self.todo,
            ..self.clone()
        }
    }

    pub fn toggle_archived(&self) -> Self {
        Self {
            archived: !self.archived,
            ..self.clone()
        }
    }

    pub fn with_title(&self, needle: &str) -> Self {
        Self {
            title: non_empty(needle),
            ..self.clone()
        }
    }

    pub fn with_body(&self, needle: &str) -> Self {
        Self {
            body: non_empty(needle),
            ..self.clone()
        }
    }

    /// Cycle the task list date filter: off -> today -> week -> off.
    pub fn toggle_date_range(&self) -> Self {
        if !self.range_enabled {
            return Self {
                range_enabled: true,
                range: TimeRange::today(),
                ..self.clone()
            };
        }

        if self.range.is_week() {
            Self {
                range_enabled: false,
                ..self.clone()
            }
        } else {
            Self {
                range: self.range.week(),
                ..self.clone()
            }
        }
    }

    /// Switch the timesheet between day and week.
    pub fn toggle_timesheet_range(&self) -> Self {
        let range = if self.range.is_week() {
            TimeRange::today()
        } else {
            self.range.week()
        };
        Self {
            range,
            ..self.clone()
        }
    }

    pub fn prev(&self) -> Self {
        Self {
            range: self.range.prev(),
            ..self.clone()
        }
    }

    pub fn next(&self) -> Self {
        Self {
            range: self.range.next(),
            ..self.clone()
        }
    }

    /// Drop every filter except the todo view.
    pub fn reset(&self) -> Self {
        Self {
            todo: self.todo,
            ..Self::new(self.range)
        }
    }

    pub fn to_query(&self) -> TaskQuery {
        TaskQuery {
            archived: self.archived,
            todo: self.todo,
            parent_id: self.parent_id,
            project: self.project.clone(),
            search_title: self.title.clone(),
            search_body: self.body.clone(),
            range: self.range_enabled.then_some(self.range),
        }
    }

    /// Status line for a listing of `count` tasks.
    pub fn describe(&self, count: usize) -> String {
        let mut msg = if self.todo {
            format!("{} todo tasks", count)
        } else {
            format!("{} tasks", count)
        };

        let mut filters = Vec::new();
        if !self.archived {
            filters.push("Archived hidden".to_string());
        }
        if let Some(project) = &self.project {
            filters.push(format!("Project={}", project));
        }
        if let Some(parent_id) = self.parent_id {
            filters.push(format!("Parent={}", parent_id));
        }
        if self.range_enabled {
            filters.push(format!("Date={}", self.range));
        }
        if let Some(title) = &self.title {
            filters.push(format!("Title=*{}*", title));
        }
        if let Some(body) = &self.body {
            filters.push(format!("Body=*{}*", body));
        }

        if !filters.is_empty() {
            msg.push_str(" | ");
            msg.push_str(&filters.join(" "));
        }
        msg
    }
}

impl Default for FilterState {
    fn default() -> Self {
        Self::new(TimeRange::today())
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}
