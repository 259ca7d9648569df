//! Core types for mort.

use crate::range::TimeRange;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Project label used when a title carries no `project:` prefix.
pub const DEFAULT_PROJECT: &str = "default";

/// A task in the task list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub scheduled_at: Option<DateTime<Utc>>,

    // Time tracking
    pub clockin_at: Option<DateTime<Utc>>,
    pub paused_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,

    pub parent_id: Option<i64>,

    pub project: String,
    pub title: String,
    pub body: String,

    // Workflow position, both set or both unset
    pub state: Option<String>,
    pub state_idx: Option<i32>,
}

/// Where a task sits in the clock-in/clock-out protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockState {
    Idle,
    Active,
    Paused,
}

impl Task {
    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }

    pub fn clock_state(&self) -> ClockState {
        if self.clockin_at.is_some() {
            ClockState::Active
        } else if self.paused_at.is_some() {
            ClockState::Paused
        } else {
            ClockState::Idle
        }
    }

    pub fn todo_state(&self) -> Option<TodoState> {
        match (self.state_idx, &self.state) {
            (Some(idx), Some(label)) => Some(TodoState {
                idx,
                label: label.clone(),
            }),
            _ => None,
        }
    }
}

/// One clock-in/clock-out interval.
///
/// `project` and `title` are joined in from the owning task for reporting and
/// are not authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimesheetEntry {
    pub id: i64,
    pub task_id: i64,
    pub clockin_at: DateTime<Utc>,
    pub clockout_at: Option<DateTime<Utc>>,

    pub project: String,
    pub title: String,
}

impl TimesheetEntry {
    pub fn is_open(&self) -> bool {
        self.clockout_at.is_none()
    }

    /// Length of the interval, measuring open intervals up to `now`.
    pub fn duration(&self, now: DateTime<Utc>) -> Duration {
        self.clockout_at.unwrap_or(now) - self.clockin_at
    }
}

/// Filter predicates for a single task listing. All supplied predicates are
/// combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    /// Include archived tasks.
    pub archived: bool,
    /// Only tasks with a workflow state, ordered by state.
    pub todo: bool,
    /// A task and its direct children. Non-positive ids are ignored.
    pub parent_id: Option<i64>,
    /// Exact project match.
    pub project: Option<String>,
    /// Case-insensitive substring of the title.
    pub search_title: Option<String>,
    /// Case-insensitive substring of the body.
    pub search_body: Option<String>,
    /// Created or updated within the range.
    pub range: Option<TimeRange>,
}

/// User-authored content of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskContent {
    pub project: String,
    pub title: String,
    pub body: String,
}

impl TaskContent {
    /// Derive title and project from a raw body.
    ///
    /// The title is the first line of the body and the project is the part of
    /// the title before the first colon.
    pub fn from_body(body: impl Into<String>, default_project: &str) -> Self {
        let body = body.into();
        let title = title_from_body(&body).to_string();
        let project = project_from_title(&title, default_project).to_string();
        Self {
            project,
            title,
            body,
        }
    }
}

/// Payload for creating a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub content: TaskContent,
    pub parent_id: Option<i64>,
}

/// Extract the task title from the task body.
pub fn title_from_body(body: &str) -> &str {
    match body.find('\n') {
        Some(idx) => &body[..idx],
        None => body,
    }
}

/// Extract the project name from the task title.
pub fn project_from_title<'a>(title: &'a str, default_project: &'a str) -> &'a str {
    match title.find(':') {
        Some(idx) => &title[..idx],
        None => default_project,
    }
}

/// A position in the workflow list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoState {
    pub idx: i32,
    pub label: String,
}

/// Ordered workflow labels, e.g. TODO -> WAIT -> DONE.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoStates(Vec<String>);

impl Default for TodoStates {
    fn default() -> Self {
        Self(vec!["TODO".into(), "WAIT".into(), "DONE".into()])
    }
}

impl TodoStates {
    pub fn new(labels: Vec<String>) -> Self {
        Self(labels)
    }

    pub fn labels(&self) -> &[String] {
        &self.0
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.0.iter().position(|s| s == label)
    }

    /// Next state in the forward cycle.
    ///
    /// No state (or a label that is not in the list) moves to the first entry.
    /// The last entry moves to no state at all.
    pub fn advance(&self, current: Option<&str>) -> Option<TodoState> {
        let next = match current.and_then(|label| self.index_of(label)) {
            Some(idx) => idx + 1,
            None => 0,
        };

        self.0.get(next).map(|label| TodoState {
            idx: next as i32,
            label: label.clone(),
        })
    }
}
