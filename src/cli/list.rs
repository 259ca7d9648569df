//! List subcommand for mort CLI

use crate::filter::FilterState;
use crate::range::TimeRange;
use clap::Args;

/// Arguments for the list subcommand
#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Include archived tasks
    #[arg(short, long)]
    pub archived: bool,

    /// Only tasks with a todo state, in workflow order
    #[arg(short, long)]
    pub todo: bool,

    /// Only tasks of this project
    #[arg(short, long)]
    pub project: Option<String>,

    /// Only this task and its children
    #[arg(long, value_name = "ID")]
    pub parent: Option<i64>,

    /// Case-insensitive title search
    #[arg(long, value_name = "TEXT")]
    pub title: Option<String>,

    /// Case-insensitive body search
    #[arg(long, value_name = "TEXT")]
    pub body: Option<String>,

    /// Only tasks created or updated today
    #[arg(long, conflicts_with = "week")]
    pub today: bool,

    /// Only tasks created or updated this week
    #[arg(long)]
    pub week: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ListArgs {
    /// Build the filter state these flags describe.
    pub fn to_filter(&self) -> FilterState {
        let mut filter = FilterState::default();
        if self.archived {
            filter = filter.toggle_archived();
        }
        if self.todo {
            filter = filter.toggle_todo();
        }
        if let Some(title) = &self.title {
            filter = filter.with_title(title);
        }
        if let Some(body) = &self.body {
            filter = filter.with_body(body);
        }

        filter.project = self.project.clone().filter(|p| !p.is_empty());
        filter.parent_id = self.parent.filter(|&id| id > 0);

        if self.today || self.week {
            filter.range_enabled = true;
            filter.range = if self.week {
                TimeRange::this_week()
            } else {
                TimeRange::today()
            };
        }
        filter
    }
}
