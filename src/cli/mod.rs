//! CLI command definitions for mort
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod list;
pub mod timesheet;

use clap::{Parser, Subcommand};
use list::ListArgs;
use timesheet::{TimesheetArgs, TimesheetEditArgs};

/// Personal task list and time tracker
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Path to database file (overrides config)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, global = true)]
    pub log: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List tasks (default if no subcommand given)
    List(ListArgs),

    /// Show one task with its body
    Show {
        task_id: i64,
    },

    /// Create a task from a project and a title
    New {
        #[arg(short, long)]
        project: String,

        #[arg(short, long)]
        title: String,
    },

    /// Create a task by editing a draft in $EDITOR
    Add {
        /// Parent task id
        #[arg(long)]
        parent: Option<i64>,
    },

    /// Edit a task body in $EDITOR
    Edit {
        task_id: i64,
    },

    /// Archive or unarchive a task
    Archive {
        task_id: i64,
    },

    /// Advance a task to its next todo state
    Todo {
        task_id: i64,
    },

    /// Set or clear the scheduled date (YYYY-MM-DD)
    Schedule {
        task_id: i64,

        /// Date to schedule on; omit to clear
        date: Option<String>,
    },

    /// Delete a task and its timesheet entries
    Delete {
        task_id: i64,
    },

    /// Start tracking time on a task
    ClockIn {
        task_id: i64,
    },

    /// Stop tracking time
    ClockOut,

    /// Pause the active task, or resume the paused one
    Pause,

    /// Print the current clock status
    Clock,

    /// Print today's tracked total
    Today,

    /// Print the timesheet for a day or week
    Timesheet(TimesheetArgs),

    /// Change the start or end of a timesheet entry
    TimesheetEdit(TimesheetEditArgs),
}
