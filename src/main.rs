//! Mort command line
//!
//! One-shot commands over the task database: listing, editing, clocking and
//! timesheet reports.

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate, TimeZone, Utc};
use clap::Parser;
use mort::app::{App, PauseOutcome};
use mort::cli::list::ListArgs;
use mort::cli::timesheet::{TimesheetArgs, TimesheetEditArgs};
use mort::cli::{Cli, Command};
use mort::config::Config;
use mort::db::Database;
use mort::draft::Drafts;
use mort::format::{
    format_checkin, format_task_line, format_tasks, format_timesheet, format_today, tasks_json,
    timesheet_json,
};
use mort::range::TimeRange;
use mort::report::summarize;
use std::fs::OpenOptions;
use std::path::Path;
use tracing::{Level, debug};
use tracing_subscriber::FmtSubscriber;

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {:#}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load_or_default(cli.config.as_deref().map(Path::new))?;
    init_logging(&cli, &config)?;

    // Override paths from CLI arguments
    if let Some(db_path) = &cli.database {
        config.store.db_path = db_path.into();
    }
    config.ensure_db_dir()?;

    let db = Database::open(&config.store.db_path)
        .with_context(|| format!("opening {}", config.store.db_path.display()))?;
    let mut app = App::new(db, config);

    match cli.command.unwrap_or(Command::List(ListArgs::default())) {
        Command::List(args) => run_list(&mut app, args),
        Command::Show { task_id } => run_show(&app, task_id),
        Command::New { project, title } => {
            let task_id = app.new_task(&project, &title)?;
            println!("{}", task_id);
            Ok(())
        }
        Command::Add { parent } => run_add(&mut app, parent),
        Command::Edit { task_id } => run_edit(&mut app, task_id),
        Command::Archive { task_id } => {
            app.toggle_archived(task_id)?;
            println!("{}", app.message());
            Ok(())
        }
        Command::Todo { task_id } => {
            match app.toggle_todo_state(task_id)? {
                Some(state) => println!("{}", state.label),
                None => println!("No state."),
            }
            Ok(())
        }
        Command::Schedule { task_id, date } => run_schedule(&app, task_id, date.as_deref()),
        Command::Delete { task_id } => {
            app.db().delete_task(task_id)?;
            println!("Deleted task {}.", task_id);
            Ok(())
        }
        Command::ClockIn { task_id } => {
            app.clock_in(task_id)?;
            println!("{}", app.message());
            Ok(())
        }
        Command::ClockOut => {
            app.clock_out()?;
            println!("{}", app.message());
            Ok(())
        }
        Command::Pause => {
            match app.toggle_pause()? {
                PauseOutcome::Paused(task_id) => println!("Paused {}.", task_id),
                PauseOutcome::Resumed(task_id) => println!("Resumed {}.", task_id),
            }
            Ok(())
        }
        Command::Clock => {
            if let Some(line) = format_checkin(&app.db().checkin_status()?) {
                println!("{}", line);
            }
            Ok(())
        }
        Command::Today => {
            let summary = app.db().timesheet_summary(&TimeRange::today())?;
            println!("{}", format_today(&summary));
            Ok(())
        }
        Command::Timesheet(args) => run_timesheet(&app, args),
        Command::TimesheetEdit(args) => run_timesheet_edit(&mut app, args),
    }
}

/// Where logs go: an explicit `--log`, else the configured file, else stderr.
fn log_target(explicit: Option<&str>, log_file: Option<&Path>) -> String {
    match (explicit, log_file) {
        (Some(target), _) => target.to_string(),
        (None, Some(path)) => path.display().to_string(),
        (None, None) => "2".to_string(),
    }
}

/// Install the tracing subscriber selected by `--log`.
fn init_logging(cli: &Cli, config: &Config) -> Result<()> {
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let target = log_target(cli.log.as_deref(), config.log_file.as_deref());

    match target.as_str() {
        "0" | "off" => {
            // No logging
        }
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            // Log to file (append mode)
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)
                .with_context(|| format!("opening log file {}", filename))?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

fn run_list(app: &mut App, args: ListArgs) -> Result<()> {
    app.set_filter(args.to_filter());
    let tasks = app.load_tasks()?;

    if args.json {
        println!("{}", tasks_json(&tasks)?);
    } else {
        if !tasks.is_empty() {
            println!("{}", format_tasks(&tasks, Utc::now(), &Local));
        }
        eprintln!("{}", app.message());
    }
    Ok(())
}

fn run_show(app: &App, task_id: i64) -> Result<()> {
    let task = app.db().require_task(task_id)?;
    println!("{}", format_task_line(&task, Utc::now(), &Local));
    if task.body != task.title {
        println!();
        println!("{}", task.body);
    }
    Ok(())
}

fn drafts(config: &Config) -> Drafts {
    Drafts::new(config.editor.draft_dir.clone(), config.editor.command())
}

fn run_add(app: &mut App, parent: Option<i64>) -> Result<()> {
    let drafts = drafts(app.config());

    // A child starts out in its parent's project.
    let template = match parent {
        Some(parent_id) => format!("{}: ", app.db().require_task(parent_id)?.project),
        None => String::new(),
    };

    // A draft left behind by a rejected add is picked up again.
    if drafts.get(0)?.trim().is_empty() {
        drafts.set(0, &template)?;
    }
    let body = drafts.edit(0, true)?;
    let task_id = app.create_task_from_body(body.trim_end(), template.trim_end(), parent)?;
    drafts.set(0, "")?;

    println!("{}", task_id);
    Ok(())
}

fn run_edit(app: &mut App, task_id: i64) -> Result<()> {
    let task = app.db().require_task(task_id)?;
    let drafts = drafts(app.config());

    drafts.set(task_id, &task.body)?;
    let body = drafts.edit(task_id, false)?;
    app.update_task_body(task_id, body.trim_end())?;

    println!("{}", app.message());
    Ok(())
}

fn run_schedule(app: &App, task_id: i64, date: Option<&str>) -> Result<()> {
    let at = match date {
        Some(date) => {
            let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .with_context(|| format!("invalid date {:?}, expected YYYY-MM-DD", date))?;
            let midnight = Local
                .from_local_datetime(&day.and_time(Default::default()))
                .earliest()
                .context("date does not exist in the local time zone")?;
            Some(midnight.with_timezone(&Utc))
        }
        None => None,
    };

    app.db().set_scheduled(task_id, at)?;
    debug!(task_id, scheduled = ?at, "Updated schedule");
    Ok(())
}

fn run_timesheet(app: &App, args: TimesheetArgs) -> Result<()> {
    let range = args.range();
    let entries = app.db().get_timesheet(&range)?;
    let summary = summarize(&entries, Utc::now());

    if args.json {
        println!("{}", timesheet_json(&entries, &summary)?);
        return Ok(());
    }

    println!("{}", range);
    if entries.is_empty() {
        println!("No entries.");
    } else {
        println!();
        println!("{}", format_timesheet(&entries, &summary, Utc::now(), &Local));
    }
    Ok(())
}

fn run_timesheet_edit(app: &mut App, args: TimesheetEditArgs) -> Result<()> {
    if args.start.is_none() && args.end.is_none() {
        bail!("nothing to change, pass --start and/or --end");
    }

    app.edit_timesheet_times(args.entry_id, args.start.as_deref(), args.end.as_deref())?;
    println!("{}", app.message());
    Ok(())
}
