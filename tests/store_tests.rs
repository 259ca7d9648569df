//! Integration tests for the database layer.
//!
//! These tests verify the store operations using an in-memory SQLite database.
//! Tests are organized by module and functionality.

use chrono::{Duration, Utc};
use mort::db::Database;
use mort::error::{ErrorCode, error_code};
use mort::range::TimeRange;
use mort::types::{NewTask, TaskContent, TaskQuery, TodoState, TodoStates};
use std::thread::sleep;
use std::time::Duration as StdDuration;

/// Helper to create a fresh in-memory database for testing.
fn setup_db() -> Database {
    Database::open_in_memory().expect("Failed to create in-memory database")
}

fn new_task(db: &Database, body: &str, parent_id: Option<i64>) -> i64 {
    db.create_task(&NewTask {
        content: TaskContent::from_body(body, "default"),
        parent_id,
    })
    .expect("Failed to create task")
}

/// Timestamps have millisecond resolution; keep updates apart.
fn tick() {
    sleep(StdDuration::from_millis(5));
}

fn ids(tasks: &[mort::types::Task]) -> Vec<i64> {
    tasks.iter().map(|t| t.id).collect()
}

fn open_entries(db: &Database) -> usize {
    db.get_timesheet(&TimeRange::today())
        .unwrap()
        .iter()
        .filter(|e| e.is_open())
        .count()
}

mod task_tests {
    use super::*;

    #[test]
    fn create_derives_title_and_project() {
        let db = setup_db();
        let id = new_task(&db, "work: write report\nsections 1-3", None);

        let task = db.require_task(id).unwrap();
        assert_eq!(task.title, "work: write report");
        assert_eq!(task.project, "work");
        assert_eq!(task.body, "work: write report\nsections 1-3");
        assert_eq!(task.created_at, task.updated_at);
        assert!(task.state.is_none());
    }

    #[test]
    fn create_with_missing_parent_fails() {
        let db = setup_db();
        let err = db
            .create_task(&NewTask {
                content: TaskContent::from_body("x", "default"),
                parent_id: Some(42),
            })
            .unwrap_err();
        assert_eq!(error_code(&err), Some(ErrorCode::TaskNotFound));
        assert!(db.get_tasks(&TaskQuery::default()).unwrap().is_empty());
    }

    #[test]
    fn update_moves_task_to_front() {
        let db = setup_db();
        let t1 = new_task(&db, "a: one", None);
        tick();
        let t2 = new_task(&db, "a: two", None);
        tick();
        let t3 = new_task(&db, "a: three", None);

        let tasks = db.get_tasks(&TaskQuery::default()).unwrap();
        assert_eq!(ids(&tasks), vec![t3, t2, t1]);

        tick();
        db.update_task(t1, &TaskContent::from_body("b: one again", "default"))
            .unwrap();

        let tasks = db.get_tasks(&TaskQuery::default()).unwrap();
        assert_eq!(ids(&tasks), vec![t1, t3, t2]);
        assert_eq!(tasks[0].project, "b");
    }

    #[test]
    fn update_unknown_task_is_not_found() {
        let db = setup_db();
        let err = db
            .update_task(7, &TaskContent::from_body("x", "default"))
            .unwrap_err();
        assert_eq!(error_code(&err), Some(ErrorCode::TaskNotFound));
    }

    #[test]
    fn delete_cascades_entries_and_orphans_children() {
        let db = setup_db();
        let parent = new_task(&db, "p: parent", None);
        let child = new_task(&db, "p: child", Some(parent));

        db.clock_in(parent).unwrap();
        let entry_id = db.get_timesheet(&TimeRange::today()).unwrap()[0].id;

        db.delete_task(parent).unwrap();

        assert!(db.get_task(parent).unwrap().is_none());
        assert!(db.get_timesheet_entry(entry_id).unwrap().is_none());
        assert!(db.session().unwrap().is_empty());
        assert_eq!(db.require_task(child).unwrap().parent_id, None);
    }

    #[test]
    fn schedule_round_trips_to_the_millisecond() {
        let db = setup_db();
        let id = new_task(&db, "a: plan", None);
        let at = Utc::now() + Duration::days(3);

        db.set_scheduled(id, Some(at)).unwrap();
        let scheduled = db.require_task(id).unwrap().scheduled_at.unwrap();
        assert_eq!(scheduled.timestamp_millis(), at.timestamp_millis());

        db.set_scheduled(id, None).unwrap();
        assert!(db.require_task(id).unwrap().scheduled_at.is_none());
    }
}

mod query_tests {
    use super::*;

    #[test]
    fn archived_tasks_are_hidden_by_default() {
        let db = setup_db();
        let kept = new_task(&db, "a: keep", None);
        let gone = new_task(&db, "a: gone", None);
        db.set_archived(gone, true).unwrap();

        let visible = db.get_tasks(&TaskQuery::default()).unwrap();
        assert_eq!(ids(&visible), vec![kept]);

        let all = db
            .get_tasks(&TaskQuery {
                archived: true,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(all.len(), 2);

        db.set_archived(gone, false).unwrap();
        assert_eq!(db.get_tasks(&TaskQuery::default()).unwrap().len(), 2);
    }

    #[test]
    fn parent_filter_matches_parent_and_direct_children() {
        let db = setup_db();
        let a = new_task(&db, "p: a", None);
        let b = new_task(&db, "p: b", Some(a));
        let c = new_task(&db, "p: c", Some(b));
        let _other = new_task(&db, "p: other", None);

        let mut found = ids(&db
            .get_tasks(&TaskQuery {
                parent_id: Some(a),
                ..Default::default()
            })
            .unwrap());
        found.sort();
        assert_eq!(found, vec![a, b]);
        assert!(!found.contains(&c));
    }

    #[test]
    fn non_positive_parent_is_ignored() {
        let db = setup_db();
        new_task(&db, "p: a", None);
        new_task(&db, "p: b", None);

        let tasks = db
            .get_tasks(&TaskQuery {
                parent_id: Some(0),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(tasks.len(), 2);
    }

    #[test]
    fn project_filter_is_exact() {
        let db = setup_db();
        let work = new_task(&db, "work: a", None);
        new_task(&db, "workshop: b", None);

        let tasks = db
            .get_tasks(&TaskQuery {
                project: Some("work".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(ids(&tasks), vec![work]);
    }

    #[test]
    fn search_is_case_insensitive_and_literal() {
        let db = setup_db();
        let hit = new_task(&db, "a: Fix Login\nuses 100% of CPU", None);
        new_task(&db, "a: other\nnothing here", None);

        let by_title = db
            .get_tasks(&TaskQuery {
                search_title: Some("LOGIN".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(ids(&by_title), vec![hit]);

        let by_body = db
            .get_tasks(&TaskQuery {
                search_body: Some("100%".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(ids(&by_body), vec![hit]);

        let wildcard = db
            .get_tasks(&TaskQuery {
                search_body: Some("%".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(ids(&wildcard), vec![hit]);
    }

    #[test]
    fn todo_view_orders_by_state_then_recency() {
        let db = setup_db();
        let states = TodoStates::default();
        let waiting = new_task(&db, "a: waiting", None);
        tick();
        let todo_old = new_task(&db, "a: todo old", None);
        tick();
        let todo_new = new_task(&db, "a: todo new", None);
        new_task(&db, "a: no state", None);

        let todo = states.advance(None).unwrap();
        let wait = states.advance(Some("TODO")).unwrap();
        db.set_todo_state(waiting, Some(&wait)).unwrap();
        db.set_todo_state(todo_old, Some(&todo)).unwrap();
        db.set_todo_state(todo_new, Some(&todo)).unwrap();

        let tasks = db
            .get_tasks(&TaskQuery {
                todo: true,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(ids(&tasks), vec![todo_new, todo_old, waiting]);
    }

    #[test]
    fn clearing_state_removes_task_from_todo_view() {
        let db = setup_db();
        let id = new_task(&db, "a: x", None);
        db.set_todo_state(
            id,
            Some(&TodoState {
                idx: 0,
                label: "TODO".into(),
            }),
        )
        .unwrap();
        db.set_todo_state(id, None).unwrap();

        let task = db.require_task(id).unwrap();
        assert!(task.state.is_none() && task.state_idx.is_none());
        let todo = TaskQuery {
            todo: true,
            ..Default::default()
        };
        assert!(db.get_tasks(&todo).unwrap().is_empty());
    }

    #[test]
    fn range_matches_created_or_updated() {
        let db = setup_db();
        let id = new_task(&db, "a: today", None);

        let today = TaskQuery {
            range: Some(TimeRange::today()),
            ..Default::default()
        };
        assert_eq!(ids(&db.get_tasks(&today).unwrap()), vec![id]);

        let yesterday = TaskQuery {
            range: Some(TimeRange::today().prev()),
            ..Default::default()
        };
        assert!(db.get_tasks(&yesterday).unwrap().is_empty());
    }

    #[test]
    fn filters_combine_with_and() {
        let db = setup_db();
        let hit = new_task(&db, "work: deploy", None);
        new_task(&db, "home: deploy", None);
        new_task(&db, "work: review", None);

        let tasks = db
            .get_tasks(&TaskQuery {
                project: Some("work".into()),
                search_title: Some("deploy".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(ids(&tasks), vec![hit]);
    }
}

mod clock_tests {
    use super::*;

    #[test]
    fn clock_in_opens_one_interval() {
        let db = setup_db();
        let id = new_task(&db, "a: work", None);

        db.clock_in(id).unwrap();

        let session = db.session().unwrap();
        assert_eq!(session.active_task_id, Some(id));
        assert!(session.active_entry_id.is_some());
        assert_eq!(session.paused_task_id, None);
        assert!(db.require_task(id).unwrap().clockin_at.is_some());
        assert_eq!(open_entries(&db), 1);
    }

    #[test]
    fn clock_in_elsewhere_closes_previous_interval() {
        let db = setup_db();
        let first = new_task(&db, "a: first", None);
        let second = new_task(&db, "a: second", None);

        db.clock_in(first).unwrap();
        db.clock_in(second).unwrap();

        assert_eq!(db.get_active_task_id().unwrap(), Some(second));
        assert!(db.require_task(first).unwrap().clockin_at.is_none());
        assert!(db.require_task(second).unwrap().clockin_at.is_some());

        let entries = db.get_timesheet(&TimeRange::today()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(open_entries(&db), 1);
        let open = entries.iter().find(|e| e.is_open()).unwrap();
        assert_eq!(open.task_id, second);
    }

    #[test]
    fn clock_in_unknown_task_changes_nothing() {
        let db = setup_db();
        let id = new_task(&db, "a: work", None);
        db.clock_in(id).unwrap();

        let err = db.clock_in(999).unwrap_err();
        assert_eq!(error_code(&err), Some(ErrorCode::TaskNotFound));
        assert_eq!(db.get_active_task_id().unwrap(), Some(id));
        assert_eq!(open_entries(&db), 1);
    }

    #[test]
    fn clock_out_closes_everything() {
        let db = setup_db();
        let id = new_task(&db, "a: work", None);
        db.clock_in(id).unwrap();

        db.clock_out().unwrap();

        assert!(db.session().unwrap().is_empty());
        assert!(db.require_task(id).unwrap().clockin_at.is_none());
        assert_eq!(open_entries(&db), 0);
        let entry = &db.get_timesheet(&TimeRange::today()).unwrap()[0];
        assert!(entry.clockout_at.unwrap() >= entry.clockin_at);
    }

    #[test]
    fn clock_out_twice_is_a_no_op() {
        let db = setup_db();
        let id = new_task(&db, "a: work", None);
        db.clock_in(id).unwrap();
        db.clock_out().unwrap();

        let before = db.require_task(id).unwrap();
        let entries_before = db.get_timesheet(&TimeRange::today()).unwrap();
        tick();
        db.clock_out().unwrap();

        assert_eq!(db.require_task(id).unwrap(), before);
        assert_eq!(db.get_timesheet(&TimeRange::today()).unwrap(), entries_before);
    }

    #[test]
    fn pause_and_resume_start_a_fresh_interval() {
        let db = setup_db();
        let id = new_task(&db, "a: work", None);
        db.clock_in(id).unwrap();

        assert_eq!(db.pause().unwrap(), Some(id));

        let session = db.session().unwrap();
        assert_eq!(session.active_task_id, None);
        assert_eq!(session.paused_task_id, Some(id));
        let task = db.require_task(id).unwrap();
        assert!(task.paused_at.is_some() && task.clockin_at.is_none());
        assert_eq!(open_entries(&db), 0);

        db.clock_in(id).unwrap();

        let task = db.require_task(id).unwrap();
        assert!(task.paused_at.is_none() && task.clockin_at.is_some());
        assert_eq!(db.get_paused_task_id().unwrap(), None);

        let entries = db.get_timesheet(&TimeRange::today()).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(!entries[0].is_open());
        assert!(entries[1].is_open());
    }

    #[test]
    fn pause_with_nothing_active_returns_none() {
        let db = setup_db();
        new_task(&db, "a: idle", None);
        assert_eq!(db.pause().unwrap(), None);
        assert!(db.session().unwrap().is_empty());
    }

    #[test]
    fn clock_in_elsewhere_drops_the_paused_task() {
        let db = setup_db();
        let paused = new_task(&db, "a: paused", None);
        let other = new_task(&db, "a: other", None);
        db.clock_in(paused).unwrap();
        db.pause().unwrap();

        db.clock_in(other).unwrap();

        assert!(db.require_task(paused).unwrap().paused_at.is_none());
        let session = db.session().unwrap();
        assert_eq!(session.active_task_id, Some(other));
        assert_eq!(session.paused_task_id, None);
    }

    /// Check the single-active-task rules with direct counts.
    fn assert_clock_invariants(db: &Database, step: &str) {
        let (clocked, paused, both, open): (i64, i64, i64, i64) = db
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT
                        (SELECT COUNT(*) FROM tasks WHERE clockin_at IS NOT NULL),
                        (SELECT COUNT(*) FROM tasks WHERE paused_at IS NOT NULL),
                        (SELECT COUNT(*) FROM tasks
                          WHERE clockin_at IS NOT NULL AND paused_at IS NOT NULL),
                        (SELECT COUNT(*) FROM timesheet WHERE clockout_at IS NULL)",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
                )?)
            })
            .unwrap();

        assert!(clocked <= 1, "{step}: {clocked} tasks clocked in");
        assert!(paused <= 1, "{step}: {paused} tasks paused");
        assert_eq!(both, 0, "{step}: task both clocked in and paused");
        assert!(open <= 1, "{step}: {open} open entries");

        let open_task: Option<i64> = db
            .with_conn(|conn| {
                use rusqlite::OptionalExtension;
                Ok(conn
                    .query_row(
                        "SELECT task_id FROM timesheet WHERE clockout_at IS NULL",
                        [],
                        |row| row.get(0),
                    )
                    .optional()?)
            })
            .unwrap();
        let session = db.session().unwrap();
        assert_eq!(open_task, session.active_task_id, "{step}: open entry task");
        assert_eq!(clocked == 1, session.active_task_id.is_some(), "{step}");
        assert_eq!(paused == 1, session.paused_task_id.is_some(), "{step}");
    }

    #[derive(Debug, Clone, Copy)]
    enum Step {
        In(usize),
        Out,
        Pause,
    }

    #[test]
    fn mixed_sequence_keeps_one_active_task() {
        let db = setup_db();
        let tasks = [
            new_task(&db, "a: one", None),
            new_task(&db, "b: two", None),
            new_task(&db, "c: three", None),
        ];
        assert_clock_invariants(&db, "start");

        let script = [
            Step::In(0),
            Step::In(1),
            Step::In(2),
            Step::In(2),
            Step::Pause,
            Step::In(2),
            Step::Pause,
            Step::Pause,
            Step::In(0),
            Step::Out,
            Step::Out,
            Step::Pause,
            Step::In(1),
            Step::Pause,
            Step::In(0),
            Step::In(1),
            Step::Out,
            Step::In(2),
            Step::In(0),
            Step::Pause,
            Step::Out,
        ];

        // Repeat the script with the tasks rotated so every task takes
        // every role.
        for round in 0..tasks.len() {
            for (i, step) in script.iter().enumerate() {
                match *step {
                    Step::In(t) => db.clock_in(tasks[(t + round) % tasks.len()]).unwrap(),
                    Step::Out => db.clock_out().unwrap(),
                    Step::Pause => {
                        db.pause().unwrap();
                    }
                }
                assert_clock_invariants(&db, &format!("round {round} step {i} {step:?}"));
            }
        }

        assert!(db.session().unwrap().is_empty());
    }

    #[test]
    fn active_task_is_returned() {
        let db = setup_db();
        assert!(db.get_active_task().unwrap().is_none());

        let id = new_task(&db, "a: work", None);
        db.clock_in(id).unwrap();
        assert_eq!(db.get_active_task().unwrap().map(|t| t.id), Some(id));
    }
}

mod timesheet_tests {
    use super::*;

    #[test]
    fn entries_carry_task_title_and_project() {
        let db = setup_db();
        let id = new_task(&db, "work: report", None);
        db.clock_in(id).unwrap();

        let entries = db.get_timesheet(&TimeRange::today()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].task_id, id);
        assert_eq!(entries[0].project, "work");
        assert_eq!(entries[0].title, "work: report");
    }

    #[test]
    fn open_entry_from_yesterday_is_not_in_today() {
        let db = setup_db();
        let id = new_task(&db, "a: long", None);
        db.clock_in(id).unwrap();
        let entry_id = db.session().unwrap().active_entry_id.unwrap();

        let yesterday = TimeRange::today().start - Duration::hours(1);
        db.update_timesheet_entry(entry_id, Some(yesterday), None)
            .unwrap();

        assert!(db.get_timesheet(&TimeRange::today()).unwrap().is_empty());
        let earlier = db.get_timesheet(&TimeRange::today().prev()).unwrap();
        assert_eq!(earlier.len(), 1);
        assert!(earlier[0].is_open());

        // The active task follows its open entry.
        let task = db.require_task(id).unwrap();
        assert_eq!(
            task.clockin_at.unwrap().timestamp_millis(),
            yesterday.timestamp_millis()
        );
    }

    #[test]
    fn closed_entry_must_end_inside_range() {
        let db = setup_db();
        let id = new_task(&db, "a: late", None);
        db.clock_in(id).unwrap();
        db.clock_out().unwrap();
        let entry = db.get_timesheet(&TimeRange::today()).unwrap()[0].clone();

        let range = TimeRange::today();
        let start = range.start + Duration::hours(23);
        let end = range.end + Duration::hours(1);
        db.update_timesheet_entry(entry.id, Some(start), Some(end))
            .unwrap();

        assert!(db.get_timesheet(&range).unwrap().is_empty());
    }

    #[test]
    fn edits_are_validated() {
        let db = setup_db();
        let id = new_task(&db, "a: work", None);
        db.clock_in(id).unwrap();
        let open_id = db.session().unwrap().active_entry_id.unwrap();

        let err = db
            .update_timesheet_entry(open_id, None, Some(Utc::now()))
            .unwrap_err();
        assert_eq!(error_code(&err), Some(ErrorCode::InvalidFieldValue));

        db.clock_out().unwrap();
        let entry = db.get_timesheet_entry(open_id).unwrap().unwrap();
        let end = entry.clockout_at.unwrap();

        let err = db
            .update_timesheet_entry(open_id, Some(end + Duration::minutes(5)), None)
            .unwrap_err();
        assert_eq!(error_code(&err), Some(ErrorCode::InvalidFieldValue));
        assert_eq!(db.get_timesheet_entry(open_id).unwrap().unwrap(), entry);

        let err = db.update_timesheet_entry(999, None, None).unwrap_err();
        assert_eq!(error_code(&err), Some(ErrorCode::EntryNotFound));
    }

    #[test]
    fn edit_moves_both_ends() {
        let db = setup_db();
        let id = new_task(&db, "a: work", None);
        db.clock_in(id).unwrap();
        db.clock_out().unwrap();
        let entry_id = db.get_timesheet(&TimeRange::today()).unwrap()[0].id;

        let start = TimeRange::today().start + Duration::hours(9);
        let end = start + Duration::minutes(90);
        db.update_timesheet_entry(entry_id, Some(start), Some(end))
            .unwrap();

        let entry = db.get_timesheet_entry(entry_id).unwrap().unwrap();
        assert_eq!(entry.duration(Utc::now()), Duration::minutes(90));
    }

    #[test]
    fn summary_totals_per_project() {
        let db = setup_db();
        let work = new_task(&db, "work: a", None);
        let home = new_task(&db, "home: b", None);
        let base = TimeRange::today().start;

        for (task, from, minutes) in [(work, 8, 30), (home, 9, 45), (work, 10, 15)] {
            db.clock_in(task).unwrap();
            db.clock_out().unwrap();
            let entry_id = db
                .get_timesheet(&TimeRange::today())
                .unwrap()
                .iter()
                .map(|e| e.id)
                .max()
                .unwrap();
            let start = base + Duration::hours(from);
            db.update_timesheet_entry(entry_id, Some(start), Some(start + Duration::minutes(minutes)))
                .unwrap();
        }

        let summary = db.timesheet_summary(&TimeRange::today()).unwrap();
        let projects: Vec<_> = summary
            .by_project
            .iter()
            .map(|p| (p.project.as_str(), p.duration.num_minutes()))
            .collect();
        assert_eq!(projects, vec![("home", 45), ("work", 45)]);
        assert_eq!(summary.total, Duration::minutes(90));
        assert!(!summary.open);
    }
}
