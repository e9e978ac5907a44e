use std::collections::BTreeSet;

use chrono::NaiveDate;
use eiger_core::{
    ClonePlanRequest, CompletionPercentage, CompletionSubmission, EigerError, EigerStores,
    NewExercise, NewTrainingPlan, PlanPhase, TargetTimeUnit, Weekday, WorkoutUpdate,
};
use tempfile::TempDir;

fn setup() -> (TempDir, EigerStores) {
    let dir = tempfile::tempdir().unwrap();
    let stores = EigerStores::open(dir.path().join("eiger.sqlite")).unwrap();
    stores.initialize().unwrap();
    (dir, stores)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn new_plan(climber: &str, start: NaiveDate, weeks: u32, days: &[Weekday]) -> NewTrainingPlan {
    NewTrainingPlan {
        climber_id: climber.into(),
        name: "Base block".into(),
        description: "Finger strength and volume".into(),
        starting_date: start,
        duration_weeks: weeks,
        weekdays: days.iter().copied().collect::<BTreeSet<_>>(),
    }
}

fn reviewed_exercise(stores: &EigerStores, name: &str) -> String {
    let mut exercise = NewExercise::new(name);
    exercise.reviewed = true;
    exercise.should_have_time = true;
    exercise.should_have_repetition = true;
    stores.catalog.add_exercise(&exercise).unwrap().exercise_id
}

fn count(stores: &EigerStores, table: &str) -> i64 {
    let conn = stores.db.open().unwrap();
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .unwrap()
}

#[test]
fn create_plan_persists_weeks_and_dated_days() {
    let (_dir, stores) = setup();
    let tree = stores
        .plans
        .create_plan(&new_plan(
            "climber-a",
            date(2024, 1, 1),
            2,
            &[Weekday::Monday, Weekday::Wednesday, Weekday::Friday],
        ))
        .unwrap();

    let numbers: Vec<u32> = tree.weeks.iter().map(|week| week.week.number).collect();
    assert_eq!(numbers, vec![1, 2]);
    let dates: Vec<NaiveDate> = tree.days().map(|day| day.day.date).collect();
    assert_eq!(
        dates,
        vec![
            date(2024, 1, 1),
            date(2024, 1, 3),
            date(2024, 1, 5),
            date(2024, 1, 8),
            date(2024, 1, 10),
            date(2024, 1, 12),
        ]
    );
    assert_eq!(tree.workout_count(), 0);
    assert_eq!(count(&stores, "days"), 6);
}

#[test]
fn invalid_plan_is_rejected_before_any_write() {
    let (_dir, stores) = setup();
    let mut input = new_plan("climber-a", date(2024, 1, 1), 0, &[]);
    input.name = "  ".into();
    match stores.plans.create_plan(&input).unwrap_err() {
        EigerError::Validation(errors) => {
            assert!(errors.contains("name"));
            assert!(errors.contains("weekdays"));
            assert!(errors.contains("duration_weeks"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(count(&stores, "training_plans"), 0);
    assert_eq!(count(&stores, "weeks"), 0);
}

#[test]
fn clone_copies_workouts_onto_new_dates() {
    let (_dir, stores) = setup();
    let exercise_id = reviewed_exercise(&stores, "Repeaters");
    let source = stores
        .plans
        .create_plan(&new_plan(
            "trainer",
            date(2024, 1, 1),
            3,
            &[Weekday::Monday, Weekday::Friday],
        ))
        .unwrap();
    let first_day = &source.weeks[0].days[0].day;
    let selection = stores
        .plans
        .select_exercises(&first_day.day_id, &[exercise_id.clone()])
        .unwrap();
    let update = WorkoutUpdate {
        sets: Some(4),
        target_repetitions: Some(6),
        ..WorkoutUpdate::default()
    };
    stores
        .plans
        .update_workout(&selection.added[0].workout_id, &update)
        .unwrap();

    let request = ClonePlanRequest {
        climber_id: "climber-b".into(),
        starting_date: date(2024, 3, 4),
        name: Some("Spring block".into()),
    };
    let clone = stores.plans.clone_plan(&source.plan.plan_id, &request).unwrap();

    assert_ne!(clone.plan.plan_id, source.plan.plan_id);
    assert_eq!(clone.plan.climber_id, "climber-b");
    assert_eq!(clone.plan.name, "Spring block");
    assert_eq!(clone.plan.starting_date, date(2024, 3, 4));
    let numbers: Vec<u32> = clone.weeks.iter().map(|week| week.week.number).collect();
    assert_eq!(numbers, vec![10, 11, 12]);
    let first = &clone.weeks[0].days[0];
    assert_eq!(first.day.date, date(2024, 3, 4));
    assert_eq!(clone.weeks[0].days[1].day.date, date(2024, 3, 8));
    assert_eq!(first.workouts.len(), 1);
    assert_eq!(first.workouts[0].exercise_id, exercise_id);
    assert_eq!(first.workouts[0].targets.sets, 4);
    assert_eq!(first.workouts[0].targets.target_repetitions, Some(6));
    assert_ne!(first.workouts[0].workout_id, selection.added[0].workout_id);

    let reloaded = stores.plans.fetch_tree(&source.plan.plan_id).unwrap().unwrap();
    assert_eq!(reloaded.plan.climber_id, "trainer");
    assert_eq!(reloaded.weeks[0].days[0].day.date, date(2024, 1, 1));
    assert_eq!(reloaded.workout_count(), 1);
}

#[test]
fn clone_of_missing_plan_is_not_found() {
    let (_dir, stores) = setup();
    let request = ClonePlanRequest {
        climber_id: "climber-b".into(),
        starting_date: date(2024, 3, 4),
        name: None,
    };
    let err = stores.plans.clone_plan("missing", &request).unwrap_err();
    assert!(matches!(err, EigerError::NotFound { .. }));
    assert_eq!(count(&stores, "training_plans"), 0);
}

#[test]
fn clone_reports_dangling_exercise_as_integrity_error() {
    let (_dir, stores) = setup();
    let exercise_id = reviewed_exercise(&stores, "Repeaters");
    let tree = stores
        .plans
        .create_plan(&new_plan("climber-a", date(2024, 1, 1), 1, &[Weekday::Monday]))
        .unwrap();
    stores
        .plans
        .select_exercises(&tree.weeks[0].days[0].day.day_id, &[exercise_id])
        .unwrap();

    let conn = stores.db.open().unwrap();
    conn.execute_batch(
        "PRAGMA foreign_keys = OFF;
         UPDATE workouts SET exercise_id = 'retired-exercise';
         PRAGMA foreign_keys = ON;",
    )
    .unwrap();

    let err = stores
        .plans
        .clone_plan(
            &tree.plan.plan_id,
            &ClonePlanRequest {
                climber_id: "climber-b".into(),
                starting_date: date(2024, 3, 4),
                name: None,
            },
        )
        .unwrap_err();
    match err {
        EigerError::Integrity(message) => assert!(message.contains("FOREIGN KEY")),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(count(&stores, "training_plans"), 1);
    assert_eq!(count(&stores, "workouts"), 1);
}

#[test]
fn plans_are_private_to_their_owner() {
    let (_dir, stores) = setup();
    let tree = stores
        .plans
        .create_plan(&new_plan("climber-a", date(2024, 1, 1), 1, &[Weekday::Monday]))
        .unwrap();
    assert!(stores.plans.retrieve_plan(&tree.plan.plan_id, "climber-a").is_ok());
    let err = stores
        .plans
        .retrieve_plan(&tree.plan.plan_id, "climber-b")
        .unwrap_err();
    assert!(matches!(err, EigerError::NotFound { .. }));
    let err = stores
        .plans
        .delete_plan(&tree.plan.plan_id, "climber-b")
        .unwrap_err();
    assert!(matches!(err, EigerError::NotFound { .. }));
}

#[test]
fn selecting_exercises_adds_new_and_removes_deselected() {
    let (_dir, stores) = setup();
    let hangs = reviewed_exercise(&stores, "Max hangs");
    let pulls = reviewed_exercise(&stores, "Pull-ups");
    let core = reviewed_exercise(&stores, "Front lever");
    let tree = stores
        .plans
        .create_plan(&new_plan("climber-a", date(2024, 1, 1), 1, &[Weekday::Tuesday]))
        .unwrap();
    let day_id = tree.weeks[0].days[0].day.day_id.clone();

    let first = stores
        .plans
        .select_exercises(&day_id, &[hangs.clone(), pulls.clone()])
        .unwrap();
    assert_eq!(first.added.len(), 2);
    assert!(first.removed.is_empty());

    let second = stores
        .plans
        .select_exercises(&day_id, &[pulls.clone(), core.clone()])
        .unwrap();
    assert_eq!(second.added.len(), 1);
    assert_eq!(second.added[0].exercise_id, core);
    assert_eq!(second.removed.len(), 1);

    let detail = stores.plans.fetch_day(&day_id).unwrap();
    let mut selected: Vec<String> = detail
        .workouts
        .iter()
        .map(|workout| workout.exercise_id.clone())
        .collect();
    selected.sort();
    let mut expected = vec![pulls, core];
    expected.sort();
    assert_eq!(selected, expected);
}

#[test]
fn selection_rejects_unreviewed_and_empty_choices() {
    let (_dir, stores) = setup();
    let draft = stores
        .catalog
        .add_exercise(&NewExercise::new("Campus ladders"))
        .unwrap();
    let tree = stores
        .plans
        .create_plan(&new_plan("climber-a", date(2024, 1, 1), 1, &[Weekday::Monday]))
        .unwrap();
    let day_id = &tree.weeks[0].days[0].day.day_id;

    let err = stores
        .plans
        .select_exercises(day_id, &[draft.exercise_id])
        .unwrap_err();
    assert!(matches!(err, EigerError::Validation(_)));
    let err = stores.plans.select_exercises(day_id, &[]).unwrap_err();
    assert!(matches!(err, EigerError::Validation(_)));
    assert_eq!(count(&stores, "workouts"), 0);
}

#[test]
fn moving_a_day_stays_within_its_calendar_week() {
    let (_dir, stores) = setup();
    let tree = stores
        .plans
        .create_plan(&new_plan(
            "climber-a",
            date(2024, 1, 1),
            1,
            &[Weekday::Monday, Weekday::Wednesday],
        ))
        .unwrap();
    let monday = tree.weeks[0].days[0].day.clone();

    let detail = stores.plans.fetch_day(&monday.day_id).unwrap();
    assert_eq!(detail.available_dates.len(), 6);
    assert!(!detail.available_dates.contains(&date(2024, 1, 3)));

    let err = stores
        .plans
        .move_day(&monday.day_id, date(2024, 1, 3))
        .unwrap_err();
    assert!(matches!(err, EigerError::Validation(_)));
    let err = stores
        .plans
        .move_day(&monday.day_id, date(2024, 1, 9))
        .unwrap_err();
    assert!(matches!(err, EigerError::Validation(_)));

    let moved = stores
        .plans
        .move_day(&monday.day_id, date(2024, 1, 2))
        .unwrap();
    assert_eq!(moved.date, date(2024, 1, 2));
    assert_eq!(moved.day_of_week, Weekday::Tuesday);
    let reloaded = stores.plans.fetch_day(&monday.day_id).unwrap();
    assert_eq!(reloaded.day.day_of_week, Weekday::Tuesday);

    stores
        .plans
        .update_day_notes(&monday.day_id, "Gym closed Monday")
        .unwrap();
    let reloaded = stores.plans.fetch_day(&monday.day_id).unwrap();
    assert_eq!(reloaded.day.notes, "Gym closed Monday");
}

#[test]
fn delete_removes_every_child_row() {
    let (_dir, stores) = setup();
    let exercise_id = reviewed_exercise(&stores, "Limit bouldering");
    let tree = stores
        .plans
        .create_plan(&new_plan(
            "climber-a",
            date(2024, 1, 1),
            2,
            &[Weekday::Monday, Weekday::Thursday],
        ))
        .unwrap();
    let day_id = &tree.weeks[0].days[0].day.day_id;
    let selection = stores
        .plans
        .select_exercises(day_id, &[exercise_id])
        .unwrap();
    stores
        .completions
        .record_completion(
            &selection.added[0].workout_id,
            "climber-a",
            &CompletionSubmission::new(CompletionPercentage::Full),
            chrono::Utc::now(),
        )
        .unwrap();

    let removed = stores.plans.delete_plan(&tree.plan.plan_id, "climber-a").unwrap();
    assert!(removed >= 1 + 4 + 2 + 1 + 1);
    assert!(stores.plans.fetch_plan(&tree.plan.plan_id).unwrap().is_none());
    for table in ["training_plans", "weeks", "days", "workouts", "completed_workouts"] {
        assert_eq!(count(&stores, table), 0, "{table} should be empty");
    }
    assert_eq!(count(&stores, "exercises"), 1);
}

#[test]
fn overview_splits_plans_by_phase() {
    let (_dir, stores) = setup();
    let exercise_id = reviewed_exercise(&stores, "Hangboard repeaters");
    let running = stores
        .plans
        .create_plan(&new_plan(
            "climber-a",
            date(2024, 1, 1),
            3,
            &[Weekday::Monday, Weekday::Thursday],
        ))
        .unwrap();
    stores
        .plans
        .create_plan(&new_plan("climber-a", date(2024, 2, 5), 2, &[Weekday::Monday]))
        .unwrap();
    stores
        .plans
        .create_plan(&new_plan("climber-a", date(2023, 10, 2), 2, &[Weekday::Monday]))
        .unwrap();
    stores
        .plans
        .create_plan(&new_plan("climber-b", date(2024, 1, 1), 3, &[Weekday::Monday]))
        .unwrap();

    let second_monday = &running.weeks[1].days[0].day;
    assert_eq!(second_monday.date, date(2024, 1, 8));
    stores
        .plans
        .select_exercises(&second_monday.day_id, &[exercise_id])
        .unwrap();

    let overview = stores.plans.overview("climber-a", date(2024, 1, 8)).unwrap();
    assert_eq!(overview.in_progress.len(), 1);
    assert_eq!(overview.upcoming.len(), 1);
    assert_eq!(overview.completed.len(), 1);
    let summary = &overview.in_progress[0];
    assert_eq!(summary.phase, PlanPhase::InProgress);
    assert_eq!(summary.current_week, Some(2));
    assert_eq!(summary.total_weeks, 3);
    assert_eq!(overview.planned_workouts_for_today.len(), 1);
    let scheduled = &overview.planned_workouts_for_today[0];
    assert_eq!(scheduled.exercise_name, "Hangboard repeaters");
    assert_eq!(scheduled.plan_id, running.plan.plan_id);
    assert!(!scheduled.completed);
}

#[test]
fn workout_update_converts_time_and_ignores_unused_targets() {
    let (_dir, stores) = setup();
    let exercise_id = reviewed_exercise(&stores, "Hangs");
    let tree = stores
        .plans
        .create_plan(&new_plan("climber-a", date(2024, 1, 1), 1, &[Weekday::Monday]))
        .unwrap();
    let selection = stores
        .plans
        .select_exercises(&tree.weeks[0].days[0].day.day_id, &[exercise_id])
        .unwrap();
    let workout_id = &selection.added[0].workout_id;

    let update = WorkoutUpdate {
        sets: Some(3),
        target_time: Some(2),
        target_time_unit: Some(TargetTimeUnit::Minutes),
        rest_per_set: Some(3),
        target_weight_in_kilos: Some(10),
        ..WorkoutUpdate::default()
    };
    let workout = stores.plans.update_workout(workout_id, &update).unwrap();
    assert_eq!(workout.targets.sets, 3);
    assert_eq!(workout.targets.target_time_in_seconds, Some(120));
    assert_eq!(workout.targets.rest_per_set_in_seconds, Some(180));
    assert_eq!(workout.targets.target_time(), Some(2));
    assert_eq!(workout.targets.target_weight_in_kilos, None);

    let stored = stores.plans.fetch_workout(workout_id).unwrap().unwrap();
    assert_eq!(stored, workout);

    let err = stores
        .plans
        .update_workout(
            workout_id,
            &WorkoutUpdate {
                sets: Some(0),
                ..WorkoutUpdate::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, EigerError::Validation(_)));
}
