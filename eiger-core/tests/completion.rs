use std::collections::BTreeSet;
use std::sync::Barrier;
use std::thread;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use eiger_core::{
    ArmProtocol, CompletionPayload, CompletionPercentage, CompletionSubmission, EigerError,
    EigerStores, FanoutConfig, FanoutOutcome, GripType, MetricType, NewExercise, NewTrainingPlan,
    TestConfiguration, Weekday, WorkoutUpdate,
};
use tempfile::TempDir;

fn setup() -> (TempDir, EigerStores) {
    let dir = tempfile::tempdir().unwrap();
    let stores = EigerStores::open(dir.path().join("eiger.sqlite")).unwrap();
    stores.initialize().unwrap();
    (dir, stores)
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 6, 18, 30, 0).unwrap()
}

/// Creates a one-day plan for `climber-a` holding a single workout of
/// `exercise` and returns the workout id.
fn workout_for(stores: &EigerStores, exercise: NewExercise) -> String {
    let exercise = stores.catalog.add_exercise(&exercise).unwrap();
    let plan = stores
        .plans
        .create_plan(&NewTrainingPlan {
            climber_id: "climber-a".into(),
            name: "Test week".into(),
            description: String::new(),
            starting_date: NaiveDate::from_ymd_opt(2024, 5, 6).unwrap(),
            duration_weeks: 1,
            weekdays: BTreeSet::from([Weekday::Monday]),
        })
        .unwrap();
    let selection = stores
        .plans
        .select_exercises(&plan.weeks[0].days[0].day.day_id, &[exercise.exercise_id])
        .unwrap();
    selection.added[0].workout_id.clone()
}

fn reviewed(name: &str) -> NewExercise {
    let mut exercise = NewExercise::new(name);
    exercise.reviewed = true;
    exercise
}

fn weighted_test(name: &str, metric_types: Vec<MetricType>) -> NewExercise {
    let mut exercise = reviewed(name);
    exercise.is_test = true;
    exercise.should_add_weight = true;
    exercise.metric_types = metric_types;
    exercise
}

fn count(stores: &EigerStores, table: &str) -> i64 {
    let conn = stores.db.open().unwrap();
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .unwrap()
}

#[test]
fn second_completion_of_a_workout_is_rejected() {
    let (_dir, stores) = setup();
    let workout_id = workout_for(&stores, reviewed("Easy mileage"));
    let rpe = stores.catalog.add_rpe(6, "Hard", "Two reps in reserve").unwrap();
    let mut submission = CompletionSubmission::new(CompletionPercentage::ThreeQuarters);
    submission.perceived_rpe_id = Some(rpe.rpe_id.clone());
    submission.notes = "Felt strong".into();

    let receipt = stores
        .completions
        .record_completion(&workout_id, "climber-a", &submission, now())
        .unwrap();
    assert_eq!(receipt.completed.workout_id, workout_id);
    assert_eq!(
        receipt.completed.completion_percentage,
        CompletionPercentage::ThreeQuarters
    );
    assert_eq!(receipt.completed.perceived_rpe_id, Some(rpe.rpe_id));
    assert_eq!(receipt.outbox_id, None);

    let err = stores
        .completions
        .record_completion(&workout_id, "climber-a", &submission, now())
        .unwrap_err();
    match err {
        EigerError::AlreadyCompleted { workout_id: id } => assert_eq!(id, workout_id),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(count(&stores, "completed_workouts"), 1);
    assert_eq!(count(&stores, "metric_outbox"), 0);
}

#[test]
fn concurrent_completions_leave_one_winner() {
    let (_dir, stores) = setup();
    let workout_id = workout_for(
        &stores,
        weighted_test("Max hang test", vec![MetricType::HangboardMaxWeight]),
    );
    let mut submission = CompletionSubmission::new(CompletionPercentage::Full);
    submission.test_value = Some("30".into());
    submission.payload = CompletionPayload::WeightTest { weight_in_kilos: 30 };

    let writers = 8;
    let barrier = Barrier::new(writers);
    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..writers)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    stores.completions.record_completion(
                        &workout_id,
                        "climber-a",
                        &submission,
                        now(),
                    )
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    let winners = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(winners, 1);
    for result in results.into_iter().filter_map(|result| result.err()) {
        match result {
            EigerError::AlreadyCompleted { workout_id: id } => assert_eq!(id, workout_id),
            other => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(count(&stores, "completed_workouts"), 1);
    assert_eq!(count(&stores, "metric_outbox"), 1);
}

#[tokio::test]
async fn test_completion_fans_out_one_metric_per_type() {
    let (_dir, stores) = setup();
    let workout_id = workout_for(
        &stores,
        weighted_test(
            "Weighted pull-up test",
            vec![
                MetricType::WeightedPullUps,
                MetricType::HangboardMaxWeight,
                MetricType::MaxFlashBoulderGrade,
            ],
        ),
    );
    let mut submission = CompletionSubmission::new(CompletionPercentage::Full);
    submission.test_value = Some("42".into());
    submission.payload = CompletionPayload::WeightTest { weight_in_kilos: 42 };

    let receipt = stores
        .completions
        .record_completion(&workout_id, "climber-a", &submission, now())
        .unwrap();
    let outbox_id = receipt.outbox_id.expect("test completion queues a fan-out");
    assert!(stores
        .completions
        .list_metrics("climber-a", None)
        .unwrap()
        .is_empty());

    let fanout = stores.fanout(FanoutConfig {
        jitter_seconds: 0,
        ..FanoutConfig::default()
    });
    let outcomes = fanout.drain(now()).await.unwrap();
    assert_eq!(
        outcomes,
        vec![FanoutOutcome::Delivered {
            outbox_id,
            metrics_written: 3,
        }]
    );

    let metrics = stores.completions.list_metrics("climber-a", None).unwrap();
    assert_eq!(metrics.len(), 3);
    assert!(metrics.iter().all(|metric| metric.value == "42"));
    assert!(metrics.iter().all(|metric| metric.workout_id == workout_id));
    assert!(metrics.iter().all(|metric| metric.outbox_id == outbox_id));
    let types: BTreeSet<&str> = metrics.iter().map(|m| m.metric_type.as_str()).collect();
    assert_eq!(types.len(), 3);

    let filtered = stores
        .completions
        .list_metrics("climber-a", Some(MetricType::WeightedPullUps))
        .unwrap();
    assert_eq!(filtered.len(), 1);

    assert!(fanout.drain(now()).await.unwrap().is_empty());
    let counts = stores.outbox.counts().unwrap();
    assert_eq!(counts.done, 1);
    assert_eq!(counts.pending, 0);
}

#[test]
fn completion_by_another_climber_is_not_found() {
    let (_dir, stores) = setup();
    let workout_id = workout_for(&stores, reviewed("Circuits"));
    let err = stores
        .completions
        .record_completion(
            &workout_id,
            "climber-b",
            &CompletionSubmission::new(CompletionPercentage::Full),
            now(),
        )
        .unwrap_err();
    assert!(matches!(err, EigerError::NotFound { .. }));
    assert!(stores
        .completions
        .fetch_completion(&workout_id)
        .unwrap()
        .is_none());
}

#[test]
fn payload_of_the_wrong_shape_writes_nothing() {
    let (_dir, stores) = setup();
    let mut exercise = weighted_test("Max hang test", vec![MetricType::HangboardMaxWeight]);
    exercise.test_configuration = Some(TestConfiguration::FingerStrength);
    let workout_id = workout_for(&stores, exercise);

    let mut submission = CompletionSubmission::new(CompletionPercentage::Full);
    submission.test_value = Some("30".into());
    submission.payload = CompletionPayload::WeightTest { weight_in_kilos: 30 };
    let err = stores
        .completions
        .record_completion(&workout_id, "climber-a", &submission, now())
        .unwrap_err();
    assert!(matches!(err, EigerError::Validation(_)));
    assert_eq!(count(&stores, "completed_workouts"), 0);
    assert_eq!(count(&stores, "metric_outbox"), 0);

    submission.payload = CompletionPayload::FingerStrengthTest {
        weight_in_kilos: 30,
        arm_protocol: ArmProtocol::TwoArms,
        grip_type: GripType::HalfCrimp,
        edge_size_in_millimeters: 20,
    };
    stores
        .completions
        .record_completion(&workout_id, "climber-a", &submission, now())
        .unwrap();
    assert_eq!(count(&stores, "finger_strength_metrics"), 1);
    assert_eq!(count(&stores, "metric_outbox"), 1);
}

#[test]
fn time_under_effort_is_recorded_per_set() {
    let (_dir, stores) = setup();
    let mut exercise = reviewed("Density hangs");
    exercise.is_test = true;
    exercise.test_configuration = Some(TestConfiguration::TimeUnderEffort);
    let workout_id = workout_for(&stores, exercise);
    stores
        .plans
        .update_workout(
            &workout_id,
            &WorkoutUpdate {
                sets: Some(3),
                ..WorkoutUpdate::default()
            },
        )
        .unwrap();

    let mut submission = CompletionSubmission::new(CompletionPercentage::Full);
    submission.test_value = Some("45".into());
    submission.payload = CompletionPayload::TimeUnderEffortTest {
        time_under_effort: 45,
        rest_time_in_seconds: 120,
    };
    stores
        .completions
        .record_completion(&workout_id, "climber-a", &submission, now())
        .unwrap();
    assert_eq!(count(&stores, "time_under_effort_metrics"), 3);
}

#[test]
fn unknown_perceived_effort_is_a_validation_error() {
    let (_dir, stores) = setup();
    let workout_id = workout_for(&stores, reviewed("Projecting"));
    let mut submission = CompletionSubmission::new(CompletionPercentage::Half);
    submission.perceived_rpe_id = Some("missing".into());
    match stores
        .completions
        .record_completion(&workout_id, "climber-a", &submission, now())
        .unwrap_err()
    {
        EigerError::Validation(errors) => assert!(errors.contains("perceived_rpe_id")),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(count(&stores, "completed_workouts"), 0);
}

#[test]
fn outbox_entries_survive_plan_deletion() {
    let (_dir, stores) = setup();
    let workout_id = workout_for(
        &stores,
        weighted_test("Pull-up test", vec![MetricType::WeightedPullUps]),
    );
    let mut submission = CompletionSubmission::new(CompletionPercentage::Full);
    submission.test_value = Some("25".into());
    submission.payload = CompletionPayload::WeightTest { weight_in_kilos: 25 };
    stores
        .completions
        .record_completion(&workout_id, "climber-a", &submission, now())
        .unwrap();

    let plan_id: String = stores
        .db
        .open()
        .unwrap()
        .query_row("SELECT plan_id FROM training_plans", [], |row| row.get(0))
        .unwrap();
    stores.plans.delete_plan(&plan_id, "climber-a").unwrap();
    assert_eq!(count(&stores, "completed_workouts"), 0);
    assert_eq!(count(&stores, "metric_outbox"), 1);
}
