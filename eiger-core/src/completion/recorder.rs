use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use tracing::info;
use uuid::Uuid;

use crate::catalog::store::{load_exercise, load_rpe};
use crate::catalog::MetricType;
use crate::error::{EigerError, EigerResult, EntityKind};
use crate::plan::store::load_workout;
use crate::plan::Workout;
use crate::sqlite::{is_unique_violation, translate_constraint, SqliteDatabase};

use super::models::{
    ClimberMetric, CompletedWorkout, CompletionPayload, CompletionReceipt, CompletionSubmission,
};

const COMPLETION_SCHEMA: &str = include_str!("../../../sql/completions.sql");

#[derive(Debug, Clone)]
pub struct CompletionRecorder {
    db: SqliteDatabase,
}

impl CompletionRecorder {
    pub fn new(db: SqliteDatabase) -> Self {
        Self { db }
    }

    pub fn initialize(&self) -> EigerResult<()> {
        let conn = self.db.open()?;
        conn.execute_batch(COMPLETION_SCHEMA)?;
        Ok(())
    }

    /// Records the single completion of a workout owned by `climber_id`.
    ///
    /// The completion, its test measurements and, for test exercises, the
    /// fan-out intent are written in one transaction.
    pub fn record_completion(
        &self,
        workout_id: &str,
        climber_id: &str,
        submission: &CompletionSubmission,
        now: DateTime<Utc>,
    ) -> EigerResult<CompletionReceipt> {
        let mut conn = self.db.open()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let (workout, plan_id) = load_owned_workout(&tx, workout_id, climber_id)?;
        if completion_exists(&tx, &workout.workout_id)? {
            return Err(EigerError::AlreadyCompleted {
                workout_id: workout.workout_id,
            });
        }
        let exercise = load_exercise(&tx, &workout.exercise_id)?
            .ok_or_else(|| EigerError::not_found(EntityKind::Exercise, &workout.exercise_id))?;
        submission.validate_for(&exercise)?;
        if let Some(rpe_id) = &submission.perceived_rpe_id {
            if load_rpe(&tx, rpe_id)?.is_none() {
                return Err(EigerError::validation(
                    "perceived_rpe_id",
                    format!("unknown perceived effort {rpe_id}"),
                ));
            }
        }

        let completed_workout_id = Uuid::new_v4().to_string();
        tx.execute(
            "INSERT INTO completed_workouts (
                completed_workout_id, workout_id, perceived_rpe_id, completed_percentage, notes,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                completed_workout_id,
                workout.workout_id,
                submission.perceived_rpe_id,
                submission.completion_percentage.value(),
                submission.notes.trim(),
                now.naive_utc(),
            ],
        )
        .map_err(|err| {
            if is_unique_violation(&err) {
                EigerError::AlreadyCompleted {
                    workout_id: workout.workout_id.clone(),
                }
            } else {
                translate_constraint(err)
            }
        })?;

        write_measurements(&tx, &workout, &submission.payload)?;

        let outbox_id = if exercise.is_test {
            let value = submission.measured_value()?;
            tx.execute(
                "INSERT INTO metric_outbox (
                    completed_workout_id, climber_id, workout_id, exercise_id, value,
                    next_attempt_at, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, ?6)",
                params![
                    completed_workout_id,
                    climber_id,
                    workout.workout_id,
                    exercise.exercise_id,
                    value,
                    now.naive_utc(),
                ],
            )?;
            Some(tx.last_insert_rowid())
        } else {
            None
        };

        let completed = tx.query_row(
            "SELECT * FROM completed_workouts WHERE completed_workout_id = ?1",
            [completed_workout_id.as_str()],
            |row| CompletedWorkout::from_row(row),
        )?;
        tx.commit()?;
        info!(
            workout_id = %completed.workout_id,
            plan_id = %plan_id,
            percentage = completed.completion_percentage.value(),
            outbox_id = ?outbox_id,
            "workout completion recorded"
        );
        Ok(CompletionReceipt {
            completed,
            plan_id,
            outbox_id,
        })
    }

    pub fn fetch_completion(&self, workout_id: &str) -> EigerResult<Option<CompletedWorkout>> {
        let conn = self.db.open()?;
        let completed = conn
            .query_row(
                "SELECT * FROM completed_workouts WHERE workout_id = ?1",
                [workout_id],
                |row| CompletedWorkout::from_row(row),
            )
            .optional()?;
        Ok(completed)
    }

    pub fn list_metrics(
        &self,
        climber_id: &str,
        metric_type: Option<MetricType>,
    ) -> EigerResult<Vec<ClimberMetric>> {
        let conn = self.db.open()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM climber_metrics
             WHERE climber_id = ?1 AND (?2 IS NULL OR metric_type = ?2)
             ORDER BY created_at, metric_type",
        )?;
        let rows = stmt
            .query_map(
                params![climber_id, metric_type.map(|m| m.as_str())],
                |row| ClimberMetric::from_row(row),
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn load_owned_workout(
    conn: &Connection,
    workout_id: &str,
    climber_id: &str,
) -> EigerResult<(Workout, String)> {
    let owner = conn
        .query_row(
            "SELECT p.plan_id, p.climber_id FROM workouts wo
             JOIN days d ON d.day_id = wo.day_id
             JOIN weeks w ON w.week_id = d.week_id
             JOIN training_plans p ON p.plan_id = w.plan_id
             WHERE wo.workout_id = ?1",
            [workout_id],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        )
        .optional()?;
    match (owner, load_workout(conn, workout_id)?) {
        (Some((plan_id, owner)), Some(workout)) if owner == climber_id => Ok((workout, plan_id)),
        _ => Err(EigerError::not_found(EntityKind::Workout, workout_id)),
    }
}

fn completion_exists(conn: &Connection, workout_id: &str) -> EigerResult<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM completed_workouts WHERE workout_id = ?1)",
        [workout_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

fn write_measurements(
    tx: &Transaction<'_>,
    workout: &Workout,
    payload: &CompletionPayload,
) -> EigerResult<()> {
    match payload {
        CompletionPayload::Plain | CompletionPayload::WeightTest { .. } => {}
        CompletionPayload::FingerStrengthTest {
            weight_in_kilos,
            arm_protocol,
            grip_type,
            edge_size_in_millimeters,
        } => {
            tx.execute(
                "INSERT INTO finger_strength_metrics (
                    metric_id, workout_id, arm_protocol, grip_type, weight_in_kilos,
                    edge_size_in_millimeters
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    Uuid::new_v4().to_string(),
                    workout.workout_id,
                    arm_protocol.as_str(),
                    grip_type.as_str(),
                    weight_in_kilos,
                    edge_size_in_millimeters,
                ],
            )
            .map_err(translate_constraint)?;
        }
        CompletionPayload::TimeUnderEffortTest {
            time_under_effort,
            rest_time_in_seconds,
        } => {
            let mut stmt = tx.prepare(
                "INSERT INTO time_under_effort_metrics (
                    metric_id, workout_id, set_number, time_under_effort, rest_time_in_seconds
                ) VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for set_number in 1..=workout.targets.sets.max(1) {
                stmt.execute(params![
                    Uuid::new_v4().to_string(),
                    workout.workout_id,
                    set_number,
                    time_under_effort,
                    rest_time_in_seconds,
                ])
                .map_err(translate_constraint)?;
            }
        }
        CompletionPayload::RateOfForceTest {
            peak_force_newtons,
            time_to_peak_milliseconds,
        } => {
            tx.execute(
                "INSERT INTO rate_of_force_metrics (
                    metric_id, workout_id, peak_force_newtons, time_to_peak_milliseconds
                ) VALUES (?1, ?2, ?3, ?4)",
                params![
                    Uuid::new_v4().to_string(),
                    workout.workout_id,
                    peak_force_newtons,
                    time_to_peak_milliseconds,
                ],
            )
            .map_err(translate_constraint)?;
        }
    }
    Ok(())
}
