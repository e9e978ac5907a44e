use std::collections::{BTreeSet, HashSet};

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use tracing::{debug, info};
use uuid::Uuid;

use crate::calendar::{week_window, Weekday};
use crate::catalog::store::load_exercise;
use crate::error::{EigerError, EigerResult, EntityKind, ValidationErrors};
use crate::sqlite::{translate_constraint, SqliteDatabase};

use super::builder::{NewTrainingPlan, PlanBuilder};
use super::cloner::{clone_plan, ClonePlanRequest};
use super::models::{
    Day, DayDetail, DayTree, ExerciseSelection, PlanOverview, PlanPhase, PlanSummary,
    ScheduledWorkout, TargetTimeUnit, TrainingPlan, TrainingPlanTree, Week, WeekTree, Workout,
    WorkoutTargets, WorkoutUpdate,
};

const PLAN_SCHEMA: &str = include_str!("../../../sql/plans.sql");

#[derive(Debug, Clone)]
pub struct SqlitePlanStore {
    db: SqliteDatabase,
    builder: PlanBuilder,
}

impl SqlitePlanStore {
    pub fn new(db: SqliteDatabase) -> Self {
        Self {
            db,
            builder: PlanBuilder::default(),
        }
    }

    pub fn with_builder(mut self, builder: PlanBuilder) -> Self {
        self.builder = builder;
        self
    }

    pub fn initialize(&self) -> EigerResult<()> {
        let conn = self.db.open()?;
        conn.execute_batch(PLAN_SCHEMA)?;
        Ok(())
    }

    /// Validates and lays out a new plan, then writes it in one transaction.
    pub fn create_plan(&self, input: &NewTrainingPlan) -> EigerResult<TrainingPlanTree> {
        let tree = self.builder.build(input)?;
        let mut conn = self.db.open()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        insert_tree(&tx, &tree)?;
        tx.commit()?;
        info!(
            plan_id = %tree.plan.plan_id,
            climber_id = %tree.plan.climber_id,
            weeks = tree.week_count(),
            days = tree.day_count(),
            "training plan created"
        );
        self.fetch_tree(&tree.plan.plan_id)?
            .ok_or_else(|| EigerError::not_found(EntityKind::TrainingPlan, &tree.plan.plan_id))
    }

    /// Copies a shared plan for another climber. The source rows are only read.
    pub fn clone_plan(
        &self,
        source_plan_id: &str,
        request: &ClonePlanRequest,
    ) -> EigerResult<TrainingPlanTree> {
        request.validate()?;
        let mut conn = self.db.open()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let source = load_tree(&tx, source_plan_id)?
            .ok_or_else(|| EigerError::not_found(EntityKind::TrainingPlan, source_plan_id))?;
        let mut tree = clone_plan(&source, request.climber_id.trim(), request.starting_date);
        if let Some(name) = &request.name {
            tree.plan.name = name.trim().to_string();
        }
        insert_tree(&tx, &tree)?;
        tx.commit()?;
        info!(
            plan_id = %tree.plan.plan_id,
            source_plan_id = %source_plan_id,
            climber_id = %tree.plan.climber_id,
            weeks = tree.week_count(),
            workouts = tree.workout_count(),
            "training plan cloned"
        );
        self.fetch_tree(&tree.plan.plan_id)?
            .ok_or_else(|| EigerError::not_found(EntityKind::TrainingPlan, &tree.plan.plan_id))
    }

    pub fn fetch_plan(&self, plan_id: &str) -> EigerResult<Option<TrainingPlan>> {
        let conn = self.db.open()?;
        load_plan(&conn, plan_id)
    }

    pub fn fetch_tree(&self, plan_id: &str) -> EigerResult<Option<TrainingPlanTree>> {
        let conn = self.db.open()?;
        load_tree(&conn, plan_id)
    }

    /// Plan detail as seen by its owner; other climbers get `NotFound`.
    pub fn retrieve_plan(&self, plan_id: &str, climber_id: &str) -> EigerResult<TrainingPlanTree> {
        match self.fetch_tree(plan_id)? {
            Some(tree) if tree.plan.climber_id == climber_id => Ok(tree),
            _ => Err(EigerError::not_found(EntityKind::TrainingPlan, plan_id)),
        }
    }

    /// Splits the climber's plans by phase and lists today's workouts of the
    /// plans in progress.
    pub fn overview(&self, climber_id: &str, today: NaiveDate) -> EigerResult<PlanOverview> {
        let conn = self.db.open()?;
        let mut stmt = conn.prepare(
            "SELECT p.*, (SELECT COUNT(*) FROM weeks w WHERE w.plan_id = p.plan_id) AS week_total
             FROM training_plans p
             WHERE p.climber_id = ?1
             ORDER BY p.starting_date ASC",
        )?;
        let summaries = stmt
            .query_map([climber_id], |row| {
                let total: u32 = row.get("week_total")?;
                Ok((TrainingPlan::from_row(row)?, total))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut overview = PlanOverview::default();
        for (plan, total_weeks) in summaries {
            let summary = PlanSummary::classify(plan, total_weeks, today);
            match summary.phase {
                PlanPhase::InProgress => overview.in_progress.push(summary),
                PlanPhase::Upcoming => overview.upcoming.push(summary),
                PlanPhase::Completed => overview.completed.push(summary),
            }
        }

        let active: Vec<&str> = overview
            .in_progress
            .iter()
            .map(|summary| summary.plan.plan_id.as_str())
            .collect();
        let mut todays = conn.prepare(
            "SELECT wo.*, e.name AS exercise_name, d.date AS day_date,
                    (cw.completed_workout_id IS NOT NULL) AS is_completed
             FROM workouts wo
             JOIN days d ON d.day_id = wo.day_id
             JOIN weeks w ON w.week_id = d.week_id
             JOIN exercises e ON e.exercise_id = wo.exercise_id
             LEFT JOIN completed_workouts cw ON cw.workout_id = wo.workout_id
             WHERE w.plan_id = ?1 AND d.date = ?2
             ORDER BY e.name",
        )?;
        for plan_id in active {
            let rows = todays
                .query_map(params![plan_id, today], |row| {
                    Ok(ScheduledWorkout {
                        workout: Workout::from_row(row)?,
                        plan_id: plan_id.to_string(),
                        exercise_name: row.get("exercise_name")?,
                        date: row.get("day_date")?,
                        completed: row.get("is_completed")?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            overview.planned_workouts_for_today.extend(rows);
        }
        Ok(overview)
    }

    /// Removes a plan and everything it owns, children first.
    pub fn delete_plan(&self, plan_id: &str, climber_id: &str) -> EigerResult<usize> {
        let mut conn = self.db.open()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let plan = load_plan(&tx, plan_id)?
            .filter(|plan| plan.climber_id == climber_id)
            .ok_or_else(|| EigerError::not_found(EntityKind::TrainingPlan, plan_id))?;

        let workout_ids: Vec<String> = {
            let mut stmt = tx.prepare(
                "SELECT wo.workout_id FROM workouts wo
                 JOIN days d ON d.day_id = wo.day_id
                 JOIN weeks w ON w.week_id = d.week_id
                 WHERE w.plan_id = ?1",
            )?;
            let ids = stmt
                .query_map([plan_id], |row| row.get(0))?
                .collect::<Result<Vec<_>, _>>()?;
            ids
        };
        let mut removed = delete_workouts(&tx, &workout_ids)?;
        removed += tx.execute(
            "DELETE FROM days WHERE week_id IN (SELECT week_id FROM weeks WHERE plan_id = ?1)",
            [plan_id],
        )?;
        removed += tx.execute("DELETE FROM weeks WHERE plan_id = ?1", [plan_id])?;
        removed += tx.execute("DELETE FROM training_plans WHERE plan_id = ?1", [plan_id])?;
        tx.commit()?;
        info!(plan_id = %plan.plan_id, rows = removed, "training plan deleted");
        Ok(removed)
    }

    pub fn fetch_day(&self, day_id: &str) -> EigerResult<DayDetail> {
        let conn = self.db.open()?;
        let (day, week) = load_day_with_week(&conn, day_id)?;
        let workouts = load_workouts(&conn, &day.day_id)?;
        let available_dates = available_dates(&conn, &day)?;
        Ok(DayDetail {
            plan_id: week.plan_id,
            week_number: week.number,
            day,
            workouts,
            available_dates,
        })
    }

    /// Moves a day to another date of its calendar week; the weekday label
    /// follows the new date.
    pub fn move_day(&self, day_id: &str, new_date: NaiveDate) -> EigerResult<Day> {
        let mut conn = self.db.open()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let (mut day, _) = load_day_with_week(&tx, day_id)?;
        if day.date == new_date {
            return Ok(day);
        }
        if !available_dates(&tx, &day)?.contains(&new_date) {
            return Err(EigerError::validation(
                "new_date",
                format!("{new_date} is not available for this day"),
            ));
        }
        let new_weekday = Weekday::of(new_date);
        let label_taken: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM days WHERE week_id = ?1 AND day_of_week = ?2 AND day_id <> ?3)",
            params![day.week_id, new_weekday.as_str(), day.day_id],
            |row| row.get(0),
        )?;
        if label_taken {
            return Err(EigerError::validation(
                "new_date",
                format!("this week already has a {new_weekday} session"),
            ));
        }
        tx.execute(
            "UPDATE days SET date = ?2, day_of_week = ?3 WHERE day_id = ?1",
            params![day.day_id, new_date, new_weekday.as_str()],
        )
        .map_err(translate_constraint)?;
        tx.commit()?;
        debug!(day_id = %day.day_id, from = %day.date, to = %new_date, "day moved");
        day.date = new_date;
        day.day_of_week = new_weekday;
        Ok(day)
    }

    pub fn update_day_notes(&self, day_id: &str, notes: &str) -> EigerResult<()> {
        let conn = self.db.open()?;
        let affected = conn.execute(
            "UPDATE days SET notes = ?2 WHERE day_id = ?1",
            params![day_id, notes],
        )?;
        if affected == 0 {
            return Err(EigerError::not_found(EntityKind::Day, day_id));
        }
        Ok(())
    }

    /// Makes the day's workouts match `exercise_ids`: new exercises get an
    /// empty workout, deselected ones are removed with their completions.
    pub fn select_exercises(
        &self,
        day_id: &str,
        exercise_ids: &[String],
    ) -> EigerResult<ExerciseSelection> {
        let mut conn = self.db.open()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let (day, week) = load_day_with_week(&tx, day_id)?;

        let selected: BTreeSet<&str> = exercise_ids.iter().map(String::as_str).collect();
        let mut errors = ValidationErrors::new();
        if selected.is_empty() {
            errors.add("exercises", "select at least one exercise");
        }
        for exercise_id in &selected {
            match load_exercise(&tx, exercise_id)? {
                Some(exercise) if exercise.reviewed => {}
                Some(_) => errors.add(
                    "exercises",
                    format!("exercise {exercise_id} has not been reviewed"),
                ),
                None => errors.add("exercises", format!("unknown exercise {exercise_id}")),
            }
        }
        errors.into_result()?;

        let existing = load_workouts(&tx, &day.day_id)?;
        let existing_exercises: HashSet<&str> = existing
            .iter()
            .map(|workout| workout.exercise_id.as_str())
            .collect();

        let removed: Vec<String> = existing
            .iter()
            .filter(|workout| !selected.contains(workout.exercise_id.as_str()))
            .map(|workout| workout.workout_id.clone())
            .collect();
        delete_workouts(&tx, &removed)?;

        let added: Vec<Workout> = selected
            .iter()
            .filter(|exercise_id| !existing_exercises.contains(*exercise_id))
            .map(|exercise_id| Workout {
                workout_id: Uuid::new_v4().to_string(),
                day_id: day.day_id.clone(),
                exercise_id: exercise_id.to_string(),
                targets: WorkoutTargets::default(),
            })
            .collect();
        insert_workouts(&tx, &added)?;

        tx.execute(
            "UPDATE training_plans SET updated_at = CURRENT_TIMESTAMP WHERE plan_id = ?1",
            [week.plan_id.as_str()],
        )?;
        tx.commit()?;
        debug!(
            day_id = %day.day_id,
            added = added.len(),
            removed = removed.len(),
            "exercise selection applied"
        );
        Ok(ExerciseSelection {
            plan_id: week.plan_id,
            added,
            removed,
        })
    }

    pub fn fetch_workout(&self, workout_id: &str) -> EigerResult<Option<Workout>> {
        let conn = self.db.open()?;
        load_workout(&conn, workout_id)
    }

    /// Applies target edits; fields the exercise does not use are ignored.
    pub fn update_workout(&self, workout_id: &str, update: &WorkoutUpdate) -> EigerResult<Workout> {
        let mut conn = self.db.open()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut workout = load_workout(&tx, workout_id)?
            .ok_or_else(|| EigerError::not_found(EntityKind::Workout, workout_id))?;
        let exercise = load_exercise(&tx, &workout.exercise_id)?
            .ok_or_else(|| EigerError::not_found(EntityKind::Exercise, &workout.exercise_id))?;

        if let Some(sets) = update.sets {
            if sets == 0 {
                return Err(EigerError::validation("sets", "must be at least 1"));
            }
            workout.targets.sets = sets;
        }
        let targets = &mut workout.targets;
        let unit = update
            .target_time_unit
            .or(targets.target_time_unit)
            .unwrap_or(TargetTimeUnit::Seconds);
        if exercise.should_add_weight {
            if let Some(weight) = update.target_weight_in_kilos {
                targets.target_weight_in_kilos = Some(weight);
            }
        }
        if exercise.should_have_time {
            if let Some(time) = update.target_time {
                targets.target_time_in_seconds = Some(unit.to_seconds(time));
            }
            if let Some(rest) = update.rest_per_set {
                targets.rest_per_set_in_seconds = Some(unit.to_seconds(rest));
            }
            if let Some(rest) = update.rest_per_repetition {
                targets.rest_per_repetition_in_seconds = Some(unit.to_seconds(rest));
            }
            if update.target_time_unit.is_some() {
                targets.target_time_unit = update.target_time_unit;
            }
        }
        if exercise.should_have_repetition {
            if let Some(repetitions) = update.target_repetitions {
                targets.target_repetitions = Some(repetitions);
            }
        }

        tx.execute(
            "UPDATE workouts SET
                sets = ?2,
                rest_per_set_in_seconds = ?3,
                target_repetitions = ?4,
                rest_per_repetition_in_seconds = ?5,
                target_time_in_seconds = ?6,
                target_time_unit = ?7,
                target_weight_in_kilos = ?8,
                updated_at = CURRENT_TIMESTAMP
             WHERE workout_id = ?1",
            params![
                workout.workout_id,
                targets.sets,
                targets.rest_per_set_in_seconds,
                targets.target_repetitions,
                targets.rest_per_repetition_in_seconds,
                targets.target_time_in_seconds,
                targets.target_time_unit.map(|unit| unit.as_str()),
                targets.target_weight_in_kilos,
            ],
        )?;
        tx.commit()?;
        Ok(workout)
    }
}

fn insert_tree(tx: &Transaction<'_>, tree: &TrainingPlanTree) -> EigerResult<()> {
    let plan = &tree.plan;
    tx.execute(
        "INSERT INTO training_plans (plan_id, name, description, climber_id, starting_date)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            plan.plan_id,
            plan.name,
            plan.description,
            plan.climber_id,
            plan.starting_date
        ],
    )
    .map_err(translate_constraint)?;

    let mut week_stmt =
        tx.prepare("INSERT INTO weeks (week_id, plan_id, number) VALUES (?1, ?2, ?3)")?;
    let mut day_stmt = tx.prepare(
        "INSERT INTO days (day_id, week_id, day_of_week, date, notes) VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    let mut workouts = Vec::new();
    for week in &tree.weeks {
        week_stmt
            .execute(params![week.week.week_id, plan.plan_id, week.week.number])
            .map_err(translate_constraint)?;
        for day in &week.days {
            day_stmt
                .execute(params![
                    day.day.day_id,
                    week.week.week_id,
                    day.day.day_of_week.as_str(),
                    day.day.date,
                    day.day.notes
                ])
                .map_err(translate_constraint)?;
            workouts.extend(day.workouts.iter().cloned());
        }
    }
    insert_workouts(tx, &workouts)
}

fn insert_workouts(conn: &Connection, workouts: &[Workout]) -> EigerResult<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO workouts (
            workout_id, day_id, exercise_id, sets, rest_per_set_in_seconds, target_repetitions,
            rest_per_repetition_in_seconds, target_time_in_seconds, target_time_unit,
            target_weight_in_kilos
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    )?;
    for workout in workouts {
        let targets = &workout.targets;
        stmt.execute(params![
            workout.workout_id,
            workout.day_id,
            workout.exercise_id,
            targets.sets,
            targets.rest_per_set_in_seconds,
            targets.target_repetitions,
            targets.rest_per_repetition_in_seconds,
            targets.target_time_in_seconds,
            targets.target_time_unit.map(|unit| unit.as_str()),
            targets.target_weight_in_kilos,
        ])
        .map_err(translate_constraint)?;
    }
    Ok(())
}

/// Deletes workouts together with their completion rows.
fn delete_workouts(conn: &Connection, workout_ids: &[String]) -> EigerResult<usize> {
    let mut removed = 0;
    for workout_id in workout_ids {
        for table in [
            "finger_strength_metrics",
            "time_under_effort_metrics",
            "rate_of_force_metrics",
            "completed_workouts",
            "workouts",
        ] {
            removed += conn.execute(
                &format!("DELETE FROM {table} WHERE workout_id = ?1"),
                [workout_id],
            )?;
        }
    }
    Ok(removed)
}

fn load_plan(conn: &Connection, plan_id: &str) -> EigerResult<Option<TrainingPlan>> {
    let plan = conn
        .query_row(
            "SELECT * FROM training_plans WHERE plan_id = ?1",
            [plan_id],
            |row| TrainingPlan::from_row(row),
        )
        .optional()?;
    Ok(plan)
}

fn load_tree(conn: &Connection, plan_id: &str) -> EigerResult<Option<TrainingPlanTree>> {
    let Some(plan) = load_plan(conn, plan_id)? else {
        return Ok(None);
    };
    let weeks: Vec<Week> = {
        let mut stmt = conn.prepare("SELECT * FROM weeks WHERE plan_id = ?1 ORDER BY number")?;
        let rows = stmt
            .query_map([plan_id], |row| Week::from_row(row))?
            .collect::<Result<Vec<_>, _>>()?;
        rows
    };
    let mut day_stmt = conn.prepare("SELECT * FROM days WHERE week_id = ?1 ORDER BY date")?;
    let mut week_trees = Vec::with_capacity(weeks.len());
    for week in weeks {
        let days = day_stmt
            .query_map([week.week_id.as_str()], |row| Day::from_row(row))?
            .collect::<Result<Vec<_>, _>>()?;
        let mut day_trees = Vec::with_capacity(days.len());
        for day in days {
            let workouts = load_workouts(conn, &day.day_id)?;
            day_trees.push(DayTree { day, workouts });
        }
        week_trees.push(WeekTree {
            week,
            days: day_trees,
        });
    }
    Ok(Some(TrainingPlanTree {
        plan,
        weeks: week_trees,
    }))
}

fn load_workouts(conn: &Connection, day_id: &str) -> EigerResult<Vec<Workout>> {
    let mut stmt =
        conn.prepare("SELECT * FROM workouts WHERE day_id = ?1 ORDER BY created_at, workout_id")?;
    let rows = stmt
        .query_map([day_id], |row| Workout::from_row(row))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub(crate) fn load_workout(conn: &Connection, workout_id: &str) -> EigerResult<Option<Workout>> {
    let workout = conn
        .query_row(
            "SELECT * FROM workouts WHERE workout_id = ?1",
            [workout_id],
            |row| Workout::from_row(row),
        )
        .optional()?;
    Ok(workout)
}

fn load_day_with_week(conn: &Connection, day_id: &str) -> EigerResult<(Day, Week)> {
    let day = conn
        .query_row("SELECT * FROM days WHERE day_id = ?1", [day_id], |row| {
            Day::from_row(row)
        })
        .optional()?
        .ok_or_else(|| EigerError::not_found(EntityKind::Day, day_id))?;
    let week = conn
        .query_row(
            "SELECT * FROM weeks WHERE week_id = ?1",
            [day.week_id.as_str()],
            |row| Week::from_row(row),
        )
        .optional()?
        .ok_or_else(|| EigerError::not_found(EntityKind::Week, &day.week_id))?;
    Ok((day, week))
}

/// Dates of the day's calendar week not held by another day of its week.
fn available_dates(conn: &Connection, day: &Day) -> EigerResult<Vec<NaiveDate>> {
    let mut stmt = conn.prepare("SELECT date FROM days WHERE week_id = ?1 AND day_id <> ?2")?;
    let taken = stmt
        .query_map(params![day.week_id, day.day_id], |row| row.get::<_, NaiveDate>(0))?
        .collect::<Result<HashSet<_>, _>>()?;
    Ok(week_window(day.date)
        .into_iter()
        .filter(|date| !taken.contains(date))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SqliteCatalogStore;

    fn initialized_db() -> (tempfile::TempDir, SqliteDatabase) {
        let dir = tempfile::tempdir().unwrap();
        let db = SqliteDatabase::new(dir.path().join("eiger.sqlite")).unwrap();
        SqliteCatalogStore::new(db.clone()).initialize().unwrap();
        SqlitePlanStore::new(db.clone()).initialize().unwrap();
        (dir, db)
    }

    #[test]
    fn duplicate_weekday_in_a_week_is_an_integrity_error() {
        let (_dir, db) = initialized_db();
        let mut tree = PlanBuilder::default()
            .build(&NewTrainingPlan {
                climber_id: "climber-a".into(),
                name: "Base".into(),
                description: String::new(),
                starting_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                duration_weeks: 1,
                weekdays: BTreeSet::from([Weekday::Monday]),
            })
            .unwrap();
        let mut twin = tree.weeks[0].days[0].clone();
        twin.day.day_id = Uuid::new_v4().to_string();
        tree.weeks[0].days.push(twin);

        let mut conn = db.open().unwrap();
        let tx = conn.transaction().unwrap();
        match insert_tree(&tx, &tree).unwrap_err() {
            EigerError::Integrity(message) => assert!(message.contains("UNIQUE")),
            other => panic!("unexpected error: {other:?}"),
        }
        drop(tx);

        let plans: i64 = conn
            .query_row("SELECT COUNT(*) FROM training_plans", [], |row| row.get(0))
            .unwrap();
        assert_eq!(plans, 0);
    }
}
