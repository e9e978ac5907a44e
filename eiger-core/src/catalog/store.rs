use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tracing::info;
use uuid::Uuid;

use crate::error::{EigerError, EigerResult, EntityKind};
use crate::sqlite::{is_unique_violation, translate_constraint, SqliteDatabase};

use super::models::{
    Category, Exercise, ExerciseEdit, ExerciseType, ExerciseVariation, MetricType, NewCategory,
    NewExercise, NewExerciseVariation, PendingReview, Rpe, VariationTargets,
};

const CATALOG_SCHEMA: &str = include_str!("../../../sql/catalog.sql");

#[derive(Debug, Clone)]
pub struct SqliteCatalogStore {
    db: SqliteDatabase,
}

impl SqliteCatalogStore {
    pub fn new(db: SqliteDatabase) -> Self {
        Self { db }
    }

    pub fn initialize(&self) -> EigerResult<()> {
        let conn = self.db.open()?;
        conn.execute_batch(CATALOG_SCHEMA)?;
        Ok(())
    }

    pub fn add_exercise(&self, exercise: &NewExercise) -> EigerResult<Exercise> {
        exercise.validate()?;
        let mut conn = self.db.open()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if let Some(exercise_type_id) = &exercise.exercise_type_id {
            require_exercise_type(&tx, exercise_type_id)?;
        }
        let exercise_id = Uuid::new_v4().to_string();
        tx.execute(
            "INSERT INTO exercises (
                exercise_id, name, description, exercise_type_id, reviewed, should_have_time,
                should_have_repetition, should_add_weight, is_test, test_configuration,
                created_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                exercise_id,
                exercise.name.trim(),
                exercise.description,
                exercise.exercise_type_id,
                exercise.reviewed,
                exercise.should_have_time,
                exercise.should_have_repetition,
                exercise.should_add_weight,
                exercise.is_test,
                exercise.test_configuration.map(|config| config.as_str()),
                exercise.created_by,
            ],
        )
        .map_err(|err| {
            if is_unique_violation(&err) {
                EigerError::validation("name", "an exercise with this name already exists")
            } else {
                translate_constraint(err)
            }
        })?;
        insert_metric_types(&tx, &exercise_id, &exercise.metric_types)?;
        let created = load_exercise(&tx, &exercise_id)?
            .ok_or_else(|| EigerError::not_found(EntityKind::Exercise, &exercise_id))?;
        tx.commit()?;
        info!(exercise_id = %created.exercise_id, name = %created.name, "exercise registered");
        Ok(created)
    }

    pub fn fetch_exercise(&self, exercise_id: &str) -> EigerResult<Option<Exercise>> {
        let conn = self.db.open()?;
        load_exercise(&conn, exercise_id)
    }

    pub fn list_exercises(&self, reviewed_only: bool) -> EigerResult<Vec<Exercise>> {
        let conn = self.db.open()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM exercises
             WHERE (?1 = 0 OR reviewed = 1)
             ORDER BY name",
        )?;
        let mut exercises = stmt
            .query_map([reviewed_only], |row| Exercise::from_row(row))?
            .collect::<Result<Vec<_>, _>>()?;
        for exercise in &mut exercises {
            exercise.metric_types = load_metric_types(&conn, &exercise.exercise_id)?;
        }
        Ok(exercises)
    }

    pub fn set_reviewed(&self, exercise_id: &str, reviewed: bool) -> EigerResult<()> {
        let conn = self.db.open()?;
        let affected = conn.execute(
            "UPDATE exercises SET reviewed = ?2, updated_at = CURRENT_TIMESTAMP
             WHERE exercise_id = ?1",
            params![exercise_id, reviewed],
        )?;
        if affected == 0 {
            return Err(EigerError::not_found(EntityKind::Exercise, exercise_id));
        }
        Ok(())
    }

    /// Replaces the metric types a test exercise fans out to.
    pub fn set_metric_types(&self, exercise_id: &str, metric_types: &[MetricType]) -> EigerResult<()> {
        let mut conn = self.db.open()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let exercise = load_exercise(&tx, exercise_id)?
            .ok_or_else(|| EigerError::not_found(EntityKind::Exercise, exercise_id))?;
        if !exercise.is_test && !metric_types.is_empty() {
            return Err(EigerError::validation(
                "metric_types",
                "only test exercises produce metrics",
            ));
        }
        tx.execute(
            "DELETE FROM exercise_metric_types WHERE exercise_id = ?1",
            [exercise_id],
        )?;
        insert_metric_types(&tx, exercise_id, metric_types)?;
        tx.commit()?;
        Ok(())
    }

    /// Edits an exercise its trainer submitted. Reviewed exercises and other
    /// trainers' exercises are `NotFound`.
    pub fn update_exercise(
        &self,
        exercise_id: &str,
        trainer_id: &str,
        edit: &ExerciseEdit,
    ) -> EigerResult<Exercise> {
        edit.validate()?;
        let mut conn = self.db.open()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        require_exercise_type(&tx, edit.exercise_type_id.trim())?;
        let affected = tx
            .execute(
                "UPDATE exercises
                 SET name = ?3, exercise_type_id = ?4, description = ?5,
                     updated_at = CURRENT_TIMESTAMP
                 WHERE exercise_id = ?1 AND created_by = ?2 AND reviewed = 0",
                params![
                    exercise_id,
                    trainer_id,
                    edit.name.trim(),
                    edit.exercise_type_id.trim(),
                    edit.description.trim()
                ],
            )
            .map_err(|err| {
                if is_unique_violation(&err) {
                    EigerError::validation(
                        "name",
                        "there's already a registered or pending exercise with this name",
                    )
                } else {
                    translate_constraint(err)
                }
            })?;
        if affected == 0 {
            return Err(EigerError::not_found(EntityKind::Exercise, exercise_id));
        }
        let updated = load_exercise(&tx, exercise_id)?
            .ok_or_else(|| EigerError::not_found(EntityKind::Exercise, exercise_id))?;
        tx.commit()?;
        info!(exercise_id = %exercise_id, trainer_id = %trainer_id, "exercise updated");
        Ok(updated)
    }

    pub fn add_category(&self, category: &NewCategory) -> EigerResult<Category> {
        category.validate()?;
        let color = category
            .resolved_color()
            .ok_or_else(|| EigerError::validation("color", "expected #RRGGBB or a palette color"))?;
        let conn = self.db.open()?;
        let category_id = Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO categories (category_id, name, color) VALUES (?1, ?2, ?3)",
            params![category_id, category.name.trim(), color],
        )
        .map_err(|err| {
            if is_unique_violation(&err) {
                EigerError::validation("name", "a category with this name already exists")
            } else {
                translate_constraint(err)
            }
        })?;
        let created = conn.query_row(
            "SELECT * FROM categories WHERE category_id = ?1",
            [category_id.as_str()],
            |row| Category::from_row(row),
        )?;
        info!(category_id = %created.category_id, name = %created.name, "category created");
        Ok(created)
    }

    pub fn list_categories(&self) -> EigerResult<Vec<Category>> {
        let conn = self.db.open()?;
        let mut stmt = conn.prepare("SELECT * FROM categories ORDER BY name")?;
        let rows = stmt
            .query_map([], |row| Category::from_row(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn add_exercise_type(&self, category_id: &str, name: &str) -> EigerResult<ExerciseType> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EigerError::validation("name", "this field is required"));
        }
        if name.chars().count() > 30 {
            return Err(EigerError::validation("name", "must be at most 30 characters"));
        }
        let mut conn = self.db.open()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let category_exists = tx
            .query_row(
                "SELECT 1 FROM categories WHERE category_id = ?1",
                [category_id],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if !category_exists {
            return Err(EigerError::not_found(EntityKind::Category, category_id));
        }
        let exercise_type_id = Uuid::new_v4().to_string();
        tx.execute(
            "INSERT INTO exercise_types (exercise_type_id, category_id, name) VALUES (?1, ?2, ?3)",
            params![exercise_type_id, category_id, name],
        )
        .map_err(|err| {
            if is_unique_violation(&err) {
                EigerError::validation("name", "this category already has a type with this name")
            } else {
                translate_constraint(err)
            }
        })?;
        let created = tx.query_row(
            "SELECT * FROM exercise_types WHERE exercise_type_id = ?1",
            [exercise_type_id.as_str()],
            |row| ExerciseType::from_row(row),
        )?;
        tx.commit()?;
        Ok(created)
    }

    /// Types of one category; an unknown category simply has none.
    pub fn list_exercise_types(&self, category_id: &str) -> EigerResult<Vec<ExerciseType>> {
        let conn = self.db.open()?;
        let mut stmt =
            conn.prepare("SELECT * FROM exercise_types WHERE category_id = ?1 ORDER BY name")?;
        let rows = stmt
            .query_map([category_id], |row| ExerciseType::from_row(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn add_variation(
        &self,
        variation: &NewExerciseVariation,
    ) -> EigerResult<ExerciseVariation> {
        variation.targets.validate()?;
        if variation.created_by.trim().is_empty() {
            return Err(EigerError::validation("created_by", "this field is required"));
        }
        let mut conn = self.db.open()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if load_exercise(&tx, &variation.exercise_id)?.is_none() {
            return Err(EigerError::not_found(
                EntityKind::Exercise,
                &variation.exercise_id,
            ));
        }
        let variation_id = Uuid::new_v4().to_string();
        let targets = &variation.targets;
        tx.execute(
            "INSERT INTO exercise_variations (
                variation_id, exercise_id, sets, repetitions, seconds_per_repetition,
                rest_per_set_in_seconds, rest_per_repetition_in_seconds, weight_in_kilos,
                created_by, reviewed
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                variation_id,
                variation.exercise_id,
                targets.sets,
                targets.repetitions,
                targets.seconds_per_repetition,
                targets.rest_per_set_in_seconds,
                targets.rest_per_repetition_in_seconds,
                targets.weight_in_kilos,
                variation.created_by.trim(),
                variation.reviewed,
            ],
        )
        .map_err(duplicate_variation)?;
        let created = load_variation(&tx, &variation_id)?
            .ok_or_else(|| EigerError::not_found(EntityKind::ExerciseVariation, &variation_id))?;
        tx.commit()?;
        info!(
            variation_id = %created.variation_id,
            exercise_id = %created.exercise_id,
            "exercise variation submitted"
        );
        Ok(created)
    }

    /// Replaces the targets of a variation its trainer submitted and that
    /// was not reviewed yet.
    pub fn update_variation(
        &self,
        variation_id: &str,
        trainer_id: &str,
        targets: &VariationTargets,
    ) -> EigerResult<ExerciseVariation> {
        targets.validate()?;
        let mut conn = self.db.open()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let affected = tx
            .execute(
                "UPDATE exercise_variations
                 SET sets = ?3, repetitions = ?4, seconds_per_repetition = ?5,
                     rest_per_set_in_seconds = ?6, rest_per_repetition_in_seconds = ?7,
                     weight_in_kilos = ?8, updated_at = CURRENT_TIMESTAMP
                 WHERE variation_id = ?1 AND created_by = ?2 AND reviewed = 0",
                params![
                    variation_id,
                    trainer_id,
                    targets.sets,
                    targets.repetitions,
                    targets.seconds_per_repetition,
                    targets.rest_per_set_in_seconds,
                    targets.rest_per_repetition_in_seconds,
                    targets.weight_in_kilos,
                ],
            )
            .map_err(duplicate_variation)?;
        if affected == 0 {
            return Err(EigerError::not_found(
                EntityKind::ExerciseVariation,
                variation_id,
            ));
        }
        let updated = load_variation(&tx, variation_id)?
            .ok_or_else(|| EigerError::not_found(EntityKind::ExerciseVariation, variation_id))?;
        tx.commit()?;
        info!(variation_id = %variation_id, trainer_id = %trainer_id, "exercise variation updated");
        Ok(updated)
    }

    pub fn set_variation_reviewed(
        &self,
        variation_id: &str,
        reviewed: bool,
    ) -> EigerResult<ExerciseVariation> {
        let conn = self.db.open()?;
        let affected = conn.execute(
            "UPDATE exercise_variations SET reviewed = ?2, updated_at = CURRENT_TIMESTAMP
             WHERE variation_id = ?1",
            params![variation_id, reviewed],
        )?;
        if affected == 0 {
            return Err(EigerError::not_found(
                EntityKind::ExerciseVariation,
                variation_id,
            ));
        }
        load_variation(&conn, variation_id)?
            .ok_or_else(|| EigerError::not_found(EntityKind::ExerciseVariation, variation_id))
    }

    pub fn list_variations(
        &self,
        exercise_id: &str,
        reviewed_only: bool,
    ) -> EigerResult<Vec<ExerciseVariation>> {
        let conn = self.db.open()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM exercise_variations
             WHERE exercise_id = ?1 AND (?2 = 0 OR reviewed = 1)
             ORDER BY created_at, variation_id",
        )?;
        let rows = stmt
            .query_map(params![exercise_id, reviewed_only], |row| {
                ExerciseVariation::from_row(row)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Exercises and variations a trainer submitted that still await review.
    pub fn pending_review(&self, trainer_id: &str) -> EigerResult<PendingReview> {
        let conn = self.db.open()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM exercises WHERE created_by = ?1 AND reviewed = 0 ORDER BY name",
        )?;
        let mut exercises = stmt
            .query_map([trainer_id], |row| Exercise::from_row(row))?
            .collect::<Result<Vec<_>, _>>()?;
        for exercise in &mut exercises {
            exercise.metric_types = load_metric_types(&conn, &exercise.exercise_id)?;
        }
        let mut stmt = conn.prepare(
            "SELECT * FROM exercise_variations
             WHERE created_by = ?1 AND reviewed = 0
             ORDER BY created_at, variation_id",
        )?;
        let variations = stmt
            .query_map([trainer_id], |row| ExerciseVariation::from_row(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PendingReview {
            exercises,
            variations,
        })
    }

    pub fn add_rpe(
        &self,
        scale: u8,
        display_text: &str,
        description: &str,
    ) -> EigerResult<Rpe> {
        if display_text.trim().is_empty() {
            return Err(EigerError::validation("display_text", "this field is required"));
        }
        let conn = self.db.open()?;
        let rpe = Rpe {
            rpe_id: Uuid::new_v4().to_string(),
            scale,
            description: description.to_string(),
            display_text: display_text.trim().to_string(),
        };
        conn.execute(
            "INSERT INTO rpe (rpe_id, scale, description, display_text) VALUES (?1, ?2, ?3, ?4)",
            params![rpe.rpe_id, rpe.scale, rpe.description, rpe.display_text],
        )
        .map_err(|err| {
            if is_unique_violation(&err) {
                EigerError::validation("scale", "this scale value already exists")
            } else {
                translate_constraint(err)
            }
        })?;
        Ok(rpe)
    }

    pub fn list_rpe(&self) -> EigerResult<Vec<Rpe>> {
        let conn = self.db.open()?;
        let mut stmt = conn.prepare("SELECT * FROM rpe ORDER BY scale")?;
        let rows = stmt
            .query_map([], |row| Rpe::from_row(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

pub(crate) fn load_exercise(conn: &Connection, exercise_id: &str) -> EigerResult<Option<Exercise>> {
    let exercise = conn
        .query_row(
            "SELECT * FROM exercises WHERE exercise_id = ?1",
            [exercise_id],
            |row| Exercise::from_row(row),
        )
        .optional()?;
    match exercise {
        Some(mut exercise) => {
            exercise.metric_types = load_metric_types(conn, exercise_id)?;
            Ok(Some(exercise))
        }
        None => Ok(None),
    }
}

pub(crate) fn load_metric_types(conn: &Connection, exercise_id: &str) -> EigerResult<Vec<MetricType>> {
    let mut stmt = conn.prepare(
        "SELECT metric_type FROM exercise_metric_types
         WHERE exercise_id = ?1
         ORDER BY metric_type",
    )?;
    let raw = stmt
        .query_map([exercise_id], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    let mut metric_types = Vec::with_capacity(raw.len());
    for value in raw {
        let metric_type = value
            .parse()
            .map_err(|message: String| EigerError::Integrity(message))?;
        metric_types.push(metric_type);
    }
    Ok(metric_types)
}

pub(crate) fn load_rpe(conn: &Connection, rpe_id: &str) -> EigerResult<Option<Rpe>> {
    let rpe = conn
        .query_row("SELECT * FROM rpe WHERE rpe_id = ?1", [rpe_id], |row| {
            Rpe::from_row(row)
        })
        .optional()?;
    Ok(rpe)
}

fn load_variation(
    conn: &Connection,
    variation_id: &str,
) -> EigerResult<Option<ExerciseVariation>> {
    let variation = conn
        .query_row(
            "SELECT * FROM exercise_variations WHERE variation_id = ?1",
            [variation_id],
            |row| ExerciseVariation::from_row(row),
        )
        .optional()?;
    Ok(variation)
}

fn require_exercise_type(conn: &Connection, exercise_type_id: &str) -> EigerResult<()> {
    let exists = conn
        .query_row(
            "SELECT 1 FROM exercise_types WHERE exercise_type_id = ?1",
            [exercise_type_id],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    if exists {
        Ok(())
    } else {
        Err(EigerError::validation(
            "exercise_type_id",
            format!("unknown exercise type {exercise_type_id}"),
        ))
    }
}

fn duplicate_variation(err: rusqlite::Error) -> EigerError {
    if is_unique_violation(&err) {
        EigerError::validation("targets", "an identical variation already exists")
    } else {
        translate_constraint(err)
    }
}

fn insert_metric_types(
    conn: &Connection,
    exercise_id: &str,
    metric_types: &[MetricType],
) -> EigerResult<()> {
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO exercise_metric_types (exercise_id, metric_type) VALUES (?1, ?2)",
    )?;
    for metric_type in metric_types {
        stmt.execute(params![exercise_id, metric_type.as_str()])?;
    }
    Ok(())
}
