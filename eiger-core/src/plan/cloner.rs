use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calendar::{iso_week_number, iso_year, resolve_date};
use crate::error::{EigerResult, ValidationErrors};

use super::models::{Day, DayTree, TrainingPlan, TrainingPlanTree, Week, WeekTree, Workout};

/// Submitted fields of the shared-plan form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClonePlanRequest {
    pub climber_id: String,
    pub starting_date: NaiveDate,
    /// Keeps the source name when absent.
    #[serde(default)]
    pub name: Option<String>,
}

impl ClonePlanRequest {
    pub fn validate(&self) -> EigerResult<()> {
        let mut errors = ValidationErrors::new();
        if self.climber_id.trim().is_empty() {
            errors.add("climber_id", "this field is required");
        }
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                errors.add("name", "this field may not be blank");
            }
        }
        errors.into_result()
    }
}

/// Deep copy of `source` owned by `climber_id` and starting on
/// `starting_date`.
///
/// Weeks are renumbered from the ISO week of the new start date keeping the
/// distance between source weeks, days are re-dated from their weekday label,
/// and every row gets a fresh id.
pub fn clone_plan(
    source: &TrainingPlanTree,
    climber_id: &str,
    starting_date: NaiveDate,
) -> TrainingPlanTree {
    let plan = TrainingPlan {
        plan_id: Uuid::new_v4().to_string(),
        name: source.plan.name.clone(),
        description: source.plan.description.clone(),
        climber_id: climber_id.to_string(),
        starting_date,
        created_at: None,
        updated_at: None,
    };

    let mut source_weeks: Vec<&WeekTree> = source.weeks.iter().collect();
    source_weeks.sort_by_key(|week| week.week.number);
    let Some(first_number) = source_weeks.first().map(|week| week.week.number) else {
        return TrainingPlanTree {
            plan,
            weeks: Vec::new(),
        };
    };

    let start_week = iso_week_number(starting_date);
    let reference_year = iso_year(starting_date);

    let weeks = source_weeks
        .into_iter()
        .map(|source_week| {
            let week = Week {
                week_id: Uuid::new_v4().to_string(),
                plan_id: plan.plan_id.clone(),
                number: start_week + (source_week.week.number - first_number),
            };
            let mut source_days: Vec<&DayTree> = source_week.days.iter().collect();
            source_days.sort_by_key(|day| (day.day.date, day.day.day_of_week));
            let days = source_days
                .into_iter()
                .map(|source_day| clone_day(source_day, &week, reference_year))
                .collect();
            WeekTree { week, days }
        })
        .collect();

    TrainingPlanTree { plan, weeks }
}

fn clone_day(source: &DayTree, week: &Week, reference_year: i32) -> DayTree {
    let day = Day {
        day_id: Uuid::new_v4().to_string(),
        week_id: week.week_id.clone(),
        day_of_week: source.day.day_of_week,
        date: resolve_date(week.number, source.day.day_of_week, reference_year),
        notes: source.day.notes.clone(),
    };
    let workouts = source
        .workouts
        .iter()
        .map(|workout| Workout {
            workout_id: Uuid::new_v4().to_string(),
            day_id: day.day_id.clone(),
            exercise_id: workout.exercise_id.clone(),
            targets: workout.targets.clone(),
        })
        .collect();
    DayTree { day, workouts }
}
