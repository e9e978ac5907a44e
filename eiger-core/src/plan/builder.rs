use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calendar::{iso_week_number, iso_year, resolve_date, Weekday};
use crate::error::{EigerResult, ValidationErrors};

use super::models::{Day, DayTree, TrainingPlan, TrainingPlanTree, Week, WeekTree};

pub const DEFAULT_MAX_DURATION_WEEKS: u32 = 52;
const MAX_PLAN_NAME: usize = 255;

/// Submitted fields of the plan creation form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewTrainingPlan {
    pub climber_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub starting_date: NaiveDate,
    pub duration_weeks: u32,
    pub weekdays: BTreeSet<Weekday>,
}

impl NewTrainingPlan {
    pub fn validate(&self, max_duration_weeks: u32) -> EigerResult<()> {
        let mut errors = ValidationErrors::new();
        if self.climber_id.trim().is_empty() {
            errors.add("climber_id", "this field is required");
        }
        let name = self.name.trim();
        if name.is_empty() {
            errors.add("name", "this field is required");
        } else if name.chars().count() > MAX_PLAN_NAME {
            errors.add("name", format!("must be at most {MAX_PLAN_NAME} characters"));
        }
        if self.weekdays.is_empty() {
            errors.add("weekdays", "select at least one training day");
        }
        if self.duration_weeks == 0 {
            errors.add("duration_weeks", "must be at least 1");
        } else if self.duration_weeks > max_duration_weeks {
            errors.add(
                "duration_weeks",
                format!("must be at most {max_duration_weeks}"),
            );
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone)]
pub struct PlanBuilder {
    max_duration_weeks: u32,
}

impl Default for PlanBuilder {
    fn default() -> Self {
        Self {
            max_duration_weeks: DEFAULT_MAX_DURATION_WEEKS,
        }
    }
}

impl PlanBuilder {
    pub fn new(max_duration_weeks: u32) -> Self {
        Self {
            max_duration_weeks: max_duration_weeks.max(1),
        }
    }

    /// Validates the submission, then lays out its weeks and days.
    pub fn build(&self, input: &NewTrainingPlan) -> EigerResult<TrainingPlanTree> {
        input.validate(self.max_duration_weeks)?;
        Ok(build_plan(
            input.climber_id.trim(),
            input.name.trim(),
            &input.description,
            input.starting_date,
            input.duration_weeks,
            &input.weekdays,
        ))
    }
}

/// Lays out `duration_weeks` weeks numbered from the ISO week of
/// `starting_date`, each with one day per selected weekday. Input is assumed
/// valid; no workouts are created.
///
/// Days are resolved against the ISO year of `starting_date`, not its
/// calendar year, so a plan starting on 2024-12-30 (ISO week 1 of 2025)
/// lands in January 2025.
pub fn build_plan(
    climber_id: &str,
    name: &str,
    description: &str,
    starting_date: NaiveDate,
    duration_weeks: u32,
    weekdays: &BTreeSet<Weekday>,
) -> TrainingPlanTree {
    let plan = TrainingPlan {
        plan_id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        description: description.to_string(),
        climber_id: climber_id.to_string(),
        starting_date,
        created_at: None,
        updated_at: None,
    };
    let start_week = iso_week_number(starting_date);
    let reference_year = iso_year(starting_date);

    let weeks = (0..duration_weeks)
        .map(|offset| {
            let week = Week {
                week_id: Uuid::new_v4().to_string(),
                plan_id: plan.plan_id.clone(),
                number: start_week + offset,
            };
            let days = weekdays
                .iter()
                .map(|weekday| DayTree {
                    day: Day {
                        day_id: Uuid::new_v4().to_string(),
                        week_id: week.week_id.clone(),
                        day_of_week: *weekday,
                        date: resolve_date(week.number, *weekday, reference_year),
                        notes: String::new(),
                    },
                    workouts: Vec::new(),
                })
                .collect();
            WeekTree { week, days }
        })
        .collect();

    TrainingPlanTree { plan, weeks }
}
