use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::calendar::Weekday;

fn parse_column<T>(row: &Row<'_>, column: &str) -> rusqlite::Result<T>
where
    T: FromStr<Err = String>,
{
    let raw: String = row.get(column)?;
    raw.parse().map_err(|message: String| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            message.into(),
        )
    })
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainingPlan {
    pub plan_id: String,
    pub name: String,
    pub description: String,
    pub climber_id: String,
    pub starting_date: NaiveDate,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TrainingPlan {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let created_at: Option<NaiveDateTime> = row.get("created_at")?;
        let updated_at: Option<NaiveDateTime> = row.get("updated_at")?;
        Ok(Self {
            plan_id: row.get("plan_id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            climber_id: row.get("climber_id")?,
            starting_date: row.get("starting_date")?,
            created_at: created_at.map(|dt| Utc.from_utc_datetime(&dt)),
            updated_at: updated_at.map(|dt| Utc.from_utc_datetime(&dt)),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Week {
    pub week_id: String,
    pub plan_id: String,
    pub number: u32,
}

impl Week {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            week_id: row.get("week_id")?,
            plan_id: row.get("plan_id")?,
            number: row.get("number")?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Day {
    pub day_id: String,
    pub week_id: String,
    pub day_of_week: Weekday,
    pub date: NaiveDate,
    pub notes: String,
}

impl Day {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            day_id: row.get("day_id")?,
            week_id: row.get("week_id")?,
            day_of_week: parse_column(row, "day_of_week")?,
            date: row.get("date")?,
            notes: row.get("notes")?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetTimeUnit {
    Minutes,
    Seconds,
}

impl TargetTimeUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetTimeUnit::Minutes => "minutes",
            TargetTimeUnit::Seconds => "seconds",
        }
    }

    pub fn to_seconds(&self, value: u32) -> u32 {
        match self {
            TargetTimeUnit::Minutes => value.saturating_mul(60),
            TargetTimeUnit::Seconds => value,
        }
    }

    pub fn from_seconds(&self, seconds: u32) -> u32 {
        match self {
            TargetTimeUnit::Minutes => seconds / 60,
            TargetTimeUnit::Seconds => seconds,
        }
    }
}

impl fmt::Display for TargetTimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetTimeUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "minutes" => Ok(TargetTimeUnit::Minutes),
            "seconds" => Ok(TargetTimeUnit::Seconds),
            other => Err(format!("unknown time unit: {other}")),
        }
    }
}

/// Prescription for one workout. Durations are stored in seconds; the unit
/// only drives display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkoutTargets {
    pub sets: u32,
    pub rest_per_set_in_seconds: Option<u32>,
    pub target_repetitions: Option<u32>,
    pub rest_per_repetition_in_seconds: Option<u32>,
    pub target_time_in_seconds: Option<u32>,
    pub target_time_unit: Option<TargetTimeUnit>,
    pub target_weight_in_kilos: Option<u32>,
}

impl Default for WorkoutTargets {
    fn default() -> Self {
        Self {
            sets: 1,
            rest_per_set_in_seconds: None,
            target_repetitions: None,
            rest_per_repetition_in_seconds: None,
            target_time_in_seconds: None,
            target_time_unit: None,
            target_weight_in_kilos: None,
        }
    }
}

impl WorkoutTargets {
    fn display_unit(&self) -> TargetTimeUnit {
        self.target_time_unit.unwrap_or(TargetTimeUnit::Seconds)
    }

    pub fn target_time(&self) -> Option<u32> {
        self.target_time_in_seconds
            .map(|seconds| self.display_unit().from_seconds(seconds))
    }

    pub fn rest_per_set(&self) -> Option<u32> {
        self.rest_per_set_in_seconds
            .map(|seconds| self.display_unit().from_seconds(seconds))
    }

    pub fn rest_per_repetition(&self) -> Option<u32> {
        self.rest_per_repetition_in_seconds
            .map(|seconds| self.display_unit().from_seconds(seconds))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Workout {
    pub workout_id: String,
    pub day_id: String,
    pub exercise_id: String,
    #[serde(flatten)]
    pub targets: WorkoutTargets,
}

impl Workout {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let unit: Option<String> = row.get("target_time_unit")?;
        Ok(Self {
            workout_id: row.get("workout_id")?,
            day_id: row.get("day_id")?,
            exercise_id: row.get("exercise_id")?,
            targets: WorkoutTargets {
                sets: row.get("sets")?,
                rest_per_set_in_seconds: row.get("rest_per_set_in_seconds")?,
                target_repetitions: row.get("target_repetitions")?,
                rest_per_repetition_in_seconds: row.get("rest_per_repetition_in_seconds")?,
                target_time_in_seconds: row.get("target_time_in_seconds")?,
                target_time_unit: unit.and_then(|value| value.parse().ok()),
                target_weight_in_kilos: row.get("target_weight_in_kilos")?,
            },
        })
    }
}

/// Target edits for one workout. Time values are given in `target_time_unit`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WorkoutUpdate {
    pub sets: Option<u32>,
    pub target_weight_in_kilos: Option<u32>,
    pub target_time: Option<u32>,
    pub target_time_unit: Option<TargetTimeUnit>,
    pub target_repetitions: Option<u32>,
    pub rest_per_set: Option<u32>,
    pub rest_per_repetition: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DayTree {
    pub day: Day,
    pub workouts: Vec<Workout>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeekTree {
    pub week: Week,
    pub days: Vec<DayTree>,
}

/// A plan with every week, day and workout it owns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainingPlanTree {
    pub plan: TrainingPlan,
    pub weeks: Vec<WeekTree>,
}

impl TrainingPlanTree {
    pub fn week_count(&self) -> usize {
        self.weeks.len()
    }

    pub fn day_count(&self) -> usize {
        self.days().count()
    }

    pub fn workout_count(&self) -> usize {
        self.days().map(|day| day.workouts.len()).sum()
    }

    pub fn days(&self) -> impl Iterator<Item = &DayTree> {
        self.weeks.iter().flat_map(|week| week.days.iter())
    }

    pub fn end_date(&self) -> NaiveDate {
        plan_end_date(self.plan.starting_date, self.weeks.len() as u32)
    }
}

pub fn plan_end_date(starting_date: NaiveDate, total_weeks: u32) -> NaiveDate {
    starting_date + Duration::weeks(i64::from(total_weeks))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanPhase {
    InProgress,
    Upcoming,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanSummary {
    pub plan: TrainingPlan,
    pub phase: PlanPhase,
    pub total_weeks: u32,
    pub end_date: NaiveDate,
    pub current_week: Option<u32>,
    pub progress_percentage: Option<f64>,
}

impl PlanSummary {
    pub fn classify(plan: TrainingPlan, total_weeks: u32, today: NaiveDate) -> Self {
        let end_date = plan_end_date(plan.starting_date, total_weeks);
        if plan.starting_date > today {
            return Self {
                plan,
                phase: PlanPhase::Upcoming,
                total_weeks,
                end_date,
                current_week: None,
                progress_percentage: None,
            };
        }
        if today > end_date {
            return Self {
                plan,
                phase: PlanPhase::Completed,
                total_weeks,
                end_date,
                current_week: None,
                progress_percentage: Some(100.0),
            };
        }
        let elapsed_weeks = ((today - plan.starting_date).num_days() / 7) as u32;
        let current_week = (elapsed_weeks + 1).min(total_weeks.max(1));
        let progress = if total_weeks == 0 {
            100.0
        } else {
            f64::from(current_week) / f64::from(total_weeks) * 100.0
        };
        Self {
            plan,
            phase: PlanPhase::InProgress,
            total_weeks,
            end_date,
            current_week: Some(current_week),
            progress_percentage: Some(progress),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduledWorkout {
    pub workout: Workout,
    pub plan_id: String,
    pub exercise_name: String,
    pub date: NaiveDate,
    pub completed: bool,
}

/// Home view of one climber on a given day.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PlanOverview {
    pub in_progress: Vec<PlanSummary>,
    pub upcoming: Vec<PlanSummary>,
    pub completed: Vec<PlanSummary>,
    pub planned_workouts_for_today: Vec<ScheduledWorkout>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DayDetail {
    pub plan_id: String,
    pub week_number: u32,
    pub day: Day,
    pub workouts: Vec<Workout>,
    pub available_dates: Vec<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExerciseSelection {
    pub plan_id: String,
    pub added: Vec<Workout>,
    pub removed: Vec<String>,
}
