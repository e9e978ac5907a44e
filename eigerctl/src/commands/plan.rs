use std::collections::BTreeSet;

use chrono::NaiveDate;
use clap::{ArgAction, Args, Subcommand, ValueEnum};
use eiger_core::{
    ClonePlanRequest, CompletionPayload, CompletionPercentage, CompletionSubmission,
    NewTrainingPlan, TargetTimeUnit, Weekday, WorkoutUpdate,
};

use super::parse_date;

#[derive(Subcommand, Debug)]
pub enum PlanCommands {
    /// Lay out a new multi-week plan
    Create(PlanCreateArgs),
    /// Copy an existing plan for a climber with a new start date
    Clone(PlanCloneArgs),
    /// Show a climber's plans grouped by phase and today's workouts
    List(PlanListArgs),
    /// Show one plan with its weeks, days and workouts
    Show(PlanShowArgs),
    /// Delete a plan and everything it holds
    Delete(PlanShowArgs),
}

#[derive(Args, Debug)]
pub struct PlanCreateArgs {
    #[arg(long)]
    pub climber: String,
    #[arg(long)]
    pub name: String,
    #[arg(long, default_value = "")]
    pub description: String,
    #[arg(long = "start", value_parser = parse_date, value_name = "YYYY-MM-DD")]
    pub starting_date: NaiveDate,
    #[arg(long)]
    pub weeks: u32,
    /// Training weekday (repeat the flag, e.g. --day monday --day thu)
    #[arg(long = "day", value_parser = parse_weekday, action = ArgAction::Append, required = true)]
    pub days: Vec<Weekday>,
}

impl PlanCreateArgs {
    pub fn to_new_plan(&self) -> NewTrainingPlan {
        NewTrainingPlan {
            climber_id: self.climber.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            starting_date: self.starting_date,
            duration_weeks: self.weeks,
            weekdays: self.days.iter().copied().collect::<BTreeSet<_>>(),
        }
    }
}

#[derive(Args, Debug)]
pub struct PlanCloneArgs {
    pub source_plan_id: String,
    #[arg(long)]
    pub climber: String,
    #[arg(long = "start", value_parser = parse_date, value_name = "YYYY-MM-DD")]
    pub starting_date: NaiveDate,
    /// Name of the copy; defaults to the source name
    #[arg(long)]
    pub name: Option<String>,
}

impl PlanCloneArgs {
    pub fn to_request(&self) -> ClonePlanRequest {
        ClonePlanRequest {
            climber_id: self.climber.clone(),
            starting_date: self.starting_date,
            name: self.name.clone(),
        }
    }
}

#[derive(Args, Debug)]
pub struct PlanListArgs {
    #[arg(long)]
    pub climber: String,
    /// Reference day for the phases; defaults to today
    #[arg(long, value_parser = parse_date, value_name = "YYYY-MM-DD")]
    pub today: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub struct PlanShowArgs {
    pub plan_id: String,
    #[arg(long)]
    pub climber: String,
}

#[derive(Subcommand, Debug)]
pub enum DayCommands {
    /// Show a day's workouts and the dates it can move to
    Show(DayShowArgs),
    /// Set the exercises scheduled on a day
    SelectExercises(DaySelectArgs),
    /// Move a day to another date of the same week
    Move(DayMoveArgs),
    /// Replace the notes of a day
    Notes(DayNotesArgs),
}

#[derive(Args, Debug)]
pub struct DayShowArgs {
    pub day_id: String,
}

#[derive(Args, Debug)]
pub struct DaySelectArgs {
    pub day_id: String,
    /// Exercise to schedule (repeat the flag)
    #[arg(long = "exercise", action = ArgAction::Append, required = true)]
    pub exercises: Vec<String>,
}

#[derive(Args, Debug)]
pub struct DayMoveArgs {
    pub day_id: String,
    #[arg(long = "to", value_parser = parse_date, value_name = "YYYY-MM-DD")]
    pub new_date: NaiveDate,
}

#[derive(Args, Debug)]
pub struct DayNotesArgs {
    pub day_id: String,
    #[arg(long)]
    pub notes: String,
}

#[derive(Subcommand, Debug)]
pub enum WorkoutCommands {
    /// Change the targets of a workout
    Update(WorkoutUpdateArgs),
    /// Record the completion of a workout
    Complete(WorkoutCompleteArgs),
}

#[derive(Args, Debug)]
pub struct WorkoutUpdateArgs {
    pub workout_id: String,
    #[arg(long)]
    pub sets: Option<u32>,
    #[arg(long)]
    pub weight: Option<u32>,
    /// Target time, in --unit
    #[arg(long)]
    pub time: Option<u32>,
    #[arg(long, value_enum)]
    pub unit: Option<TimeUnitArg>,
    #[arg(long)]
    pub repetitions: Option<u32>,
    #[arg(long = "rest-per-set")]
    pub rest_per_set: Option<u32>,
    #[arg(long = "rest-per-repetition")]
    pub rest_per_repetition: Option<u32>,
}

impl WorkoutUpdateArgs {
    pub fn to_update(&self) -> WorkoutUpdate {
        WorkoutUpdate {
            sets: self.sets,
            target_weight_in_kilos: self.weight,
            target_time: self.time,
            target_time_unit: self.unit.map(Into::into),
            target_repetitions: self.repetitions,
            rest_per_set: self.rest_per_set,
            rest_per_repetition: self.rest_per_repetition,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TimeUnitArg {
    Minutes,
    Seconds,
}

impl From<TimeUnitArg> for TargetTimeUnit {
    fn from(value: TimeUnitArg) -> Self {
        match value {
            TimeUnitArg::Minutes => TargetTimeUnit::Minutes,
            TimeUnitArg::Seconds => TargetTimeUnit::Seconds,
        }
    }
}

#[derive(Args, Debug)]
pub struct WorkoutCompleteArgs {
    pub workout_id: String,
    #[arg(long)]
    pub climber: String,
    /// One of 0, 25, 50, 75, 100
    #[arg(long, value_parser = parse_percentage)]
    pub percentage: CompletionPercentage,
    #[arg(long)]
    pub rpe: Option<String>,
    #[arg(long, default_value = "")]
    pub notes: String,
    /// Measured value of a test exercise
    #[arg(long = "value")]
    pub test_value: Option<String>,
    /// Test measurements as JSON, e.g. '{"kind":"weight_test","weight_in_kilos":20}'
    #[arg(long, value_parser = parse_payload)]
    pub payload: Option<CompletionPayload>,
}

impl WorkoutCompleteArgs {
    pub fn to_submission(&self) -> CompletionSubmission {
        CompletionSubmission {
            completion_percentage: self.percentage,
            perceived_rpe_id: self.rpe.clone(),
            notes: self.notes.clone(),
            test_value: self.test_value.clone(),
            payload: self.payload.clone().unwrap_or_default(),
        }
    }
}

fn parse_weekday(value: &str) -> Result<Weekday, String> {
    value.parse()
}

fn parse_percentage(value: &str) -> Result<CompletionPercentage, String> {
    let raw: u8 = value
        .trim()
        .trim_end_matches('%')
        .parse()
        .map_err(|err| format!("invalid percentage {value:?}: {err}"))?;
    CompletionPercentage::try_from(raw)
}

fn parse_payload(value: &str) -> Result<CompletionPayload, String> {
    serde_json::from_str(value).map_err(|err| format!("invalid payload: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use eiger_core::{ArmProtocol, GripType};

    #[test]
    fn payload_json_selects_variant() {
        let payload = parse_payload(
            r#"{"kind":"finger_strength_test","weight_in_kilos":15,"arm_protocol":"one_arm","grip_type":"half_crimp","edge_size_in_millimeters":20}"#,
        )
        .unwrap();
        assert_eq!(
            payload,
            CompletionPayload::FingerStrengthTest {
                weight_in_kilos: 15,
                arm_protocol: ArmProtocol::OneArm,
                grip_type: GripType::HalfCrimp,
                edge_size_in_millimeters: 20,
            }
        );
        assert!(parse_payload(r#"{"kind":"unknown"}"#).is_err());
    }

    #[test]
    fn percentage_accepts_optional_sign() {
        assert_eq!(parse_percentage("75%").unwrap(), CompletionPercentage::ThreeQuarters);
        assert!(parse_percentage("60").is_err());
    }
}
