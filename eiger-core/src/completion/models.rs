use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::catalog::{Exercise, MetricType, TestConfiguration};
use crate::error::{EigerError, EigerResult, ValidationErrors};

/// Share of the prescribed workout the climber got through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum CompletionPercentage {
    Zero,
    Quarter,
    Half,
    ThreeQuarters,
    Full,
}

impl CompletionPercentage {
    pub fn value(&self) -> u8 {
        match self {
            CompletionPercentage::Zero => 0,
            CompletionPercentage::Quarter => 25,
            CompletionPercentage::Half => 50,
            CompletionPercentage::ThreeQuarters => 75,
            CompletionPercentage::Full => 100,
        }
    }
}

impl TryFrom<u8> for CompletionPercentage {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(CompletionPercentage::Zero),
            25 => Ok(CompletionPercentage::Quarter),
            50 => Ok(CompletionPercentage::Half),
            75 => Ok(CompletionPercentage::ThreeQuarters),
            100 => Ok(CompletionPercentage::Full),
            other => Err(format!(
                "completion percentage must be one of 0, 25, 50, 75, 100 (got {other})"
            )),
        }
    }
}

impl From<CompletionPercentage> for u8 {
    fn from(value: CompletionPercentage) -> Self {
        value.value()
    }
}

impl fmt::Display for CompletionPercentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.value())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArmProtocol {
    OneArm,
    TwoArms,
}

impl ArmProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArmProtocol::OneArm => "one_arm",
            ArmProtocol::TwoArms => "two_arms",
        }
    }
}

impl FromStr for ArmProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "one_arm" | "one-arm" => Ok(ArmProtocol::OneArm),
            "two_arms" | "two-arms" => Ok(ArmProtocol::TwoArms),
            other => Err(format!("unknown arm protocol: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GripType {
    HalfCrimp,
    OpenHand,
    FullCrimp,
}

impl GripType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GripType::HalfCrimp => "half_crimp",
            GripType::OpenHand => "open_hand",
            GripType::FullCrimp => "full_crimp",
        }
    }
}

impl FromStr for GripType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "half_crimp" => Ok(GripType::HalfCrimp),
            "open_hand" => Ok(GripType::OpenHand),
            "full_crimp" => Ok(GripType::FullCrimp),
            other => Err(format!("unknown grip type: {other}")),
        }
    }
}

/// Extra measurements submitted with a completion. The expected shape is
/// fixed by the exercise, see [`PayloadKind::for_exercise`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CompletionPayload {
    #[default]
    Plain,
    WeightTest {
        weight_in_kilos: u32,
    },
    FingerStrengthTest {
        weight_in_kilos: u32,
        arm_protocol: ArmProtocol,
        grip_type: GripType,
        edge_size_in_millimeters: u32,
    },
    TimeUnderEffortTest {
        time_under_effort: u32,
        rest_time_in_seconds: u32,
    },
    RateOfForceTest {
        peak_force_newtons: u32,
        time_to_peak_milliseconds: u32,
    },
}

impl CompletionPayload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            CompletionPayload::Plain => PayloadKind::Plain,
            CompletionPayload::WeightTest { .. } => PayloadKind::WeightTest,
            CompletionPayload::FingerStrengthTest { .. } => PayloadKind::FingerStrengthTest,
            CompletionPayload::TimeUnderEffortTest { .. } => PayloadKind::TimeUnderEffortTest,
            CompletionPayload::RateOfForceTest { .. } => PayloadKind::RateOfForceTest,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadKind {
    Plain,
    WeightTest,
    FingerStrengthTest,
    TimeUnderEffortTest,
    RateOfForceTest,
}

impl PayloadKind {
    pub fn for_exercise(exercise: &Exercise) -> Self {
        if !exercise.is_test {
            return PayloadKind::Plain;
        }
        match exercise.test_configuration {
            Some(TestConfiguration::FingerStrength) => PayloadKind::FingerStrengthTest,
            Some(TestConfiguration::TimeUnderEffort) => PayloadKind::TimeUnderEffortTest,
            Some(TestConfiguration::RateOfForce) => PayloadKind::RateOfForceTest,
            None if exercise.should_add_weight => PayloadKind::WeightTest,
            None => PayloadKind::Plain,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadKind::Plain => "plain",
            PayloadKind::WeightTest => "weight_test",
            PayloadKind::FingerStrengthTest => "finger_strength_test",
            PayloadKind::TimeUnderEffortTest => "time_under_effort_test",
            PayloadKind::RateOfForceTest => "rate_of_force_test",
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Submitted fields of the completion form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionSubmission {
    pub completion_percentage: CompletionPercentage,
    #[serde(default)]
    pub perceived_rpe_id: Option<String>,
    #[serde(default)]
    pub notes: String,
    /// Measurement fanned out to the climber's metrics; required for tests.
    #[serde(default)]
    pub test_value: Option<String>,
    #[serde(default)]
    pub payload: CompletionPayload,
}

impl CompletionSubmission {
    pub fn new(completion_percentage: CompletionPercentage) -> Self {
        Self {
            completion_percentage,
            perceived_rpe_id: None,
            notes: String::new(),
            test_value: None,
            payload: CompletionPayload::Plain,
        }
    }

    /// Checks the submission against the shape the exercise expects.
    pub fn validate_for(&self, exercise: &Exercise) -> EigerResult<()> {
        let mut errors = ValidationErrors::new();
        let expected = PayloadKind::for_exercise(exercise);
        if self.payload.kind() != expected {
            errors.add(
                "payload",
                format!("expected a {expected} payload, got {}", self.payload.kind()),
            );
        }
        if exercise.is_test {
            match self.test_value.as_deref().map(str::trim) {
                Some(value) if !value.is_empty() => {}
                _ => errors.add("test_value", "test exercises require a measured value"),
            }
        }
        errors.into_result()
    }

    pub(crate) fn measured_value(&self) -> EigerResult<String> {
        self.test_value
            .as_deref()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| EigerError::validation("test_value", "missing measured value"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedWorkout {
    pub completed_workout_id: String,
    pub workout_id: String,
    pub perceived_rpe_id: Option<String>,
    pub completion_percentage: CompletionPercentage,
    pub notes: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl CompletedWorkout {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let percentage: u8 = row.get("completed_percentage")?;
        let completion_percentage = CompletionPercentage::try_from(percentage).map_err(|message| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Integer,
                message.into(),
            )
        })?;
        let created_at: Option<NaiveDateTime> = row.get("created_at")?;
        Ok(Self {
            completed_workout_id: row.get("completed_workout_id")?,
            workout_id: row.get("workout_id")?,
            perceived_rpe_id: row.get("perceived_rpe_id")?,
            completion_percentage,
            notes: row.get("notes")?,
            created_at: created_at.map(|dt| Utc.from_utc_datetime(&dt)),
        })
    }
}

/// What `record_completion` hands back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionReceipt {
    pub completed: CompletedWorkout,
    pub plan_id: String,
    /// Set when the exercise is a test and a fan-out intent was queued.
    pub outbox_id: Option<i64>,
}

/// One derived metric written by the fan-out worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimberMetric {
    pub metric_id: String,
    pub climber_id: String,
    pub workout_id: String,
    pub metric_type: MetricType,
    pub value: String,
    pub outbox_id: i64,
    pub created_at: Option<DateTime<Utc>>,
}

impl ClimberMetric {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let metric_type: String = row.get("metric_type")?;
        let metric_type = metric_type.parse().map_err(|message: String| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, message.into())
        })?;
        let created_at: Option<NaiveDateTime> = row.get("created_at")?;
        Ok(Self {
            metric_id: row.get("metric_id")?,
            climber_id: row.get("climber_id")?,
            workout_id: row.get("workout_id")?,
            metric_type,
            value: row.get("value")?,
            outbox_id: row.get("outbox_id")?,
            created_at: created_at.map(|dt| Utc.from_utc_datetime(&dt)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(is_test: bool, config: Option<TestConfiguration>, weight: bool) -> Exercise {
        Exercise {
            exercise_id: "e".into(),
            name: "Max hang".into(),
            description: String::new(),
            exercise_type_id: None,
            reviewed: true,
            should_have_time: false,
            should_have_repetition: false,
            should_add_weight: weight,
            is_test,
            test_configuration: config,
            metric_types: vec![MetricType::HangboardMaxWeight],
            created_by: None,
            created_at: None,
        }
    }

    #[test]
    fn payload_kind_follows_exercise_configuration() {
        assert_eq!(
            PayloadKind::for_exercise(&exercise(false, None, true)),
            PayloadKind::Plain
        );
        assert_eq!(
            PayloadKind::for_exercise(&exercise(true, None, true)),
            PayloadKind::WeightTest
        );
        assert_eq!(
            PayloadKind::for_exercise(&exercise(true, Some(TestConfiguration::FingerStrength), true)),
            PayloadKind::FingerStrengthTest
        );
        assert_eq!(
            PayloadKind::for_exercise(&exercise(true, Some(TestConfiguration::RateOfForce), false)),
            PayloadKind::RateOfForceTest
        );
        assert_eq!(
            PayloadKind::for_exercise(&exercise(true, None, false)),
            PayloadKind::Plain
        );
    }

    #[test]
    fn mismatched_payload_is_rejected() {
        let mut submission = CompletionSubmission::new(CompletionPercentage::Full);
        submission.test_value = Some("20".into());
        let err = submission
            .validate_for(&exercise(true, Some(TestConfiguration::TimeUnderEffort), false))
            .unwrap_err();
        match err {
            EigerError::Validation(errors) => assert!(errors.contains("payload")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_exercise_requires_value() {
        let mut submission = CompletionSubmission::new(CompletionPercentage::Half);
        submission.payload = CompletionPayload::WeightTest { weight_in_kilos: 20 };
        submission.test_value = Some("  ".into());
        let err = submission
            .validate_for(&exercise(true, None, true))
            .unwrap_err();
        match err {
            EigerError::Validation(errors) => {
                assert!(errors.contains("test_value"));
                assert!(!errors.contains("payload"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn percentage_accepts_only_quarters() {
        assert_eq!(CompletionPercentage::try_from(75), Ok(CompletionPercentage::ThreeQuarters));
        assert!(CompletionPercentage::try_from(30).is_err());
        let parsed: CompletionSubmission =
            serde_json::from_str(r#"{"completion_percentage": 50}"#).unwrap();
        assert_eq!(parsed.completion_percentage, CompletionPercentage::Half);
        assert_eq!(parsed.payload, CompletionPayload::Plain);
    }
}
