use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::error::{EigerError, EigerResult, ValidationErrors};

const MAX_EXERCISE_NAME: usize = 50;
const MAX_TAXONOMY_NAME: usize = 30;

/// Named colors offered when creating a category.
pub const CATEGORY_PALETTE: [(&str, &str); 4] = [
    ("deep-orange", "#FF5722"),
    ("teal", "#5BC0EB"),
    ("light-yellow", "#FFB33A"),
    ("lime", "#4CAF50"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    HangboardMaxWeight,
    HangboardMinEdge,
    WeightedPullUps,
    MaxFlashBoulderGrade,
    RateOfForceDevelopment,
}

impl MetricType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::HangboardMaxWeight => "hangboard_max_weight",
            MetricType::HangboardMinEdge => "hangboard_min_edge",
            MetricType::WeightedPullUps => "weighted_pull_ups",
            MetricType::MaxFlashBoulderGrade => "max_flash_boulder_grade",
            MetricType::RateOfForceDevelopment => "rate_of_force_development",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MetricType::HangboardMaxWeight => "Hangboard Max Weight",
            MetricType::HangboardMinEdge => "Hangboard Min Edge",
            MetricType::WeightedPullUps => "Weighted Pull-ups",
            MetricType::MaxFlashBoulderGrade => "Max Flash Boulder Grade",
            MetricType::RateOfForceDevelopment => "Rate of Force Development",
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hangboard_max_weight" => Ok(MetricType::HangboardMaxWeight),
            "hangboard_min_edge" => Ok(MetricType::HangboardMinEdge),
            "weighted_pull_ups" => Ok(MetricType::WeightedPullUps),
            "max_flash_boulder_grade" => Ok(MetricType::MaxFlashBoulderGrade),
            "rate_of_force_development" => Ok(MetricType::RateOfForceDevelopment),
            other => Err(format!("unknown metric type: {other}")),
        }
    }
}

/// Measurement protocol attached to a test exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestConfiguration {
    FingerStrength,
    TimeUnderEffort,
    RateOfForce,
}

impl TestConfiguration {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestConfiguration::FingerStrength => "finger_strength",
            TestConfiguration::TimeUnderEffort => "time_under_effort",
            TestConfiguration::RateOfForce => "rate_of_force",
        }
    }
}

impl fmt::Display for TestConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestConfiguration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "finger_strength" => Ok(TestConfiguration::FingerStrength),
            "time_under_effort" => Ok(TestConfiguration::TimeUnderEffort),
            "rate_of_force" => Ok(TestConfiguration::RateOfForce),
            other => Err(format!("unknown test configuration: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Exercise {
    pub exercise_id: String,
    pub name: String,
    pub description: String,
    pub exercise_type_id: Option<String>,
    pub reviewed: bool,
    pub should_have_time: bool,
    pub should_have_repetition: bool,
    pub should_add_weight: bool,
    pub is_test: bool,
    pub test_configuration: Option<TestConfiguration>,
    pub metric_types: Vec<MetricType>,
    pub created_by: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Exercise {
    /// Reads the exercise columns; metric types are loaded separately.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let created_at: Option<NaiveDateTime> = row.get("created_at")?;
        let test_configuration: Option<String> = row.get("test_configuration")?;
        Ok(Self {
            exercise_id: row.get("exercise_id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            exercise_type_id: row.get("exercise_type_id")?,
            reviewed: row.get("reviewed")?,
            should_have_time: row.get("should_have_time")?,
            should_have_repetition: row.get("should_have_repetition")?,
            should_add_weight: row.get("should_add_weight")?,
            is_test: row.get("is_test")?,
            test_configuration: test_configuration.and_then(|value| value.parse().ok()),
            metric_types: Vec::new(),
            created_by: row.get("created_by")?,
            created_at: created_at.map(|dt| Utc.from_utc_datetime(&dt)),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NewExercise {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub exercise_type_id: Option<String>,
    #[serde(default)]
    pub reviewed: bool,
    #[serde(default)]
    pub should_have_time: bool,
    #[serde(default)]
    pub should_have_repetition: bool,
    #[serde(default)]
    pub should_add_weight: bool,
    #[serde(default)]
    pub is_test: bool,
    #[serde(default)]
    pub test_configuration: Option<TestConfiguration>,
    #[serde(default)]
    pub metric_types: Vec<MetricType>,
    #[serde(default)]
    pub created_by: Option<String>,
}

impl NewExercise {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> EigerResult<()> {
        let mut errors = ValidationErrors::new();
        check_name(&mut errors, &self.name, MAX_EXERCISE_NAME);
        if self.test_configuration.is_some() && !self.is_test {
            errors.add(
                "test_configuration",
                "only test exercises carry a test configuration",
            );
        }
        if !self.metric_types.is_empty() && !self.is_test {
            errors.add("metric_types", "only test exercises produce metrics");
        }
        errors.into_result()
    }
}

/// Trainer edit of an exercise that has not been reviewed yet.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExerciseEdit {
    pub name: String,
    pub exercise_type_id: String,
    pub description: String,
}

impl ExerciseEdit {
    pub fn validate(&self) -> EigerResult<()> {
        let mut errors = ValidationErrors::new();
        check_name(&mut errors, &self.name, MAX_EXERCISE_NAME);
        if self.exercise_type_id.trim().is_empty() {
            errors.add("exercise_type_id", "please select the exercise type");
        }
        if self.description.trim().is_empty() {
            errors.add("description", "please provide a description for the exercise");
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub category_id: String,
    pub name: String,
    pub color: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl Category {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let created_at: Option<NaiveDateTime> = row.get("created_at")?;
        Ok(Self {
            category_id: row.get("category_id")?,
            name: row.get("name")?,
            color: row.get("color")?,
            created_at: created_at.map(|dt| Utc.from_utc_datetime(&dt)),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NewCategory {
    pub name: String,
    /// `#RRGGBB` or one of the [`CATEGORY_PALETTE`] names.
    pub color: String,
}

impl NewCategory {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
        }
    }

    /// The color as stored, with palette names resolved to their hex code.
    pub fn resolved_color(&self) -> Option<String> {
        let color = self.color.trim();
        if let Some((_, hex)) = CATEGORY_PALETTE
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(color))
        {
            return Some((*hex).to_string());
        }
        let digits = color.strip_prefix('#')?;
        if digits.len() == 6 && digits.chars().all(|c| c.is_ascii_hexdigit()) {
            Some(color.to_ascii_uppercase())
        } else {
            None
        }
    }

    pub fn validate(&self) -> EigerResult<()> {
        let mut errors = ValidationErrors::new();
        check_name(&mut errors, &self.name, MAX_TAXONOMY_NAME);
        if self.resolved_color().is_none() {
            errors.add("color", "expected #RRGGBB or a palette color");
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExerciseType {
    pub exercise_type_id: String,
    pub category_id: String,
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl ExerciseType {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let created_at: Option<NaiveDateTime> = row.get("created_at")?;
        Ok(Self {
            exercise_type_id: row.get("exercise_type_id")?,
            category_id: row.get("category_id")?,
            name: row.get("name")?,
            created_at: created_at.map(|dt| Utc.from_utc_datetime(&dt)),
        })
    }
}

/// Prescription a trainer proposes for an exercise. Unset fields are left to
/// the workout.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VariationTargets {
    pub sets: Option<u16>,
    pub repetitions: Option<u16>,
    pub seconds_per_repetition: Option<u16>,
    pub rest_per_set_in_seconds: Option<u16>,
    pub rest_per_repetition_in_seconds: Option<u16>,
    pub weight_in_kilos: Option<u16>,
}

impl VariationTargets {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn validate(&self) -> EigerResult<()> {
        if self.is_empty() {
            return Err(EigerError::validation(
                "targets",
                "a variation needs at least one target",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewExerciseVariation {
    pub exercise_id: String,
    #[serde(flatten)]
    pub targets: VariationTargets,
    pub created_by: String,
    #[serde(default)]
    pub reviewed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExerciseVariation {
    pub variation_id: String,
    pub exercise_id: String,
    #[serde(flatten)]
    pub targets: VariationTargets,
    pub created_by: String,
    pub reviewed: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ExerciseVariation {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let created_at: Option<NaiveDateTime> = row.get("created_at")?;
        let updated_at: Option<NaiveDateTime> = row.get("updated_at")?;
        Ok(Self {
            variation_id: row.get("variation_id")?,
            exercise_id: row.get("exercise_id")?,
            targets: VariationTargets {
                sets: row.get("sets")?,
                repetitions: row.get("repetitions")?,
                seconds_per_repetition: row.get("seconds_per_repetition")?,
                rest_per_set_in_seconds: row.get("rest_per_set_in_seconds")?,
                rest_per_repetition_in_seconds: row.get("rest_per_repetition_in_seconds")?,
                weight_in_kilos: row.get("weight_in_kilos")?,
            },
            created_by: row.get("created_by")?,
            reviewed: row.get("reviewed")?,
            created_at: created_at.map(|dt| Utc.from_utc_datetime(&dt)),
            updated_at: updated_at.map(|dt| Utc.from_utc_datetime(&dt)),
        })
    }
}

/// What a trainer submitted that still waits for review.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PendingReview {
    pub exercises: Vec<Exercise>,
    pub variations: Vec<ExerciseVariation>,
}

fn check_name(errors: &mut ValidationErrors, name: &str, max: usize) {
    let name = name.trim();
    if name.is_empty() {
        errors.add("name", "this field is required");
    } else if name.chars().count() > max {
        errors.add("name", format!("must be at most {max} characters"));
    }
}

/// One step of the perceived-effort scale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rpe {
    pub rpe_id: String,
    pub scale: u8,
    pub description: String,
    pub display_text: String,
}

impl Rpe {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            rpe_id: row.get("rpe_id")?,
            scale: row.get("scale")?,
            description: row.get("description")?,
            display_text: row.get("display_text")?,
        })
    }
}

impl fmt::Display for Rpe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_text)
    }
}
