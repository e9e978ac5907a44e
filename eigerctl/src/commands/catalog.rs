use clap::{ArgAction, Args, Subcommand, ValueEnum};
use eiger_core::{
    ExerciseEdit, MetricType, NewCategory, NewExercise, NewExerciseVariation, TestConfiguration,
    VariationTargets,
};

#[derive(Subcommand, Debug)]
pub enum ExerciseCommands {
    /// Register a new exercise
    Add(ExerciseAddArgs),
    /// List registered exercises
    List(ExerciseListArgs),
    /// Mark an exercise as reviewed so it can be scheduled
    Review(ExerciseReviewArgs),
    /// Replace the metrics a test exercise feeds
    Metrics(ExerciseMetricsArgs),
    /// Edit an exercise you submitted that is still pending review
    Edit(ExerciseEditArgs),
    /// Show what a trainer submitted that still awaits review
    Pending(ExercisePendingArgs),
    /// Trainer-proposed prescriptions of an exercise
    #[command(subcommand)]
    Variation(VariationCommands),
}

#[derive(Args, Debug)]
pub struct ExerciseAddArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long, default_value = "")]
    pub description: String,
    /// Exercise type id (see `category types`)
    #[arg(long = "type")]
    pub exercise_type: Option<String>,
    /// Register the exercise as already reviewed
    #[arg(long)]
    pub reviewed: bool,
    #[arg(long)]
    pub time: bool,
    #[arg(long)]
    pub repetitions: bool,
    #[arg(long)]
    pub weight: bool,
    /// Completions of this exercise produce climber metrics
    #[arg(long)]
    pub test: bool,
    #[arg(long = "test-config", value_enum)]
    pub test_configuration: Option<TestConfigurationArg>,
    /// Metric fed by the test (repeat the flag for several)
    #[arg(long = "metric", value_enum, action = ArgAction::Append)]
    pub metrics: Vec<MetricTypeArg>,
    #[arg(long = "created-by")]
    pub created_by: Option<String>,
}

impl ExerciseAddArgs {
    pub fn to_new_exercise(&self) -> NewExercise {
        NewExercise {
            name: self.name.clone(),
            description: self.description.clone(),
            exercise_type_id: self.exercise_type.clone(),
            reviewed: self.reviewed,
            should_have_time: self.time,
            should_have_repetition: self.repetitions,
            should_add_weight: self.weight,
            is_test: self.test,
            test_configuration: self.test_configuration.map(Into::into),
            metric_types: self.metrics.iter().copied().map(Into::into).collect(),
            created_by: self.created_by.clone(),
        }
    }
}

#[derive(Args, Debug)]
pub struct ExerciseListArgs {
    /// Only show reviewed exercises
    #[arg(long)]
    pub reviewed: bool,
}

#[derive(Args, Debug)]
pub struct ExerciseReviewArgs {
    pub exercise_id: String,
    /// Withdraw the review instead
    #[arg(long)]
    pub revoke: bool,
}

#[derive(Args, Debug)]
pub struct ExerciseMetricsArgs {
    pub exercise_id: String,
    #[arg(long = "metric", value_enum, action = ArgAction::Append)]
    pub metrics: Vec<MetricTypeArg>,
}

impl ExerciseMetricsArgs {
    pub fn metric_types(&self) -> Vec<MetricType> {
        self.metrics.iter().copied().map(Into::into).collect()
    }
}

#[derive(Args, Debug)]
pub struct ExerciseEditArgs {
    pub exercise_id: String,
    #[arg(long)]
    pub trainer: String,
    #[arg(long)]
    pub name: String,
    #[arg(long = "type")]
    pub exercise_type: String,
    #[arg(long)]
    pub description: String,
}

impl ExerciseEditArgs {
    pub fn to_edit(&self) -> ExerciseEdit {
        ExerciseEdit {
            name: self.name.clone(),
            exercise_type_id: self.exercise_type.clone(),
            description: self.description.clone(),
        }
    }
}

#[derive(Args, Debug)]
pub struct ExercisePendingArgs {
    #[arg(long)]
    pub trainer: String,
}

#[derive(Subcommand, Debug)]
pub enum VariationCommands {
    /// Propose a variation of an exercise
    Add(VariationAddArgs),
    /// Change the targets of a pending variation
    Update(VariationUpdateArgs),
    /// Mark a variation as reviewed
    Review(VariationReviewArgs),
    /// List the variations of an exercise
    List(VariationListArgs),
}

#[derive(Args, Debug)]
pub struct VariationTargetArgs {
    #[arg(long)]
    pub sets: Option<u16>,
    #[arg(long)]
    pub repetitions: Option<u16>,
    #[arg(long = "seconds-per-rep")]
    pub seconds_per_repetition: Option<u16>,
    #[arg(long = "rest-per-set")]
    pub rest_per_set: Option<u16>,
    #[arg(long = "rest-per-rep")]
    pub rest_per_repetition: Option<u16>,
    /// Added weight in kilos
    #[arg(long)]
    pub weight: Option<u16>,
}

impl VariationTargetArgs {
    pub fn to_targets(&self) -> VariationTargets {
        VariationTargets {
            sets: self.sets,
            repetitions: self.repetitions,
            seconds_per_repetition: self.seconds_per_repetition,
            rest_per_set_in_seconds: self.rest_per_set,
            rest_per_repetition_in_seconds: self.rest_per_repetition,
            weight_in_kilos: self.weight,
        }
    }
}

#[derive(Args, Debug)]
pub struct VariationAddArgs {
    pub exercise_id: String,
    #[arg(long)]
    pub trainer: String,
    #[command(flatten)]
    pub targets: VariationTargetArgs,
    #[arg(long)]
    pub reviewed: bool,
}

impl VariationAddArgs {
    pub fn to_new_variation(&self) -> NewExerciseVariation {
        NewExerciseVariation {
            exercise_id: self.exercise_id.clone(),
            targets: self.targets.to_targets(),
            created_by: self.trainer.clone(),
            reviewed: self.reviewed,
        }
    }
}

#[derive(Args, Debug)]
pub struct VariationUpdateArgs {
    pub variation_id: String,
    #[arg(long)]
    pub trainer: String,
    #[command(flatten)]
    pub targets: VariationTargetArgs,
}

#[derive(Args, Debug)]
pub struct VariationReviewArgs {
    pub variation_id: String,
    #[arg(long)]
    pub revoke: bool,
}

#[derive(Args, Debug)]
pub struct VariationListArgs {
    pub exercise_id: String,
    #[arg(long)]
    pub reviewed: bool,
}

#[derive(Subcommand, Debug)]
pub enum CategoryCommands {
    /// Create a category
    Add(CategoryAddArgs),
    /// List categories
    List,
    /// Add an exercise type to a category
    AddType(CategoryTypeAddArgs),
    /// List the exercise types of a category
    Types(CategoryTypesArgs),
}

#[derive(Args, Debug)]
pub struct CategoryAddArgs {
    #[arg(long)]
    pub name: String,
    /// #RRGGBB or deep-orange, teal, light-yellow, lime
    #[arg(long)]
    pub color: String,
}

impl CategoryAddArgs {
    pub fn to_new_category(&self) -> NewCategory {
        NewCategory::new(self.name.clone(), self.color.clone())
    }
}

#[derive(Args, Debug)]
pub struct CategoryTypeAddArgs {
    pub category_id: String,
    #[arg(long)]
    pub name: String,
}

#[derive(Args, Debug)]
pub struct CategoryTypesArgs {
    pub category_id: String,
}

#[derive(Args, Debug)]
pub struct MetricsArgs {
    #[arg(long)]
    pub climber: String,
    /// Only show one metric type
    #[arg(long, value_enum)]
    pub metric: Option<MetricTypeArg>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TestConfigurationArg {
    FingerStrength,
    TimeUnderEffort,
    RateOfForce,
}

impl From<TestConfigurationArg> for TestConfiguration {
    fn from(value: TestConfigurationArg) -> Self {
        match value {
            TestConfigurationArg::FingerStrength => TestConfiguration::FingerStrength,
            TestConfigurationArg::TimeUnderEffort => TestConfiguration::TimeUnderEffort,
            TestConfigurationArg::RateOfForce => TestConfiguration::RateOfForce,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MetricTypeArg {
    HangboardMaxWeight,
    HangboardMinEdge,
    WeightedPullUps,
    MaxFlashBoulderGrade,
    RateOfForceDevelopment,
}

impl From<MetricTypeArg> for MetricType {
    fn from(value: MetricTypeArg) -> Self {
        match value {
            MetricTypeArg::HangboardMaxWeight => MetricType::HangboardMaxWeight,
            MetricTypeArg::HangboardMinEdge => MetricType::HangboardMinEdge,
            MetricTypeArg::WeightedPullUps => MetricType::WeightedPullUps,
            MetricTypeArg::MaxFlashBoulderGrade => MetricType::MaxFlashBoulderGrade,
            MetricTypeArg::RateOfForceDevelopment => MetricType::RateOfForceDevelopment,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum RpeCommands {
    /// Add a step to the perceived effort scale
    Add(RpeAddArgs),
    /// Show the perceived effort scale
    List,
}

#[derive(Args, Debug)]
pub struct RpeAddArgs {
    #[arg(long)]
    pub scale: u8,
    #[arg(long = "display")]
    pub display_text: String,
    #[arg(long, default_value = "")]
    pub description: String,
}
