pub mod calendar;
pub mod catalog;
pub mod completion;
pub mod config;
pub mod error;
pub mod plan;
pub mod sqlite;
pub mod stores;

pub use calendar::{iso_week_number, iso_year, resolve_date, week_window, Weekday};
pub use catalog::{
    Category, Exercise, ExerciseEdit, ExerciseType, ExerciseVariation, MetricType, NewCategory,
    NewExercise, NewExerciseVariation, PendingReview, Rpe, SqliteCatalogStore, TestConfiguration,
    VariationTargets, CATEGORY_PALETTE,
};
pub use completion::{
    ArmProtocol, ClimberMetric, CompletedWorkout, CompletionPayload, CompletionPercentage,
    CompletionReceipt, CompletionRecorder, CompletionSubmission, FanoutConfig, FanoutOutcome,
    GripType, MetricFanout, OutboxCounts, OutboxEntry, OutboxStatus, PayloadKind,
    SqliteOutboxStore,
};
pub use config::{load_eiger_config, EigerConfig, LoggingSection, OutboxSection};
pub use error::{ConfigError, EigerError, EigerResult, EntityKind, Result, ValidationErrors};
pub use plan::{
    build_plan, clone_plan, ClonePlanRequest, Day, DayDetail, ExerciseSelection, NewTrainingPlan,
    PlanBuilder, PlanOverview, PlanPhase, PlanSummary, SqlitePlanStore, TargetTimeUnit,
    TrainingPlan, TrainingPlanTree, Week, Workout, WorkoutTargets, WorkoutUpdate,
};
pub use sqlite::{SqliteDatabase, SqliteDatabaseBuilder};
pub use stores::EigerStores;
