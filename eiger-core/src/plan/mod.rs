pub mod builder;
pub mod cloner;
pub mod models;
pub mod store;

pub use builder::{build_plan, NewTrainingPlan, PlanBuilder, DEFAULT_MAX_DURATION_WEEKS};
pub use cloner::{clone_plan, ClonePlanRequest};
pub use models::{
    Day, DayDetail, DayTree, ExerciseSelection, PlanOverview, PlanPhase, PlanSummary,
    ScheduledWorkout, TargetTimeUnit, TrainingPlan, TrainingPlanTree, Week, WeekTree, Workout,
    WorkoutTargets, WorkoutUpdate,
};
pub use store::SqlitePlanStore;
