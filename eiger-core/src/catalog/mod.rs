pub mod models;
pub mod store;

pub use models::{
    Category, Exercise, ExerciseEdit, ExerciseType, ExerciseVariation, MetricType, NewCategory,
    NewExercise, NewExerciseVariation, PendingReview, Rpe, TestConfiguration, VariationTargets,
    CATEGORY_PALETTE,
};
pub use store::SqliteCatalogStore;
