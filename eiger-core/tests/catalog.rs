use eiger_core::{
    EigerError, EigerStores, ExerciseEdit, NewCategory, NewExercise, NewExerciseVariation,
    VariationTargets,
};
use tempfile::TempDir;

fn setup() -> (TempDir, EigerStores) {
    let dir = tempfile::tempdir().unwrap();
    let stores = EigerStores::open(dir.path().join("eiger.sqlite")).unwrap();
    stores.initialize().unwrap();
    (dir, stores)
}

fn validation_field(err: EigerError, field: &str) {
    match err {
        EigerError::Validation(errors) => assert!(errors.contains(field), "{errors}"),
        other => panic!("unexpected error: {other:?}"),
    }
}

/// Registers a pending exercise of a fresh "Strength / Hangboard" type.
fn pending_exercise(stores: &EigerStores, trainer: &str) -> String {
    let category = stores
        .catalog
        .add_category(&NewCategory::new("Strength", "deep-orange"))
        .unwrap();
    let exercise_type = stores
        .catalog
        .add_exercise_type(&category.category_id, "Hangboard")
        .unwrap();
    let mut exercise = NewExercise::new("Density hangs");
    exercise.description = "Long hangs on a medium edge".into();
    exercise.exercise_type_id = Some(exercise_type.exercise_type_id);
    exercise.created_by = Some(trainer.into());
    stores.catalog.add_exercise(&exercise).unwrap().exercise_id
}

fn sets_and_weight(sets: u16, weight: Option<u16>) -> VariationTargets {
    VariationTargets {
        sets: Some(sets),
        weight_in_kilos: weight,
        ..VariationTargets::default()
    }
}

#[test]
fn exercise_types_are_scoped_to_their_category() {
    let (_dir, stores) = setup();
    let strength = stores
        .catalog
        .add_category(&NewCategory::new("Strength", "#ff5722"))
        .unwrap();
    assert_eq!(strength.color, "#FF5722");
    let endurance = stores
        .catalog
        .add_category(&NewCategory::new("Endurance", "lime"))
        .unwrap();

    stores
        .catalog
        .add_exercise_type(&strength.category_id, "Hangboard")
        .unwrap();
    stores
        .catalog
        .add_exercise_type(&strength.category_id, "Campus")
        .unwrap();
    stores
        .catalog
        .add_exercise_type(&endurance.category_id, "Hangboard")
        .unwrap();

    let err = stores
        .catalog
        .add_exercise_type(&strength.category_id, "Campus")
        .unwrap_err();
    validation_field(err, "name");

    let names: Vec<String> = stores
        .catalog
        .list_exercise_types(&strength.category_id)
        .unwrap()
        .into_iter()
        .map(|exercise_type| exercise_type.name)
        .collect();
    assert_eq!(names, vec!["Campus", "Hangboard"]);
    assert!(stores
        .catalog
        .list_exercise_types("no-such-category")
        .unwrap()
        .is_empty());

    let err = stores
        .catalog
        .add_exercise_type("no-such-category", "Board")
        .unwrap_err();
    assert!(matches!(err, EigerError::NotFound { .. }));

    let err = stores
        .catalog
        .add_category(&NewCategory::new("Strength", "teal"))
        .unwrap_err();
    validation_field(err, "name");
    assert_eq!(stores.catalog.list_categories().unwrap().len(), 2);
}

#[test]
fn exercise_with_unknown_type_is_rejected() {
    let (_dir, stores) = setup();
    let mut exercise = NewExercise::new("Limit bouldering");
    exercise.exercise_type_id = Some("ghost".into());
    let err = stores.catalog.add_exercise(&exercise).unwrap_err();
    validation_field(err, "exercise_type_id");
    assert!(stores.catalog.list_exercises(false).unwrap().is_empty());
}

#[test]
fn trainer_edits_only_their_pending_exercise() {
    let (_dir, stores) = setup();
    let exercise_id = pending_exercise(&stores, "trainer-a");
    let exercise = stores.catalog.fetch_exercise(&exercise_id).unwrap().unwrap();
    let exercise_type_id = exercise.exercise_type_id.clone().unwrap();

    let edit = ExerciseEdit {
        name: "Density hangs 20mm".into(),
        exercise_type_id: exercise_type_id.clone(),
        description: "Ten second hangs on a 20mm edge".into(),
    };
    let updated = stores
        .catalog
        .update_exercise(&exercise_id, "trainer-a", &edit)
        .unwrap();
    assert_eq!(updated.name, "Density hangs 20mm");
    assert_eq!(updated.exercise_type_id, Some(exercise_type_id));

    let err = stores
        .catalog
        .update_exercise(&exercise_id, "trainer-b", &edit)
        .unwrap_err();
    assert!(matches!(err, EigerError::NotFound { .. }));

    let mut missing_description = edit.clone();
    missing_description.description = "  ".into();
    let err = stores
        .catalog
        .update_exercise(&exercise_id, "trainer-a", &missing_description)
        .unwrap_err();
    validation_field(err, "description");

    stores.catalog.set_reviewed(&exercise_id, true).unwrap();
    let err = stores
        .catalog
        .update_exercise(&exercise_id, "trainer-a", &edit)
        .unwrap_err();
    assert!(matches!(err, EigerError::NotFound { .. }));
}

#[test]
fn identical_variations_collide_even_with_unset_targets() {
    let (_dir, stores) = setup();
    let exercise_id = pending_exercise(&stores, "trainer-a");
    let variation = NewExerciseVariation {
        exercise_id: exercise_id.clone(),
        targets: sets_and_weight(5, None),
        created_by: "trainer-a".into(),
        reviewed: false,
    };
    stores.catalog.add_variation(&variation).unwrap();

    let err = stores.catalog.add_variation(&variation).unwrap_err();
    validation_field(err, "targets");

    let heavier = NewExerciseVariation {
        targets: sets_and_weight(5, Some(10)),
        ..variation.clone()
    };
    stores.catalog.add_variation(&heavier).unwrap();
    assert_eq!(stores.catalog.list_variations(&exercise_id, false).unwrap().len(), 2);

    let empty = NewExerciseVariation {
        targets: VariationTargets::default(),
        ..variation
    };
    validation_field(stores.catalog.add_variation(&empty).unwrap_err(), "targets");
}

#[test]
fn variation_review_closes_trainer_edits() {
    let (_dir, stores) = setup();
    let exercise_id = pending_exercise(&stores, "trainer-a");
    let variation = stores
        .catalog
        .add_variation(&NewExerciseVariation {
            exercise_id: exercise_id.clone(),
            targets: sets_and_weight(4, Some(5)),
            created_by: "trainer-a".into(),
            reviewed: false,
        })
        .unwrap();

    let pending = stores.catalog.pending_review("trainer-a").unwrap();
    assert_eq!(pending.exercises.len(), 1);
    assert_eq!(pending.variations.len(), 1);
    assert!(stores
        .catalog
        .pending_review("trainer-b")
        .unwrap()
        .variations
        .is_empty());

    let updated = stores
        .catalog
        .update_variation(&variation.variation_id, "trainer-a", &sets_and_weight(6, Some(5)))
        .unwrap();
    assert_eq!(updated.targets.sets, Some(6));

    let err = stores
        .catalog
        .update_variation(&variation.variation_id, "trainer-b", &sets_and_weight(3, None))
        .unwrap_err();
    assert!(matches!(err, EigerError::NotFound { .. }));

    let reviewed = stores
        .catalog
        .set_variation_reviewed(&variation.variation_id, true)
        .unwrap();
    assert!(reviewed.reviewed);
    assert_eq!(stores.catalog.list_variations(&exercise_id, true).unwrap().len(), 1);
    assert!(stores
        .catalog
        .pending_review("trainer-a")
        .unwrap()
        .variations
        .is_empty());

    let err = stores
        .catalog
        .update_variation(&variation.variation_id, "trainer-a", &sets_and_weight(3, None))
        .unwrap_err();
    assert!(matches!(err, EigerError::NotFound { .. }));
}
