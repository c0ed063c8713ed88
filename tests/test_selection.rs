//! Integration test: model selection end-to-end

mod common;

use common::{constant_label_matrix, linear_matrix, noise_matrix};
use model_trainer::{
    load_artifact, DatasetSplit, Evaluator, ModelEvaluation, ModelKind, ModelSpec, ModelTrainer,
    ModelTrainerConfig, ParamGrid, Params, Registry, Regressor, Stage, TrainerError,
};
use ndarray::s;
use std::sync::atomic::{AtomicUsize, Ordering};

fn small_registry() -> Registry {
    Registry::new(vec![
        ModelSpec::from_kind(ModelKind::DecisionTree),
        ModelSpec::from_kind(ModelKind::LinearRegression),
        ModelSpec::new(
            "Small Forest",
            ModelKind::RandomForest,
            ParamGrid::new().with("n_estimators", vec![4i64, 8]),
        ),
    ])
}

#[test]
fn test_selects_linear_model_on_linear_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("artifacts").join("model.bin");
    let train = linear_matrix(100, 5, 1);
    let test = linear_matrix(20, 5, 2);

    let config = ModelTrainerConfig::default().with_artifact_path(&path);
    let outcome = ModelTrainer::new(config).run(&train, &test).unwrap();

    assert_eq!(outcome.best_model_name, "Linear Regression");
    assert!(outcome.validation_score > 0.9, "R² = {}", outcome.validation_score);
    assert_eq!(outcome.model_report.len(), 7);
    assert_eq!(outcome.best_params_report.len(), 7);
    assert!(outcome.model_report.contains_key("CatBoosting Regressor"));
    assert!(path.exists());

    // The persisted model reproduces the in-memory predictions exactly
    let (model, metadata) = load_artifact(&path).unwrap();
    assert_eq!(metadata.model_name, "Linear Regression");
    assert_eq!(metadata.model_kind, ModelKind::LinearRegression);
    assert_eq!(metadata.n_features, 5);
    let x_test = test.slice(s![.., ..5]).to_owned();
    assert_eq!(model.predict(&x_test).unwrap(), outcome.best_model.predict(&x_test).unwrap());
}

#[test]
fn test_select_best_model_returns_score() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.bin");
    let config = ModelTrainerConfig::default().with_artifact_path(&path);
    let score = ModelTrainer::new(config)
        .with_registry(small_registry())
        .select_best_model(&linear_matrix(60, 3, 3), &linear_matrix(20, 3, 4))
        .unwrap();
    assert!(score > 0.9);
    assert!(path.exists());
}

#[test]
fn test_no_acceptable_model_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.bin");
    let config = ModelTrainerConfig::default().with_artifact_path(&path);

    let err = ModelTrainer::new(config)
        .with_registry(small_registry())
        .run(&noise_matrix(60, 3, 5), &noise_matrix(20, 3, 6))
        .unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Threshold));
    match err {
        TrainerError::NoAcceptableModel { best_score, threshold, .. } => {
            assert!(best_score < 0.6);
            assert_eq!(threshold, 0.6);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(!path.exists());
}

#[test]
fn test_constant_labels_fail_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.bin");
    let config = ModelTrainerConfig::default().with_artifact_path(&path);

    let err = ModelTrainer::new(config)
        .with_registry(small_registry())
        .run(&constant_label_matrix(40, 3, 7), &constant_label_matrix(10, 3, 8))
        .unwrap_err();

    match err.root_cause() {
        TrainerError::NoAcceptableModel { best_score, .. } => assert_eq!(*best_score, 0.0),
        other => panic!("unexpected error: {}", other),
    }
    assert!(!path.exists());
}

#[test]
fn test_lower_threshold_accepts_weaker_model() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.bin");
    let config = ModelTrainerConfig::default()
        .with_artifact_path(&path)
        .with_acceptance_threshold(-1.0e9);

    let outcome = ModelTrainer::new(config)
        .with_registry(small_registry())
        .run(&noise_matrix(60, 3, 5), &noise_matrix(20, 3, 6))
        .unwrap();
    assert!(path.exists());
    assert_eq!(outcome.model_report[&outcome.best_model_name], outcome.validation_score);
}

/// Fits each entry with its defaults and reports a scripted score
struct Scripted {
    scores: Vec<f64>,
    calls: AtomicUsize,
}

impl Scripted {
    fn new(scores: Vec<f64>) -> Self {
        Self { scores, calls: AtomicUsize::new(0) }
    }
}

impl Evaluator for Scripted {
    fn evaluate(&self, spec: &ModelSpec, data: &DatasetSplit) -> model_trainer::Result<ModelEvaluation> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let idx: usize = spec.name.trim_start_matches("model-").parse().unwrap();
        let mut model = spec.create();
        model.fit(&data.x_train, &data.y_train)?;
        Ok(ModelEvaluation {
            name: spec.name.clone(),
            score: self.scores[idx],
            best_params: Params::new(),
            model,
        })
    }
}

fn scripted_registry(n: usize) -> Registry {
    Registry::new(
        (0..n)
            .map(|i| ModelSpec::new(format!("model-{}", i), ModelKind::LinearRegression, ParamGrid::new()))
            .collect(),
    )
}

#[test]
fn test_tie_goes_to_earliest_entry() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.bin");
    let config = ModelTrainerConfig::default().with_artifact_path(&path);

    let outcome = ModelTrainer::new(config)
        .with_registry(scripted_registry(4))
        .with_evaluator(Scripted::new(vec![0.7, 0.85, 0.85, f64::NAN]))
        .run(&linear_matrix(30, 2, 9), &linear_matrix(10, 2, 10))
        .unwrap();

    assert_eq!(outcome.best_model_name, "model-1");
    assert!(outcome.model_report["model-3"].is_nan());
}

#[test]
fn test_invalid_input_evaluates_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let config = ModelTrainerConfig::default().with_artifact_path(dir.path().join("model.bin"));
    let trainer = ModelTrainer::new(config)
        .with_registry(scripted_registry(2))
        .with_evaluator(Scripted::new(vec![0.9, 0.9]));

    // Column mismatch
    let err = trainer.run(&linear_matrix(30, 3, 1), &linear_matrix(10, 2, 2)).unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Validation));

    // Non-finite value
    let mut train = linear_matrix(30, 2, 1);
    train[[4, 1]] = f64::NAN;
    let err = trainer.run(&train, &linear_matrix(10, 2, 2)).unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Validation));

    // Label only
    let err = trainer
        .run(&linear_matrix(30, 0, 1), &linear_matrix(10, 0, 2))
        .unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Validation));
}

#[test]
fn test_invalid_config_evaluates_nothing() {
    let evaluator = Scripted::new(vec![0.9]);
    let config = ModelTrainerConfig::default().with_cv_folds(1);
    let trainer = ModelTrainer::new(config)
        .with_registry(scripted_registry(1))
        .with_evaluator(evaluator);
    let err = trainer.run(&linear_matrix(30, 2, 1), &linear_matrix(10, 2, 2)).unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Validation));
    assert!(matches!(err.root_cause(), TrainerError::ConfigError(_)));
}

#[test]
fn test_duplicate_registry_names_rejected() {
    let registry = Registry::new(vec![
        ModelSpec::from_kind(ModelKind::LinearRegression),
        ModelSpec::from_kind(ModelKind::LinearRegression),
    ]);
    let err = ModelTrainer::new(ModelTrainerConfig::default())
        .with_registry(registry)
        .run(&linear_matrix(30, 2, 1), &linear_matrix(10, 2, 2))
        .unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Validation));
}

#[test]
fn test_selection_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let train = linear_matrix(50, 3, 11);
    let test = linear_matrix(15, 3, 12);

    let run = |name: &str| {
        let config = ModelTrainerConfig::default().with_artifact_path(dir.path().join(name));
        ModelTrainer::new(config)
            .with_registry(small_registry())
            .run(&train, &test)
            .unwrap()
    };
    let a = run("a.bin");
    let b = run("b.bin");
    assert_eq!(a.best_model_name, b.best_model_name);
    assert_eq!(a.model_report, b.model_report);
    assert_eq!(a.validation_score, b.validation_score);
}

#[test]
fn test_parallel_matches_sequential() {
    let dir = tempfile::tempdir().unwrap();
    let train = linear_matrix(50, 3, 13);
    let test = linear_matrix(15, 3, 14);

    let sequential = ModelTrainer::new(
        ModelTrainerConfig::default().with_artifact_path(dir.path().join("seq.bin")),
    )
    .with_registry(small_registry())
    .run(&train, &test)
    .unwrap();
    let parallel = ModelTrainer::new(
        ModelTrainerConfig::default()
            .with_artifact_path(dir.path().join("par.bin"))
            .with_parallel(true),
    )
    .with_registry(small_registry())
    .run(&train, &test)
    .unwrap();

    assert_eq!(sequential.best_model_name, parallel.best_model_name);
    assert_eq!(sequential.model_report, parallel.model_report);
    assert_eq!(sequential.best_params_report, parallel.best_params_report);
}

#[test]
fn test_persist_failure_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"not a directory").unwrap();
    let path = blocker.join("model.bin");

    let config = ModelTrainerConfig::default().with_artifact_path(&path);
    let err = ModelTrainer::new(config)
        .with_registry(small_registry())
        .run(&linear_matrix(40, 2, 15), &linear_matrix(10, 2, 16))
        .unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Persist));
    assert!(matches!(err.root_cause(), TrainerError::IoError(_)));
    assert!(!path.exists());
}

#[test]
fn test_custom_registry_entry() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.bin");
    let registry = Registry::new(vec![ModelSpec::new(
        "Shallow Tree",
        ModelKind::DecisionTree,
        ParamGrid::new().with("max_depth", vec![2i64, 4]),
    )]);
    let outcome = ModelTrainer::new(
        ModelTrainerConfig::default()
            .with_artifact_path(&path)
            .with_acceptance_threshold(0.0),
    )
    .with_registry(registry)
    .run(&linear_matrix(60, 2, 17), &linear_matrix(20, 2, 18))
    .unwrap();

    assert_eq!(outcome.best_model_name, "Shallow Tree");
    assert!(outcome.parameters.contains_key("max_depth"));
    assert!(outcome.best_params_report["Shallow Tree"].contains_key("max_depth"));
}
