//! Selection orchestrator: evaluate every registry entry, keep the best

use super::config::ModelTrainerConfig;
use super::dataset::DatasetSplit;
use super::evaluate::{Evaluator, GridSearchEvaluator, ModelEvaluation};
use super::registry::Registry;
use crate::error::{Result, Stage, TrainerError};
use crate::export::{save_artifact, ArtifactMetadata};
use crate::training::{format_params, r2_score, Params, Regressor, RegressorModel};
use ndarray::Array2;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info};

/// Test-split R² per model name
pub type ModelReport = BTreeMap<String, f64>;

/// Winning hyperparameters per model name
pub type BestParamsReport = BTreeMap<String, Params>;

/// Everything a successful selection produced
#[derive(Debug, Clone)]
pub struct SelectionOutcome {
    pub best_model_name: String,
    /// Fitted winner, as persisted
    pub best_model: RegressorModel,
    /// Winner's R² on the test split, recomputed from the persisted model
    pub validation_score: f64,
    pub model_report: ModelReport,
    pub best_params_report: BestParamsReport,
    /// Winner's full hyperparameter table
    pub parameters: Params,
    pub artifact_path: PathBuf,
}

/// Runs one selection pass over a registry
pub struct ModelTrainer<E: Evaluator = GridSearchEvaluator> {
    config: ModelTrainerConfig,
    registry: Registry,
    evaluator: E,
}

impl ModelTrainer<GridSearchEvaluator> {
    /// Trainer over the default registry, searching with the config's CV settings
    pub fn new(config: ModelTrainerConfig) -> Self {
        let evaluator = GridSearchEvaluator {
            cv_folds: config.cv_folds,
            shuffle: config.shuffle_folds,
            random_state: config.random_state,
            parallel: false,
        };
        Self {
            config,
            registry: Registry::default(),
            evaluator,
        }
    }
}

impl<E: Evaluator> ModelTrainer<E> {
    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    /// Swap the evaluation strategy
    pub fn with_evaluator<F: Evaluator>(self, evaluator: F) -> ModelTrainer<F> {
        ModelTrainer {
            config: self.config,
            registry: self.registry,
            evaluator,
        }
    }

    pub fn config(&self) -> &ModelTrainerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Select, rescore and persist the best model; returns the validation R²
    pub fn select_best_model(&self, train: &Array2<f64>, test: &Array2<f64>) -> Result<f64> {
        self.run(train, test).map(|outcome| outcome.validation_score)
    }

    /// Full selection pass
    pub fn run(&self, train: &Array2<f64>, test: &Array2<f64>) -> Result<SelectionOutcome> {
        self.config
            .validate()
            .map_err(|e| TrainerError::at_stage(Stage::Validation, "configuration", e))?;
        self.registry
            .validate()
            .map_err(|e| TrainerError::at_stage(Stage::Validation, "model registry", e))?;
        let data = DatasetSplit::from_arrays(train, test)
            .map_err(|e| TrainerError::at_stage(Stage::Validation, "train/test split", e))?;

        info!(
            n_train = data.n_train(),
            n_test = data.n_test(),
            n_features = data.n_features(),
            n_models = self.registry.len(),
            "Split training and test input data"
        );

        let evaluations = self.evaluate_all(&data)?;

        let mut model_report = ModelReport::new();
        let mut best_params_report = BestParamsReport::new();
        for evaluation in &evaluations {
            model_report.insert(evaluation.name.clone(), evaluation.score);
            best_params_report.insert(evaluation.name.clone(), evaluation.best_params.clone());
        }

        let threshold = self.config.acceptance_threshold;
        let best = match best_evaluation(&evaluations) {
            Some(best) => best,
            None => {
                return Err(TrainerError::NoAcceptableModel {
                    best_model: evaluations
                        .first()
                        .map(|e| e.name.clone())
                        .unwrap_or_default(),
                    best_score: f64::NAN,
                    threshold,
                })
            }
        };
        info!(
            model = %best.name,
            score = best.score,
            params = %format_params(&best.best_params),
            "Best model found"
        );

        if best.score < threshold {
            return Err(TrainerError::NoAcceptableModel {
                best_model: best.name.clone(),
                best_score: best.score,
                threshold,
            });
        }

        // A rescoring failure must leave no artifact
        let validation_score = best
            .model
            .predict(&data.x_test)
            .and_then(|y_pred| r2_score(&data.y_test, &y_pred))
            .map_err(|e| TrainerError::at_stage(Stage::Search, format!("rescoring '{}'", best.name), e))?;

        let path = self.config.artifact_path.clone();
        let metadata = ArtifactMetadata::new(&best.name, &best.model, data.n_features())
            .with_best_params(best.best_params.clone())
            .with_test_r2(validation_score);
        save_artifact(&best.model, metadata, &path, self.config.format).map_err(|e| {
            TrainerError::at_stage(Stage::Persist, path.display().to_string(), e)
        })?;
        info!(path = %path.display(), "Persisted best model");
        info!(model = %best.name, validation_score, "Validation score on test split");

        Ok(SelectionOutcome {
            best_model_name: best.name.clone(),
            parameters: best.model.get_params(),
            best_model: best.model.clone(),
            validation_score,
            model_report,
            best_params_report,
            artifact_path: path,
        })
    }

    /// One evaluation per registry entry, in registry order. The first
    /// failure in that order aborts the pass.
    fn evaluate_all(&self, data: &DatasetSplit) -> Result<Vec<ModelEvaluation>> {
        let specs = self.registry.specs();
        let wrap = |name: &str, e: TrainerError| {
            TrainerError::at_stage(Stage::Search, format!("model '{}'", name), e)
        };

        if self.config.parallel {
            let results: Vec<Result<ModelEvaluation>> = specs
                .par_iter()
                .map(|spec| {
                    debug!(model = %spec.name, "Evaluating model");
                    self.evaluator.evaluate(spec, data)
                })
                .collect();
            specs
                .iter()
                .zip(results)
                .map(|(spec, result)| result.map_err(|e| wrap(&spec.name, e)))
                .collect()
        } else {
            let mut evaluations = Vec::with_capacity(specs.len());
            for spec in specs {
                debug!(model = %spec.name, combinations = spec.grid.n_combinations(), "Evaluating model");
                let evaluation = self.evaluator.evaluate(spec, data).map_err(|e| wrap(&spec.name, e))?;
                debug!(model = %spec.name, score = evaluation.score, "Model evaluated");
                evaluations.push(evaluation);
            }
            Ok(evaluations)
        }
    }
}

/// Highest score, earliest in registry order on ties; NaN never wins
fn best_evaluation(evaluations: &[ModelEvaluation]) -> Option<&ModelEvaluation> {
    let mut best: Option<&ModelEvaluation> = None;
    for evaluation in evaluations {
        if evaluation.score.is_nan() {
            continue;
        }
        if best.map_or(true, |b| evaluation.score > b.score) {
            best = Some(evaluation);
        }
    }
    best
}
