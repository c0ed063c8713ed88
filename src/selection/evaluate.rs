//! Evaluation seam between the orchestrator and the search machinery

use super::dataset::DatasetSplit;
use super::registry::ModelSpec;
use crate::error::Result;
use crate::training::{r2_score, GridSearch, Params, Regressor, RegressorModel};
use tracing::debug;

/// Score of one registry entry on the test split
#[derive(Debug, Clone)]
pub struct ModelEvaluation {
    pub name: String,
    /// Test-split R² of `model`
    pub score: f64,
    /// Winning hyperparameter combination
    pub best_params: Params,
    /// Fitted model
    pub model: RegressorModel,
}

/// Fits, tunes and scores one candidate
pub trait Evaluator: Sync {
    fn evaluate(&self, spec: &ModelSpec, data: &DatasetSplit) -> Result<ModelEvaluation>;
}

/// Grid search on the training split, scored on the test split
#[derive(Debug, Clone)]
pub struct GridSearchEvaluator {
    pub cv_folds: usize,
    pub shuffle: bool,
    pub random_state: Option<u64>,
    /// Evaluate grid combinations in parallel
    pub parallel: bool,
}

impl Default for GridSearchEvaluator {
    fn default() -> Self {
        Self {
            cv_folds: 3,
            shuffle: false,
            random_state: None,
            parallel: false,
        }
    }
}

impl Evaluator for GridSearchEvaluator {
    fn evaluate(&self, spec: &ModelSpec, data: &DatasetSplit) -> Result<ModelEvaluation> {
        let outcome = GridSearch::new(spec.create(), spec.grid.clone())
            .with_folds(self.cv_folds)
            .with_shuffle(self.shuffle, self.random_state)
            .with_parallel(self.parallel)
            .fit(&data.x_train, &data.y_train)?;

        let y_pred = outcome.model.predict(&data.x_test)?;
        let score = r2_score(&data.y_test, &y_pred)?;
        debug!(
            model = %spec.name,
            cv_score = outcome.best_score,
            test_score = score,
            "Candidate evaluated"
        );

        Ok(ModelEvaluation {
            name: spec.name.clone(),
            score,
            best_params: outcome.best_params,
            model: outcome.model,
        })
    }
}
