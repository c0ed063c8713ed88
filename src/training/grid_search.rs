//! Exhaustive hyperparameter grid search with K-fold cross-validation

use super::cross_validation::{CVResults, KFold};
use super::models::{r2_score, Regressor};
use super::params::{format_params, ParamGrid, Params};
use super::regressor::RegressorModel;
use crate::error::{Result, TrainerError};
use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use tracing::{debug, warn};

/// Cross-validated score of one grid combination
#[derive(Debug, Clone)]
pub struct CandidateResult {
    pub params: Params,
    pub cv: CVResults,
}

/// Result of a completed search
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Winning combination
    pub best_params: Params,
    /// Mean cross-validated R² of the winning combination
    pub best_score: f64,
    /// Every combination in grid order
    pub results: Vec<CandidateResult>,
    /// Base model refit on the full training data with `best_params`
    pub model: RegressorModel,
}

/// Grid search over a base model
#[derive(Debug, Clone)]
pub struct GridSearch {
    base: RegressorModel,
    grid: ParamGrid,
    n_folds: usize,
    shuffle: bool,
    random_state: Option<u64>,
    parallel: bool,
}

impl GridSearch {
    pub fn new(base: RegressorModel, grid: ParamGrid) -> Self {
        Self {
            base,
            grid,
            n_folds: 3,
            shuffle: false,
            random_state: None,
            parallel: false,
        }
    }

    /// Number of cross-validation folds
    pub fn with_folds(mut self, n_folds: usize) -> Self {
        self.n_folds = n_folds;
        self
    }

    /// Shuffle rows before cutting folds
    pub fn with_shuffle(mut self, shuffle: bool, random_state: Option<u64>) -> Self {
        self.shuffle = shuffle;
        self.random_state = random_state;
        self
    }

    /// Evaluate combinations on the rayon pool
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Run the search and refit the best combination on all of `x`, `y`
    pub fn fit(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<SearchOutcome> {
        let n_samples = x.nrows();
        if n_samples < 2 {
            return Err(TrainerError::ValidationError(format!(
                "Grid search needs at least 2 training rows, got {}",
                n_samples
            )));
        }

        let mut kfold = KFold::new(self.n_folds.min(n_samples)).with_shuffle(self.shuffle);
        if let Some(seed) = self.random_state {
            kfold = kfold.with_random_state(seed);
        }
        let splits = kfold.split(n_samples)?;
        let combinations = self.grid.combinations();

        let evaluate = |params: &Params| -> Result<CVResults> {
            let mut model = self.base.clone();
            model.set_params(params)?;
            let scores = splits
                .iter()
                .map(|split| {
                    let x_train = x.select(Axis(0), &split.train_indices);
                    let y_train = y.select(Axis(0), &split.train_indices);
                    let x_valid = x.select(Axis(0), &split.test_indices);
                    let y_valid = y.select(Axis(0), &split.test_indices);

                    let mut fold_model = model.clone();
                    fold_model.fit(&x_train, &y_train)?;
                    r2_score(&y_valid, &fold_model.predict(&x_valid)?)
                })
                .collect::<Result<Vec<f64>>>()?;
            Ok(CVResults::from_scores(scores))
        };

        // Collected in grid order either way
        let outcomes: Vec<Result<CVResults>> = if self.parallel {
            combinations.par_iter().map(evaluate).collect()
        } else {
            combinations.iter().map(evaluate).collect()
        };

        let mut results = Vec::with_capacity(combinations.len());
        let mut last_error = None;
        for (params, outcome) in combinations.into_iter().zip(outcomes) {
            let cv = match outcome {
                Ok(cv) => cv,
                Err(e) => {
                    warn!(params = %format_params(&params), error = %e, "Grid candidate failed, scored as NaN");
                    last_error = Some(e);
                    CVResults::failed()
                }
            };
            results.push(CandidateResult { params, cv });
        }

        let best_idx = best_candidate(&results);
        let best_idx = match (best_idx, last_error) {
            (Some(idx), _) => idx,
            (None, Some(e)) => return Err(e),
            (None, None) => {
                return Err(TrainerError::TrainingError(
                    "Grid search produced no scored candidates".to_string(),
                ))
            }
        };

        let best = &results[best_idx];
        debug!(
            params = %format_params(&best.params),
            score = best.cv.mean_score,
            "Grid search best combination"
        );

        let mut model = self.base.clone();
        model.set_params(&best.params)?;
        model.fit(x, y)?;

        Ok(SearchOutcome {
            best_params: best.params.clone(),
            best_score: best.cv.mean_score,
            results,
            model,
        })
    }
}

/// Highest mean score, earliest on ties; failed candidates never win
fn best_candidate(results: &[CandidateResult]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, result) in results.iter().enumerate() {
        let score = result.cv.mean_score;
        if score.is_nan() {
            continue;
        }
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((idx, score));
        }
    }
    best.map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::params::ParamValue;
    use crate::training::regressor::ModelKind;

    fn linear_data(n: usize) -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((n, 2), |(i, j)| ((i * 3 + j * 5) % 13) as f64);
        let y = x.rows().into_iter().map(|r| r[0] - 2.0 * r[1] + 4.0).collect();
        (x, y)
    }

    #[test]
    fn test_empty_grid_uses_defaults() {
        let (x, y) = linear_data(30);
        let search = GridSearch::new(ModelKind::LinearRegression.create(), ParamGrid::new());
        let outcome = search.fit(&x, &y).unwrap();
        assert!(outcome.best_params.is_empty());
        assert_eq!(outcome.results.len(), 1);
        assert!(outcome.best_score > 0.99);
        assert!(outcome.model.is_fitted());
    }

    #[test]
    fn test_results_in_grid_order() {
        let (x, y) = linear_data(30);
        let grid = ParamGrid::new().with("max_depth", vec![1i64, 2, 8]);
        let search = GridSearch::new(ModelKind::DecisionTree.create(), grid);
        let outcome = search.fit(&x, &y).unwrap();
        let depths: Vec<ParamValue> = outcome
            .results
            .iter()
            .map(|r| r.params["max_depth"].clone())
            .collect();
        assert_eq!(depths, vec![ParamValue::Int(1), ParamValue::Int(2), ParamValue::Int(8)]);
        assert_eq!(outcome.results[0].cv.n_folds, 3);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let (x, y) = linear_data(40);
        let grid = ParamGrid::new().with("n_estimators", vec![8i64, 16]);
        let sequential = GridSearch::new(ModelKind::XGBoost.create(), grid.clone())
            .fit(&x, &y)
            .unwrap();
        let parallel = GridSearch::new(ModelKind::XGBoost.create(), grid)
            .with_parallel(true)
            .fit(&x, &y)
            .unwrap();
        assert_eq!(sequential.best_params, parallel.best_params);
        assert_eq!(sequential.best_score, parallel.best_score);
    }

    #[test]
    fn test_failing_candidates_score_nan() {
        // Poisson rejects the negative targets, the other criterion still fits
        let (x, _) = linear_data(30);
        let y: Array1<f64> = x.column(0).mapv(|v| v - 6.0);
        let grid = ParamGrid::new().with("criterion", vec!["poisson", "squared_error"]);
        let outcome = GridSearch::new(ModelKind::DecisionTree.create(), grid)
            .fit(&x, &y)
            .unwrap();
        assert!(outcome.results[0].cv.is_failed());
        assert_eq!(outcome.best_params["criterion"], ParamValue::from("squared_error"));
    }

    #[test]
    fn test_all_candidates_failing_is_an_error() {
        let (x, y) = linear_data(30);
        let grid = ParamGrid::new().with("subsample", vec![2.0, 3.0]);
        let err = GridSearch::new(ModelKind::GradientBoosting.create(), grid)
            .fit(&x, &y)
            .unwrap_err();
        assert!(matches!(err, TrainerError::InvalidParameter { .. }));
    }

    #[test]
    fn test_folds_capped_by_rows() {
        let x = Array2::from_shape_vec((2, 1), vec![1.0, 2.0]).unwrap();
        let y = Array1::from_vec(vec![1.0, 2.0]);
        let outcome = GridSearch::new(ModelKind::LinearRegression.create(), ParamGrid::new())
            .with_folds(5)
            .fit(&x, &y)
            .unwrap();
        assert_eq!(outcome.results[0].cv.n_folds, 2);
    }

    #[test]
    fn test_best_candidate_prefers_earliest_tie() {
        let mk = |score: f64| CandidateResult {
            params: Params::new(),
            cv: CVResults::from_scores(vec![score]),
        };
        let results = vec![mk(0.5), mk(0.9), mk(0.9), CandidateResult { params: Params::new(), cv: CVResults::failed() }];
        assert_eq!(best_candidate(&results), Some(1));
    }
}
