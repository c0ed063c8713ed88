//! Gradient boosting regressor
//!
//! Least-squares boosting of shallow regression trees fit on residuals,
//! with optional stochastic row sub-sampling per round.

use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use super::decision_tree::{Criterion, DecisionTreeRegressor};
use super::models::{check_fit_input, check_predict_input, Regressor};
use super::params::{ParamValue, Params};
use crate::error::{Result, TrainerError};

/// Gradient boosting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingConfig {
    /// Number of boosting rounds (trees)
    pub n_estimators: usize,
    /// Learning rate (shrinkage)
    pub learning_rate: f64,
    /// Maximum tree depth
    pub max_depth: usize,
    /// Minimum samples per leaf
    pub min_samples_leaf: usize,
    /// Fraction of rows each tree is fit on
    pub subsample: f64,
    /// Random seed
    pub random_state: Option<u64>,
}

impl Default for GradientBoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_leaf: 1,
            subsample: 1.0,
            random_state: None,
        }
    }
}

impl GradientBoostingConfig {
    fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(TrainerError::invalid_param("n_estimators", 0, "must be positive"));
        }
        if !(self.learning_rate > 0.0) {
            return Err(TrainerError::invalid_param(
                "learning_rate",
                self.learning_rate,
                "must be positive",
            ));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(TrainerError::invalid_param(
                "subsample",
                self.subsample,
                "must be in (0, 1]",
            ));
        }
        Ok(())
    }
}

/// Gradient boosting regressor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingRegressor {
    config: GradientBoostingConfig,
    trees: Vec<DecisionTreeRegressor>,
    initial_prediction: f64,
    feature_importances: Vec<f64>,
    n_features: usize,
}

impl Default for GradientBoostingRegressor {
    fn default() -> Self {
        Self::new(GradientBoostingConfig::default())
    }
}

impl GradientBoostingRegressor {
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            initial_prediction: 0.0,
            feature_importances: Vec::new(),
            n_features: 0,
        }
    }

    pub fn config(&self) -> &GradientBoostingConfig {
        &self.config
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    fn subsample_indices(&self, n: usize, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..n).collect();
        if self.config.subsample >= 1.0 {
            return indices;
        }
        let sample_size = ((n as f64) * self.config.subsample).ceil().max(1.0) as usize;
        indices.shuffle(rng);
        indices.truncate(sample_size);
        indices.sort_unstable();
        indices
    }
}

impl Regressor for GradientBoostingRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        self.config.validate()?;

        let n_samples = x.nrows();
        let n_features = x.ncols();

        self.initial_prediction = y.mean().unwrap_or(0.0);
        let mut predictions = Array1::from_elem(n_samples, self.initial_prediction);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state.unwrap_or(42));

        let mut trees = Vec::with_capacity(self.config.n_estimators);
        let mut importances = vec![0.0; n_features];

        for _ in 0..self.config.n_estimators {
            let residuals = y - &predictions;

            let sample_indices = self.subsample_indices(n_samples, &mut rng);
            let x_sub = x.select(Axis(0), &sample_indices);
            let r_sub = residuals.select(Axis(0), &sample_indices);

            let mut tree = DecisionTreeRegressor::new()
                .with_criterion(Criterion::FriedmanMse)
                .with_max_depth(self.config.max_depth)
                .with_min_samples_leaf(self.config.min_samples_leaf);
            tree.fit(&x_sub, &r_sub)?;

            // Every row moves, including those left out of the sub-sample
            let tree_pred = tree.predict(x)?;
            predictions.scaled_add(self.config.learning_rate, &tree_pred);

            if let Some(tree_importance) = tree.feature_importances() {
                for (total, &imp) in importances.iter_mut().zip(tree_importance.iter()) {
                    *total += imp;
                }
            }
            trees.push(tree);
        }

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }

        self.trees = trees;
        self.feature_importances = importances;
        self.n_features = n_features;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(TrainerError::ModelNotFitted);
        }
        check_predict_input(x, self.n_features)?;

        let mut predictions = Array1::from_elem(x.nrows(), self.initial_prediction);
        for tree in &self.trees {
            predictions.scaled_add(self.config.learning_rate, &tree.predict(x)?);
        }
        Ok(predictions)
    }

    fn get_params(&self) -> Params {
        let c = &self.config;
        let mut params = Params::new();
        params.insert("n_estimators".into(), ParamValue::Int(c.n_estimators as i64));
        params.insert("learning_rate".into(), ParamValue::Float(c.learning_rate));
        params.insert("max_depth".into(), ParamValue::Int(c.max_depth as i64));
        params.insert("min_samples_leaf".into(), ParamValue::Int(c.min_samples_leaf as i64));
        params.insert("subsample".into(), ParamValue::Float(c.subsample));
        params.insert(
            "random_state".into(),
            ParamValue::from_seed(c.random_state),
        );
        params
    }

    fn set_params(&mut self, params: &Params) -> Result<()> {
        for (name, value) in params {
            let c = &mut self.config;
            match name.as_str() {
                "n_estimators" => c.n_estimators = value.as_usize(name)?,
                "learning_rate" => c.learning_rate = value.as_f64(name)?,
                "max_depth" => c.max_depth = value.as_usize(name)?,
                "min_samples_leaf" => c.min_samples_leaf = value.as_usize(name)?,
                "subsample" => c.subsample = value.as_f64(name)?,
                "random_state" => c.random_state = value.as_optional_seed(name)?,
                _ => {
                    return Err(TrainerError::invalid_param(
                        name,
                        value,
                        "unknown parameter for GradientBoostingRegressor",
                    ))
                }
            }
        }
        Ok(())
    }

    fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_data(n: usize) -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((n, 3), |(i, j)| ((i * 7 + j * 3) % 11) as f64 + j as f64);
        let y = x
            .rows()
            .into_iter()
            .map(|r| 2.0 * r[0] - r[1] + 0.5 * r[2])
            .collect();
        (x, y)
    }

    #[test]
    fn test_gradient_boosting_regressor() {
        let (x, y) = make_data(60);
        let config = GradientBoostingConfig {
            n_estimators: 50,
            learning_rate: 0.1,
            ..Default::default()
        };

        let mut model = GradientBoostingRegressor::new(config);
        model.fit(&x, &y).unwrap();

        let r2 = model.score(&x, &y).unwrap();
        assert!(r2 > 0.9, "R² too low: {}", r2);
        assert_eq!(model.feature_importances().len(), 3);
    }

    #[test]
    fn test_subsample_updates_every_row() {
        let (x, y) = make_data(40);
        let config = GradientBoostingConfig {
            n_estimators: 30,
            learning_rate: 0.1,
            subsample: 0.6,
            random_state: Some(3),
            ..Default::default()
        };
        let mut model = GradientBoostingRegressor::new(config);
        model.fit(&x, &y).unwrap();
        let r2 = model.score(&x, &y).unwrap();
        assert!(r2 > 0.8, "R² too low: {}", r2);
    }

    #[test]
    fn test_invalid_subsample() {
        let (x, y) = make_data(10);
        let mut model = GradientBoostingRegressor::default();
        let mut params = Params::new();
        params.insert("subsample".into(), ParamValue::Float(1.5));
        model.set_params(&params).unwrap();
        assert!(matches!(
            model.fit(&x, &y),
            Err(TrainerError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_params_round_trip() {
        let mut model = GradientBoostingRegressor::default();
        let mut params = Params::new();
        params.insert("learning_rate".into(), ParamValue::Float(0.05));
        params.insert("n_estimators".into(), ParamValue::Int(8));
        model.set_params(&params).unwrap();
        let got = model.get_params();
        assert_eq!(got["learning_rate"], ParamValue::Float(0.05));
        assert_eq!(got["n_estimators"], ParamValue::Int(8));
        assert_eq!(got["max_depth"], ParamValue::Int(3));
    }
}
