//! AdaBoost regressor (AdaBoost.R2)
//!
//! Each round fits a shallow regression tree on a bootstrap drawn according
//! to the current sample weights, then shifts weight toward rows the tree
//! got most wrong. Predictions are the weighted median over the ensemble.

use super::decision_tree::DecisionTreeRegressor;
use super::models::{check_fit_input, check_predict_input, Regressor};
use super::params::{ParamValue, Params};
use crate::error::{Result, TrainerError};
use ndarray::{Array1, Array2, Axis};
use rand::distributions::{Distribution, WeightedIndex};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

/// Per-sample loss used to re-weight rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdaBoostLoss {
    Linear,
    Square,
    Exponential,
}

impl AdaBoostLoss {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdaBoostLoss::Linear => "linear",
            AdaBoostLoss::Square => "square",
            AdaBoostLoss::Exponential => "exponential",
        }
    }

    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "linear" => Ok(AdaBoostLoss::Linear),
            "square" => Ok(AdaBoostLoss::Square),
            "exponential" => Ok(AdaBoostLoss::Exponential),
            other => Err(TrainerError::invalid_param(
                "loss",
                other,
                "expected linear, square or exponential",
            )),
        }
    }

    /// Apply to an error already scaled into [0, 1]
    fn apply(&self, e: f64) -> f64 {
        match self {
            AdaBoostLoss::Linear => e,
            AdaBoostLoss::Square => e * e,
            AdaBoostLoss::Exponential => 1.0 - (-e).exp(),
        }
    }
}

/// AdaBoost.R2 regressor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaBoostRegressor {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub loss: AdaBoostLoss,
    /// Depth of each base tree
    pub max_depth: usize,
    pub random_state: Option<u64>,
    estimators: Vec<DecisionTreeRegressor>,
    estimator_weights: Vec<f64>,
    n_features: usize,
}

impl Default for AdaBoostRegressor {
    fn default() -> Self {
        Self::new(50, 1.0)
    }
}

impl AdaBoostRegressor {
    pub fn new(n_estimators: usize, learning_rate: f64) -> Self {
        Self {
            n_estimators,
            learning_rate,
            loss: AdaBoostLoss::Linear,
            max_depth: 3,
            random_state: None,
            estimators: Vec::new(),
            estimator_weights: Vec::new(),
            n_features: 0,
        }
    }

    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_loss(mut self, loss: AdaBoostLoss) -> Self {
        self.loss = loss;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Number of estimators kept after early stopping
    pub fn n_fitted_estimators(&self) -> usize {
        self.estimators.len()
    }

    pub fn estimator_weights(&self) -> &[f64] {
        &self.estimator_weights
    }

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
        Ok(())
    }
}

/// Weighted median of `values`: the first value whose cumulative weight
/// reaches half of the total
fn weighted_median(values: &[f64], weights: &[f64]) -> f64 {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal));

    let total: f64 = weights.iter().sum();
    let mut cumulative = 0.0;
    for &i in &order {
        cumulative += weights[i];
        if cumulative >= 0.5 * total {
            return values[i];
        }
    }
    order.last().map_or(0.0, |&i| values[i])
}

impl Regressor for AdaBoostRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        self.validate()?;

        let n_samples = x.nrows();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.random_state.unwrap_or(42));
        let mut weights = vec![1.0 / n_samples as f64; n_samples];

        let mut estimators: Vec<DecisionTreeRegressor> = Vec::with_capacity(self.n_estimators);
        let mut estimator_weights = Vec::with_capacity(self.n_estimators);

        for round in 0..self.n_estimators {
            let sampler = WeightedIndex::new(&weights).map_err(|e| {
                TrainerError::TrainingError(format!("Invalid AdaBoost sample weights: {}", e))
            })?;
            let indices: Vec<usize> = (0..n_samples).map(|_| sampler.sample(&mut rng)).collect();

            let mut tree = DecisionTreeRegressor::new()
                .with_max_depth(self.max_depth)
                .with_random_state(rng.gen());
            tree.fit(&x.select(Axis(0), &indices), &y.select(Axis(0), &indices))?;

            let predictions = tree.predict(x)?;
            let mut errors: Vec<f64> = predictions
                .iter()
                .zip(y.iter())
                .map(|(p, t)| (p - t).abs())
                .collect();
            let max_error = errors.iter().copied().fold(0.0, f64::max);
            if max_error > 0.0 {
                for e in errors.iter_mut() {
                    *e = self.loss.apply(*e / max_error);
                }
            }

            let estimator_error: f64 = weights.iter().zip(&errors).map(|(w, e)| w * e).sum();

            if estimator_error <= 0.0 {
                // Perfect fit: keep it and stop
                estimators.push(tree);
                estimator_weights.push(1.0);
                break;
            }
            if estimator_error >= 0.5 {
                // Worse than chance; only kept when nothing else exists
                if estimators.is_empty() {
                    estimators.push(tree);
                    estimator_weights.push(1.0);
                }
                debug!(round, estimator_error, "AdaBoost stopped early");
                break;
            }

            let beta = estimator_error / (1.0 - estimator_error);
            estimator_weights.push(self.learning_rate * (1.0 / beta).ln());
            estimators.push(tree);

            if round + 1 < self.n_estimators {
                for (w, e) in weights.iter_mut().zip(&errors) {
                    *w *= beta.powf((1.0 - e) * self.learning_rate);
                }
                let total: f64 = weights.iter().sum();
                if !(total > 0.0) {
                    break;
                }
                for w in weights.iter_mut() {
                    *w /= total;
                }
            }
        }

        self.estimators = estimators;
        self.estimator_weights = estimator_weights;
        self.n_features = x.ncols();
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.estimators.is_empty() {
            return Err(TrainerError::ModelNotFitted);
        }
        check_predict_input(x, self.n_features)?;

        let all_predictions = self
            .estimators
            .iter()
            .map(|tree| tree.predict(x))
            .collect::<Result<Vec<_>>>()?;

        Ok((0..x.nrows())
            .map(|i| {
                let values: Vec<f64> = all_predictions.iter().map(|p| p[i]).collect();
                weighted_median(&values, &self.estimator_weights)
            })
            .collect())
    }

    fn get_params(&self) -> Params {
        let mut params = Params::new();
        params.insert("n_estimators".into(), ParamValue::Int(self.n_estimators as i64));
        params.insert("learning_rate".into(), ParamValue::Float(self.learning_rate));
        params.insert("loss".into(), ParamValue::from(self.loss.as_str()));
        params.insert("max_depth".into(), ParamValue::Int(self.max_depth as i64));
        params.insert(
            "random_state".into(),
            ParamValue::from_seed(self.random_state),
        );
        params
    }

    fn set_params(&mut self, params: &Params) -> Result<()> {
        for (name, value) in params {
            match name.as_str() {
                "n_estimators" => self.n_estimators = value.as_usize(name)?,
                "learning_rate" => self.learning_rate = value.as_f64(name)?,
                "loss" => self.loss = AdaBoostLoss::parse(value.as_str(name)?)?,
                "max_depth" => self.max_depth = value.as_usize(name)?,
                "random_state" => {
                    self.random_state = value.as_optional_seed(name)?
                }
                _ => {
                    return Err(TrainerError::invalid_param(
                        name,
                        value,
                        "unknown parameter for AdaBoostRegressor",
                    ))
                }
            }
        }
        Ok(())
    }

    fn is_fitted(&self) -> bool {
        !self.estimators.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_data(n: usize) -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((n, 2), |(i, j)| ((i * 5 + j * 11) % 17) as f64);
        let y = x.rows().into_iter().map(|r| 3.0 * r[0] + r[1]).collect();
        (x, y)
    }

    #[test]
    fn test_adaboost_regressor() {
        let (x, y) = linear_data(60);
        let mut model = AdaBoostRegressor::new(30, 1.0).with_random_state(1);
        model.fit(&x, &y).unwrap();
        assert!(model.is_fitted());
        let r2 = model.score(&x, &y).unwrap();
        assert!(r2 > 0.8, "AdaBoost R² = {}", r2);
    }

    #[test]
    fn test_losses() {
        let (x, y) = linear_data(40);
        for loss in [AdaBoostLoss::Linear, AdaBoostLoss::Square, AdaBoostLoss::Exponential] {
            let mut model = AdaBoostRegressor::new(10, 0.5).with_loss(loss);
            model.fit(&x, &y).unwrap();
            assert!(model.n_fitted_estimators() >= 1);
            assert_eq!(model.n_fitted_estimators(), model.estimator_weights().len());
        }
    }

    #[test]
    fn test_weighted_median() {
        assert_eq!(weighted_median(&[3.0, 1.0, 2.0], &[1.0, 1.0, 1.0]), 2.0);
        assert_eq!(weighted_median(&[1.0, 10.0], &[1.0, 5.0]), 10.0);
    }

    #[test]
    fn test_predict_before_fit() {
        let model = AdaBoostRegressor::default();
        assert!(matches!(
            model.predict(&Array2::zeros((1, 2))),
            Err(TrainerError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_loss_param() {
        let mut model = AdaBoostRegressor::default();
        let mut params = Params::new();
        params.insert("loss".into(), ParamValue::from("square"));
        model.set_params(&params).unwrap();
        assert_eq!(model.loss, AdaBoostLoss::Square);
        params.insert("loss".into(), ParamValue::from("huber"));
        assert!(model.set_params(&params).is_err());
    }
}
