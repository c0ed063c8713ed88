//! XGBoost-style gradient boosting with second-order approximation
//!
//! - Regularized leaf weights: w* = -T(G) / (H + lambda), T soft-thresholds by alpha
//! - Split gain: 0.5 * [T(GL)²/(HL+λ) + T(GR)²/(HR+λ) - T(G)²/(H+λ)], kept when above gamma
//! - Minimum child weight constraint on the hessian sum

use crate::error::{Result, TrainerError};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::models::{check_fit_input, check_predict_input, Regressor};
use super::params::{ParamValue, Params};

/// XGBoost configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XGBoostConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_child_weight: f64,
    /// L2 regularization on leaf weights
    pub reg_lambda: f64,
    /// L1 regularization on leaf weights
    pub reg_alpha: f64,
    /// Minimum loss reduction to make a split
    pub gamma: f64,
    pub subsample: f64,
    pub colsample_bytree: f64,
    pub random_state: Option<u64>,
}

impl Default for XGBoostConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.3,
            max_depth: 6,
            min_child_weight: 1.0,
            reg_lambda: 1.0,
            reg_alpha: 0.0,
            gamma: 0.0,
            subsample: 1.0,
            colsample_bytree: 1.0,
            random_state: None,
        }
    }
}

impl XGBoostConfig {
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
        for (name, ratio) in [("subsample", self.subsample), ("colsample_bytree", self.colsample_bytree)] {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return Err(TrainerError::invalid_param(name, ratio, "must be in (0, 1]"));
            }
        }
        if self.reg_lambda < 0.0 || self.reg_alpha < 0.0 || self.gamma < 0.0 {
            return Err(TrainerError::invalid_param(
                "reg_lambda/reg_alpha/gamma",
                format!("{}/{}/{}", self.reg_lambda, self.reg_alpha, self.gamma),
                "must be non-negative",
            ));
        }
        Ok(())
    }
}

/// A single node in the boosted tree
#[derive(Debug, Clone, Serialize, Deserialize)]
enum XGBNode {
    Leaf { weight: f64 },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<XGBNode>,
        right: Box<XGBNode>,
    },
}

impl XGBNode {
    fn predict(&self, sample: &ArrayView1<f64>) -> f64 {
        match self {
            XGBNode::Leaf { weight } => *weight,
            XGBNode::Split { feature, threshold, left, right } => {
                if sample[*feature] <= *threshold {
                    left.predict(sample)
                } else {
                    right.predict(sample)
                }
            }
        }
    }
}

/// Soft-threshold of the gradient sum by the L1 penalty
fn threshold_l1(g: f64, alpha: f64) -> f64 {
    if g > alpha {
        g - alpha
    } else if g < -alpha {
        g + alpha
    } else {
        0.0
    }
}

fn leaf_weight(g_sum: f64, h_sum: f64, config: &XGBoostConfig) -> f64 {
    -threshold_l1(g_sum, config.reg_alpha) / (h_sum + config.reg_lambda)
}

fn structure_score(g: f64, h: f64, config: &XGBoostConfig) -> f64 {
    let t = threshold_l1(g, config.reg_alpha);
    let denom = h + config.reg_lambda;
    if denom > 0.0 {
        t * t / denom
    } else {
        0.0
    }
}

/// Build a tree using exact greedy split finding
fn build_xgb_tree(
    x: &Array2<f64>,
    grad: &Array1<f64>,
    hess: &Array1<f64>,
    indices: &[usize],
    feature_indices: &[usize],
    depth: usize,
    config: &XGBoostConfig,
) -> XGBNode {
    let n = indices.len();
    let g_sum: f64 = indices.iter().map(|&i| grad[i]).sum();
    let h_sum: f64 = indices.iter().map(|&i| hess[i]).sum();
    let weight = leaf_weight(g_sum, h_sum, config);

    if depth >= config.max_depth || n < 2 || h_sum < 2.0 * config.min_child_weight {
        return XGBNode::Leaf { weight };
    }

    let candidates: Vec<Option<(usize, f64, f64)>> = feature_indices
        .par_iter()
        .map(|&f| find_best_split_for_feature(x, grad, hess, indices, f, g_sum, h_sum, config))
        .collect();

    let mut best: Option<(usize, f64, f64)> = None;
    for candidate in candidates.into_iter().flatten() {
        if best.map_or(true, |b| candidate.2 > b.2) {
            best = Some(candidate);
        }
    }

    match best {
        Some((feature, threshold, gain)) if gain > config.gamma && gain > 0.0 => {
            let (left_idx, right_idx): (Vec<usize>, Vec<usize>) =
                indices.iter().partition(|&&i| x[[i, feature]] <= threshold);

            if left_idx.is_empty() || right_idx.is_empty() {
                return XGBNode::Leaf { weight };
            }

            let left = build_xgb_tree(x, grad, hess, &left_idx, feature_indices, depth + 1, config);
            let right = build_xgb_tree(x, grad, hess, &right_idx, feature_indices, depth + 1, config);

            XGBNode::Split {
                feature,
                threshold,
                left: Box::new(left),
                right: Box::new(right),
            }
        }
        _ => XGBNode::Leaf { weight },
    }
}

/// Best (feature, threshold, gain) for one feature
#[allow(clippy::too_many_arguments)]
fn find_best_split_for_feature(
    x: &Array2<f64>,
    grad: &Array1<f64>,
    hess: &Array1<f64>,
    indices: &[usize],
    feature: usize,
    g_total: f64,
    h_total: f64,
    config: &XGBoostConfig,
) -> Option<(usize, f64, f64)> {
    let mut sorted_indices: Vec<usize> = indices.to_vec();
    sorted_indices.sort_by(|&a, &b| {
        x[[a, feature]].partial_cmp(&x[[b, feature]]).unwrap_or(Ordering::Equal)
    });

    let parent_score = structure_score(g_total, h_total, config);
    let mut g_left = 0.0;
    let mut h_left = 0.0;
    let mut best: Option<(f64, f64)> = None;

    for pos in 0..sorted_indices.len() - 1 {
        let idx = sorted_indices[pos];
        g_left += grad[idx];
        h_left += hess[idx];

        let current = x[[idx, feature]];
        let next = x[[sorted_indices[pos + 1], feature]];
        if next - current < 1e-12 {
            continue;
        }

        let g_right = g_total - g_left;
        let h_right = h_total - h_left;
        if h_left < config.min_child_weight || h_right < config.min_child_weight {
            continue;
        }

        let gain = 0.5
            * (structure_score(g_left, h_left, config) + structure_score(g_right, h_right, config)
                - parent_score);

        if best.map_or(true, |(_, g)| gain > g) {
            best = Some(((current + next) / 2.0, gain));
        }
    }

    best.map(|(threshold, gain)| (feature, threshold, gain))
}

fn subsample(rng: &mut Xoshiro256PlusPlus, n: usize, ratio: f64) -> Vec<usize> {
    if ratio >= 1.0 {
        return (0..n).collect();
    }
    let k = ((n as f64) * ratio).ceil().max(1.0) as usize;
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    indices.truncate(k);
    indices.sort_unstable();
    indices
}

/// XGBoost regressor (squared error loss)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XGBoostRegressor {
    config: XGBoostConfig,
    trees: Vec<XGBNode>,
    base_score: f64,
    n_features: usize,
}

impl Default for XGBoostRegressor {
    fn default() -> Self {
        Self::new(XGBoostConfig::default())
    }
}

impl XGBoostRegressor {
    pub fn new(config: XGBoostConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            base_score: 0.0,
            n_features: 0,
        }
    }

    pub fn config(&self) -> &XGBoostConfig {
        &self.config
    }

    fn predict_row(&self, row: &ArrayView1<f64>) -> f64 {
        self.trees
            .iter()
            .fold(self.base_score, |acc, tree| acc + self.config.learning_rate * tree.predict(row))
    }

    /// Split-count feature importances
    pub fn feature_importances(&self) -> Option<Array1<f64>> {
        if self.trees.is_empty() {
            return None;
        }
        let mut counts = vec![0.0f64; self.n_features];
        for tree in &self.trees {
            count_splits(tree, &mut counts);
        }
        let total: f64 = counts.iter().sum();
        if total > 0.0 {
            for c in counts.iter_mut() {
                *c /= total;
            }
        }
        Some(Array1::from_vec(counts))
    }
}

fn count_splits(node: &XGBNode, counts: &mut [f64]) {
    if let XGBNode::Split { feature, left, right, .. } = node {
        counts[*feature] += 1.0;
        count_splits(left, counts);
        count_splits(right, counts);
    }
}

impl Regressor for XGBoostRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        self.config.validate()?;

        let n_samples = x.nrows();
        let n_features = x.ncols();

        self.base_score = y.mean().unwrap_or(0.0);
        let mut preds = Array1::from_elem(n_samples, self.base_score);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state.unwrap_or(42));
        let hess = Array1::from_elem(n_samples, 1.0);

        let mut trees = Vec::with_capacity(self.config.n_estimators);
        for _ in 0..self.config.n_estimators {
            // Squared error: grad = pred - y, hess = 1
            let grad: Array1<f64> = &preds - y;

            let row_indices = subsample(&mut rng, n_samples, self.config.subsample);
            let col_indices = subsample(&mut rng, n_features, self.config.colsample_bytree);

            let tree = build_xgb_tree(x, &grad, &hess, &row_indices, &col_indices, 0, &self.config);

            for (i, row) in x.rows().into_iter().enumerate() {
                preds[i] += self.config.learning_rate * tree.predict(&row);
            }
            trees.push(tree);
        }

        self.trees = trees;
        self.n_features = n_features;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(TrainerError::ModelNotFitted);
        }
        check_predict_input(x, self.n_features)?;
        Ok(x.rows().into_iter().map(|row| self.predict_row(&row)).collect())
    }

    fn get_params(&self) -> Params {
        let c = &self.config;
        let mut params = Params::new();
        params.insert("n_estimators".into(), ParamValue::Int(c.n_estimators as i64));
        params.insert("learning_rate".into(), ParamValue::Float(c.learning_rate));
        params.insert("max_depth".into(), ParamValue::Int(c.max_depth as i64));
        params.insert("min_child_weight".into(), ParamValue::Float(c.min_child_weight));
        params.insert("reg_lambda".into(), ParamValue::Float(c.reg_lambda));
        params.insert("reg_alpha".into(), ParamValue::Float(c.reg_alpha));
        params.insert("gamma".into(), ParamValue::Float(c.gamma));
        params.insert("subsample".into(), ParamValue::Float(c.subsample));
        params.insert("colsample_bytree".into(), ParamValue::Float(c.colsample_bytree));
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
                "min_child_weight" => c.min_child_weight = value.as_f64(name)?,
                "reg_lambda" => c.reg_lambda = value.as_f64(name)?,
                "reg_alpha" => c.reg_alpha = value.as_f64(name)?,
                "gamma" => c.gamma = value.as_f64(name)?,
                "subsample" => c.subsample = value.as_f64(name)?,
                "colsample_bytree" => c.colsample_bytree = value.as_f64(name)?,
                "random_state" => c.random_state = value.as_optional_seed(name)?,
                _ => {
                    return Err(TrainerError::invalid_param(
                        name,
                        value,
                        "unknown parameter for XGBoostRegressor",
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

    fn regression_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_vec((50, 2), (0..100).map(|i| i as f64 * 0.1).collect())
            .unwrap();
        let y: Array1<f64> = x
            .rows()
            .into_iter()
            .map(|r| r[0] * 2.0 + r[1] * 0.5 + 1.0)
            .collect();
        (x, y)
    }

    #[test]
    fn test_xgboost_regressor() {
        let (x, y) = regression_data();
        let mut model = XGBoostRegressor::new(XGBoostConfig {
            n_estimators: 50,
            max_depth: 4,
            ..Default::default()
        });
        model.fit(&x, &y).unwrap();
        let r2 = model.score(&x, &y).unwrap();
        assert!(r2 > 0.9, "XGBoost regressor R² = {}", r2);
    }

    #[test]
    fn test_xgboost_regularization() {
        let (x, y) = regression_data();
        let mut model = XGBoostRegressor::new(XGBoostConfig {
            n_estimators: 30,
            reg_lambda: 10.0,
            reg_alpha: 1.0,
            gamma: 1.0,
            ..Default::default()
        });
        model.fit(&x, &y).unwrap();
        let preds = model.predict(&x).unwrap();
        assert_eq!(preds.len(), 50);
        assert!(model.score(&x, &y).unwrap() > 0.5);
    }

    #[test]
    fn test_leaf_weight_soft_threshold() {
        let config = XGBoostConfig {
            reg_alpha: 2.0,
            reg_lambda: 1.0,
            ..Default::default()
        };
        assert_eq!(leaf_weight(1.5, 3.0, &config), 0.0);
        assert_eq!(leaf_weight(-6.0, 3.0, &config), 1.0);
    }

    #[test]
    fn test_feature_importances_count_splits() {
        let (x, y) = regression_data();
        let mut model = XGBoostRegressor::new(XGBoostConfig {
            n_estimators: 5,
            ..Default::default()
        });
        assert!(model.feature_importances().is_none());
        model.fit(&x, &y).unwrap();
        let imp = model.feature_importances().unwrap();
        assert!((imp.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_learning_rate() {
        let (x, y) = regression_data();
        let mut model = XGBoostRegressor::new(XGBoostConfig {
            learning_rate: 0.0,
            ..Default::default()
        });
        assert!(model.fit(&x, &y).is_err());
    }
}
