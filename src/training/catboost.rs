//! CatBoost-style gradient boosting on symmetric (oblivious) trees
//!
//! Every level of a tree shares one (feature, border) split, so a tree of
//! depth `d` is a lookup table of `2^d` leaves. Split candidates are limited
//! to at most 254 borders per feature, computed once per fit.

use crate::error::{Result, TrainerError};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::models::{check_fit_input, check_predict_input, Regressor};
use super::params::{ParamValue, Params};

const MAX_BORDERS: usize = 254;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatBoostConfig {
    /// Boosting rounds
    pub iterations: usize,
    pub learning_rate: f64,
    /// Depth of each symmetric tree
    pub depth: usize,
    /// L2 regularization on leaf values
    pub l2_leaf_reg: f64,
    pub subsample: f64,
    pub random_state: Option<u64>,
}

impl Default for CatBoostConfig {
    fn default() -> Self {
        Self {
            iterations: 500,
            learning_rate: 0.03,
            depth: 6,
            l2_leaf_reg: 3.0,
            subsample: 1.0,
            random_state: None,
        }
    }
}

impl CatBoostConfig {
    fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(TrainerError::invalid_param("iterations", 0, "must be positive"));
        }
        if !(self.learning_rate > 0.0) {
            return Err(TrainerError::invalid_param(
                "learning_rate",
                self.learning_rate,
                "must be positive",
            ));
        }
        if self.depth == 0 || self.depth > 16 {
            return Err(TrainerError::invalid_param("depth", self.depth, "must be in 1..=16"));
        }
        if self.l2_leaf_reg < 0.0 {
            return Err(TrainerError::invalid_param(
                "l2_leaf_reg",
                self.l2_leaf_reg,
                "must be non-negative",
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

/// Symmetric tree: each level uses the same split feature + threshold
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SymmetricTree {
    splits: Vec<(usize, f64)>,
    leaf_values: Vec<f64>,
}

impl SymmetricTree {
    fn predict(&self, sample: &ArrayView1<f64>) -> f64 {
        let mut idx = 0usize;
        for &(feature, threshold) in &self.splits {
            idx = idx * 2 + usize::from(sample[feature] > threshold);
        }
        self.leaf_values[idx]
    }
}

/// Candidate borders per feature and each row's bin code against them.
///
/// A row with code `c` falls left of border `b` exactly when `c <= b`.
struct Quantized {
    borders: Vec<Vec<f64>>,
    codes: Vec<Vec<usize>>,
}

impl Quantized {
    fn new(x: &Array2<f64>) -> Self {
        let (borders, codes): (Vec<Vec<f64>>, Vec<Vec<usize>>) = x
            .columns()
            .into_iter()
            .map(|column| {
                let borders = feature_borders(&column);
                let codes: Vec<usize> = column
                    .iter()
                    .map(|&v| borders.partition_point(|&b| b < v))
                    .collect();
                (borders, codes)
            })
            .unzip();
        Self { borders, codes }
    }
}

fn feature_borders(column: &ArrayView1<f64>) -> Vec<f64> {
    let mut values: Vec<f64> = column.to_vec();
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    values.dedup();

    let midpoints: Vec<f64> = values.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect();
    if midpoints.len() <= MAX_BORDERS {
        return midpoints;
    }
    let mut borders: Vec<f64> = (0..MAX_BORDERS)
        .map(|i| midpoints[i * midpoints.len() / MAX_BORDERS])
        .collect();
    borders.dedup();
    borders
}

fn newton_score(g: f64, h: f64, reg: f64) -> f64 {
    let denom = h + reg;
    if denom > 0.0 {
        g * g / denom
    } else {
        0.0
    }
}

/// Total gain of every border of one feature, summed over all current buckets
fn border_gains(
    codes: &[usize],
    n_borders: usize,
    buckets: &[Vec<usize>],
    gradients: &Array1<f64>,
    reg: f64,
) -> Vec<f64> {
    // Gain is piecewise constant in the border index within a bucket, so it
    // is accumulated as a difference array
    let mut delta = vec![0.0; n_borders + 1];
    for bucket in buckets {
        if bucket.len() < 2 {
            continue;
        }
        let mut rows: Vec<(usize, f64)> = bucket.iter().map(|&i| (codes[i], gradients[i])).collect();
        rows.sort_by_key(|&(code, _)| code);

        let g_total: f64 = rows.iter().map(|&(_, g)| g).sum();
        let h_total = rows.len() as f64;
        let parent = newton_score(g_total, h_total, reg);

        let mut g_left = 0.0;
        let mut h_left = 0.0;
        let mut pos = 0;
        while pos < rows.len() {
            let code = rows[pos].0;
            while pos < rows.len() && rows[pos].0 == code {
                g_left += rows[pos].1;
                h_left += 1.0;
                pos += 1;
            }
            if pos == rows.len() || code >= n_borders {
                break;
            }
            let gain = newton_score(g_left, h_left, reg)
                + newton_score(g_total - g_left, h_total - h_left, reg)
                - parent;
            let next_code = rows[pos].0.min(n_borders);
            delta[code] += gain;
            delta[next_code] -= gain;
        }
    }

    let mut running = 0.0;
    delta[..n_borders]
        .iter()
        .map(|d| {
            running += d;
            running
        })
        .collect()
}

fn build_symmetric_tree(
    x: &Array2<f64>,
    quantized: &Quantized,
    gradients: &Array1<f64>,
    indices: &[usize],
    config: &CatBoostConfig,
) -> SymmetricTree {
    let n_features = x.ncols();
    let reg = config.l2_leaf_reg;
    let mut splits = Vec::with_capacity(config.depth);
    let mut buckets: Vec<Vec<usize>> = vec![indices.to_vec()];

    for _ in 0..config.depth {
        let per_feature: Vec<Option<(usize, usize, f64)>> = (0..n_features)
            .into_par_iter()
            .map(|feat| {
                let borders = &quantized.borders[feat];
                let gains = border_gains(&quantized.codes[feat], borders.len(), &buckets, gradients, reg);
                let mut best: Option<(usize, usize, f64)> = None;
                for (b, &gain) in gains.iter().enumerate() {
                    if gain > 1e-12 && best.map_or(true, |(_, _, g)| gain > g) {
                        best = Some((feat, b, gain));
                    }
                }
                best
            })
            .collect();

        let mut best: Option<(usize, usize, f64)> = None;
        for candidate in per_feature.into_iter().flatten() {
            if best.map_or(true, |b| candidate.2 > b.2) {
                best = Some(candidate);
            }
        }

        let (feat, border_idx, _) = match best {
            Some(b) => b,
            None => break,
        };
        let threshold = quantized.borders[feat][border_idx];
        splits.push((feat, threshold));

        let codes = &quantized.codes[feat];
        let mut new_buckets = Vec::with_capacity(buckets.len() * 2);
        for bucket in &buckets {
            let (left, right): (Vec<usize>, Vec<usize>) =
                bucket.iter().partition(|&&i| codes[i] <= border_idx);
            new_buckets.push(left);
            new_buckets.push(right);
        }
        buckets = new_buckets;
    }

    let leaf_values = buckets
        .iter()
        .map(|bucket| {
            let g: f64 = bucket.iter().map(|&i| gradients[i]).sum();
            if bucket.is_empty() {
                0.0
            } else {
                -g / (bucket.len() as f64 + reg)
            }
        })
        .collect();

    SymmetricTree { splits, leaf_values }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatBoostRegressor {
    pub config: CatBoostConfig,
    trees: Vec<SymmetricTree>,
    base_prediction: f64,
    n_features: usize,
}

impl Default for CatBoostRegressor {
    fn default() -> Self {
        Self::new(CatBoostConfig::default())
    }
}

impl CatBoostRegressor {
    pub fn new(config: CatBoostConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            base_prediction: 0.0,
            n_features: 0,
        }
    }

    fn predict_row(&self, row: &ArrayView1<f64>) -> f64 {
        self.base_prediction
            + self
                .trees
                .iter()
                .map(|t| self.config.learning_rate * t.predict(row))
                .sum::<f64>()
    }
}

impl Regressor for CatBoostRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        self.config.validate()?;

        let n = x.nrows();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state.unwrap_or(42));
        let quantized = Quantized::new(x);

        self.base_prediction = y.mean().unwrap_or(0.0);
        let mut predictions = Array1::from_elem(n, self.base_prediction);
        let mut trees = Vec::with_capacity(self.config.iterations);

        for _ in 0..self.config.iterations {
            let gradients: Array1<f64> = &predictions - y;

            let indices: Vec<usize> = if self.config.subsample < 1.0 {
                let k = (n as f64 * self.config.subsample).ceil().max(1.0) as usize;
                let mut sub: Vec<usize> = (0..n).collect();
                sub.shuffle(&mut rng);
                sub.truncate(k);
                sub.sort_unstable();
                sub
            } else {
                (0..n).collect()
            };

            let tree = build_symmetric_tree(x, &quantized, &gradients, &indices, &self.config);
            for (i, row) in x.rows().into_iter().enumerate() {
                predictions[i] += self.config.learning_rate * tree.predict(&row);
            }
            trees.push(tree);
        }

        self.trees = trees;
        self.n_features = x.ncols();
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
        params.insert("iterations".into(), ParamValue::Int(c.iterations as i64));
        params.insert("learning_rate".into(), ParamValue::Float(c.learning_rate));
        params.insert("depth".into(), ParamValue::Int(c.depth as i64));
        params.insert("l2_leaf_reg".into(), ParamValue::Float(c.l2_leaf_reg));
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
                "iterations" => c.iterations = value.as_usize(name)?,
                "learning_rate" => c.learning_rate = value.as_f64(name)?,
                "depth" => c.depth = value.as_usize(name)?,
                "l2_leaf_reg" => c.l2_leaf_reg = value.as_f64(name)?,
                "subsample" => c.subsample = value.as_f64(name)?,
                "random_state" => c.random_state = value.as_optional_seed(name)?,
                _ => {
                    return Err(TrainerError::invalid_param(
                        name,
                        value,
                        "unknown parameter for CatBoostRegressor",
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
