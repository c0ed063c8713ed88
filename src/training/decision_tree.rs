//! Decision tree regressor

use super::models::{check_fit_input, check_predict_input, Regressor};
use super::params::{ParamValue, Params};
use crate::error::{Result, TrainerError};
use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::index::sample;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fmt;

const MIN_GAIN: f64 = 1e-12;

/// Decision tree node. Children are indices into the tree's node list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with prediction value
    Leaf { value: f64, n_samples: usize },
    /// Internal node with split
    Split {
        feature_idx: usize,
        threshold: f64,
        left: usize,
        right: usize,
        n_samples: usize,
        gain: f64,
    },
}

fn predict_row(nodes: &[TreeNode], row: &ArrayView1<f64>) -> f64 {
    let mut idx = 0;
    loop {
        match &nodes[idx] {
            TreeNode::Leaf { value, .. } => return *value,
            TreeNode::Split { feature_idx, threshold, left, right, .. } => {
                idx = if row[*feature_idx] <= *threshold { *left } else { *right };
            }
        }
    }
}

/// Node still to be grown: its slot in the node list and the rows it holds
struct PendingNode {
    slot: usize,
    indices: Vec<usize>,
    depth: usize,
}

/// Split quality criterion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Criterion {
    /// Variance reduction
    SquaredError,
    /// Variance reduction with Friedman's improvement score
    FriedmanMse,
    /// Reduction of absolute deviation from the median
    AbsoluteError,
    /// Reduction of half Poisson deviance
    Poisson,
}

impl Criterion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Criterion::SquaredError => "squared_error",
            Criterion::FriedmanMse => "friedman_mse",
            Criterion::AbsoluteError => "absolute_error",
            Criterion::Poisson => "poisson",
        }
    }

    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "squared_error" => Ok(Criterion::SquaredError),
            "friedman_mse" => Ok(Criterion::FriedmanMse),
            "absolute_error" => Ok(Criterion::AbsoluteError),
            "poisson" => Ok(Criterion::Poisson),
            other => Err(TrainerError::invalid_param(
                "criterion",
                other,
                "expected squared_error, friedman_mse, absolute_error or poisson",
            )),
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decision tree regressor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTreeRegressor {
    /// Nodes in growth order, root first
    nodes: Vec<TreeNode>,
    /// Maximum depth
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features considered per split (all when unset)
    pub max_features: Option<usize>,
    /// Split criterion
    pub criterion: Criterion,
    /// Seed for feature sub-sampling
    pub random_state: Option<u64>,
    n_features: usize,
    feature_importances: Option<Array1<f64>>,
}

impl Default for DecisionTreeRegressor {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTreeRegressor {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            criterion: Criterion::SquaredError,
            random_state: None,
            n_features: 0,
            feature_importances: None,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    /// Set features considered per split
    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
        self
    }

    /// Set criterion
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    /// Get tree depth
    pub fn get_depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }
        let mut max_depth = 0;
        let mut stack = vec![(0, 1)];
        while let Some((idx, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            if let TreeNode::Split { left, right, .. } = self.nodes[idx] {
                stack.push((left, depth + 1));
                stack.push((right, depth + 1));
            }
        }
        max_depth
    }

    /// Get number of leaves
    pub fn get_n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node, TreeNode::Leaf { .. }))
            .count()
    }

    fn validate(&self, y: &Array1<f64>) -> Result<()> {
        if self.min_samples_split < 2 {
            return Err(TrainerError::invalid_param(
                "min_samples_split",
                self.min_samples_split,
                "must be at least 2",
            ));
        }
        if self.min_samples_leaf < 1 {
            return Err(TrainerError::invalid_param(
                "min_samples_leaf",
                self.min_samples_leaf,
                "must be at least 1",
            ));
        }
        if self.max_features == Some(0) {
            return Err(TrainerError::invalid_param("max_features", 0, "must be positive"));
        }
        if self.criterion == Criterion::Poisson {
            if y.iter().any(|&v| v < 0.0) {
                return Err(TrainerError::invalid_param(
                    "criterion",
                    "poisson",
                    "targets must be non-negative",
                ));
            }
            if y.sum() <= 0.0 {
                return Err(TrainerError::invalid_param(
                    "criterion",
                    "poisson",
                    "sum of targets must be positive",
                ));
            }
        }
        Ok(())
    }

    /// Grow the tree depth-first with an explicit work stack, left subtree first
    fn build_tree(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        rng: &mut ChaCha8Rng,
        importances: &mut [f64],
    ) -> Vec<TreeNode> {
        let mut nodes = vec![TreeNode::Leaf { value: 0.0, n_samples: 0 }];
        let mut stack = vec![PendingNode {
            slot: 0,
            indices: (0..x.nrows()).collect(),
            depth: 0,
        }];

        while let Some(PendingNode { slot, indices, depth }) = stack.pop() {
            let n_samples = indices.len();
            let y_subset: Vec<f64> = indices.iter().map(|&i| y[i]).collect();

            let should_stop = n_samples < self.min_samples_split
                || n_samples < 2 * self.min_samples_leaf
                || self.max_depth.map_or(false, |d| depth >= d)
                || is_constant(&y_subset);

            let best = if should_stop {
                None
            } else {
                let features = self.candidate_features(rng);
                self.find_best_split(x, y, &indices, &features)
            };
            let (feature_idx, threshold, gain) = match best {
                Some(best) => best,
                None => {
                    nodes[slot] = self.leaf(&y_subset);
                    continue;
                }
            };

            let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
                .into_iter()
                .partition(|&i| x[[i, feature_idx]] <= threshold);

            importances[feature_idx] += gain;

            let left = nodes.len();
            let right = left + 1;
            nodes.push(TreeNode::Leaf { value: 0.0, n_samples: 0 });
            nodes.push(TreeNode::Leaf { value: 0.0, n_samples: 0 });
            nodes[slot] = TreeNode::Split {
                feature_idx,
                threshold,
                left,
                right,
                n_samples,
                gain,
            };

            stack.push(PendingNode {
                slot: right,
                indices: right_indices,
                depth: depth + 1,
            });
            stack.push(PendingNode {
                slot: left,
                indices: left_indices,
                depth: depth + 1,
            });
        }

        nodes
    }

    fn leaf(&self, y: &[f64]) -> TreeNode {
        let value = match self.criterion {
            Criterion::AbsoluteError => median(y),
            _ => mean(y),
        };
        TreeNode::Leaf { value, n_samples: y.len() }
    }

    fn candidate_features(&self, rng: &mut ChaCha8Rng) -> Vec<usize> {
        match self.max_features {
            Some(k) if k < self.n_features => {
                let mut chosen = sample(rng, self.n_features, k).into_vec();
                chosen.sort_unstable();
                chosen
            }
            _ => (0..self.n_features).collect(),
        }
    }

    /// Best (feature, threshold, gain) over the candidate features
    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        features: &[usize],
    ) -> Option<(usize, f64, f64)> {
        let per_feature: Vec<Option<(usize, f64, f64)>> = features
            .par_iter()
            .map(|&feature_idx| self.best_split_for_feature(x, y, indices, feature_idx))
            .collect();

        // Earliest feature wins ties so results do not depend on scheduling
        let mut best: Option<(usize, f64, f64)> = None;
        for candidate in per_feature.into_iter().flatten() {
            if best.map_or(true, |b| candidate.2 > b.2) {
                best = Some(candidate);
            }
        }
        best
    }

    fn best_split_for_feature(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        feature_idx: usize,
    ) -> Option<(usize, f64, f64)> {
        let mut sorted: Vec<usize> = indices.to_vec();
        sorted.sort_by(|&a, &b| {
            x[[a, feature_idx]]
                .partial_cmp(&x[[b, feature_idx]])
                .unwrap_or(Ordering::Equal)
        });
        let ys: Vec<f64> = sorted.iter().map(|&i| y[i]).collect();

        let n = ys.len();
        let total_sum: f64 = ys.iter().sum();
        let (prefix_abs, suffix_abs) = if self.criterion == Criterion::AbsoluteError {
            prefix_suffix_abs_deviation(&ys)
        } else {
            (Vec::new(), Vec::new())
        };

        let mut left_sum = 0.0;
        let mut best_gain = MIN_GAIN;
        let mut best_threshold = None;

        for pos in 0..n - 1 {
            left_sum += ys[pos];
            let n_left = pos + 1;
            let n_right = n - n_left;

            let current = x[[sorted[pos], feature_idx]];
            let next = x[[sorted[pos + 1], feature_idx]];
            if next - current <= 1e-12 {
                continue;
            }
            if n_left < self.min_samples_leaf || n_right < self.min_samples_leaf {
                continue;
            }

            let right_sum = total_sum - left_sum;
            let gain = match self.criterion {
                Criterion::SquaredError | Criterion::FriedmanMse => {
                    let mean_left = left_sum / n_left as f64;
                    let mean_right = right_sum / n_right as f64;
                    (n_left * n_right) as f64 / n as f64 * (mean_left - mean_right).powi(2)
                }
                Criterion::AbsoluteError => {
                    prefix_abs[n] - prefix_abs[n_left] - suffix_abs[n_left]
                }
                Criterion::Poisson => {
                    if left_sum <= 0.0 || right_sum <= 0.0 {
                        continue;
                    }
                    xlogx_mean(left_sum, n_left) + xlogx_mean(right_sum, n_right)
                        - xlogx_mean(total_sum, n)
                }
            };

            if gain > best_gain {
                best_gain = gain;
                best_threshold = Some((current + next) / 2.0);
            }
        }

        best_threshold.map(|threshold| (feature_idx, threshold, best_gain))
    }
}

impl Regressor for DecisionTreeRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        self.validate(y)?;

        let n_features = x.ncols();
        self.n_features = n_features;

        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state.unwrap_or(42));
        let mut importances = vec![0.0; n_features];
        let nodes = self.build_tree(x, y, &mut rng, &mut importances);

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }

        self.nodes = nodes;
        self.feature_importances = Some(Array1::from_vec(importances));
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.nodes.is_empty() {
            return Err(TrainerError::ModelNotFitted);
        }
        check_predict_input(x, self.n_features)?;
        Ok(x.rows().into_iter().map(|row| predict_row(&self.nodes, &row)).collect())
    }

    fn get_params(&self) -> Params {
        let mut params = Params::new();
        params.insert("criterion".into(), ParamValue::from(self.criterion.as_str()));
        params.insert("max_depth".into(), ParamValue::from_optional(self.max_depth));
        params.insert("min_samples_split".into(), ParamValue::Int(self.min_samples_split as i64));
        params.insert("min_samples_leaf".into(), ParamValue::Int(self.min_samples_leaf as i64));
        params.insert("max_features".into(), ParamValue::from_optional(self.max_features));
        params.insert(
            "random_state".into(),
            ParamValue::from_seed(self.random_state),
        );
        params
    }

    fn set_params(&mut self, params: &Params) -> Result<()> {
        for (name, value) in params {
            match name.as_str() {
                "criterion" => self.criterion = Criterion::parse(value.as_str(name)?)?,
                "max_depth" => self.max_depth = value.as_optional_usize(name)?,
                "min_samples_split" => self.min_samples_split = value.as_usize(name)?,
                "min_samples_leaf" => self.min_samples_leaf = value.as_usize(name)?,
                "max_features" => self.max_features = value.as_optional_usize(name)?,
                "random_state" => {
                    self.random_state = value.as_optional_seed(name)?
                }
                _ => {
                    return Err(TrainerError::invalid_param(
                        name,
                        value,
                        "unknown parameter for DecisionTreeRegressor",
                    ))
                }
            }
        }
        Ok(())
    }

    fn is_fitted(&self) -> bool {
        !self.nodes.is_empty()
    }
}

fn is_constant(y: &[f64]) -> bool {
    match y.first() {
        None => true,
        Some(&first) => y.iter().all(|&v| (v - first).abs() < 1e-10),
    }
}

fn mean(y: &[f64]) -> f64 {
    if y.is_empty() {
        return 0.0;
    }
    y.iter().sum::<f64>() / y.len() as f64
}

pub(crate) fn median(y: &[f64]) -> f64 {
    if y.is_empty() {
        return 0.0;
    }
    let mut sorted = y.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Ordered float for the running-median heaps
#[derive(Debug, Clone, Copy)]
struct OrderedFloat(f64);

impl PartialEq for OrderedFloat {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for OrderedFloat {}

impl PartialOrd for OrderedFloat {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedFloat {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.partial_cmp(&other.0).unwrap_or(Ordering::Equal)
    }
}

/// Median of a growing sequence, kept as a max-heap of the lower half and a
/// min-heap of the upper half together with the sum of each half
#[derive(Debug, Default)]
struct RunningMedian {
    low: BinaryHeap<OrderedFloat>,
    high: BinaryHeap<Reverse<OrderedFloat>>,
    low_sum: f64,
    high_sum: f64,
}

impl RunningMedian {
    fn push(&mut self, value: f64) {
        match self.low.peek() {
            Some(top) if value > top.0 => {
                self.high.push(Reverse(OrderedFloat(value)));
                self.high_sum += value;
            }
            _ => {
                self.low.push(OrderedFloat(value));
                self.low_sum += value;
            }
        }

        // Lower half holds the extra element when the count is odd
        if self.low.len() > self.high.len() + 1 {
            if let Some(OrderedFloat(v)) = self.low.pop() {
                self.low_sum -= v;
                self.high_sum += v;
                self.high.push(Reverse(OrderedFloat(v)));
            }
        } else if self.high.len() > self.low.len() {
            if let Some(Reverse(OrderedFloat(v))) = self.high.pop() {
                self.high_sum -= v;
                self.low_sum += v;
                self.low.push(OrderedFloat(v));
            }
        }
    }

    /// Sum of absolute deviations from the median of everything pushed so far
    fn abs_deviation(&self) -> f64 {
        match self.low.peek() {
            Some(&OrderedFloat(m)) => {
                let extra = self.low.len() as f64 - self.high.len() as f64;
                (self.high_sum - self.low_sum + m * extra).max(0.0)
            }
            None => 0.0,
        }
    }
}

/// Absolute deviation from the median of every prefix and every suffix:
/// `prefix[k]` covers `ys[..k]`, `suffix[k]` covers `ys[k..]`
fn prefix_suffix_abs_deviation(ys: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let n = ys.len();

    let mut prefix = vec![0.0; n + 1];
    let mut running = RunningMedian::default();
    for (k, &v) in ys.iter().enumerate() {
        running.push(v);
        prefix[k + 1] = running.abs_deviation();
    }

    let mut suffix = vec![0.0; n + 1];
    let mut running = RunningMedian::default();
    for k in (0..n).rev() {
        running.push(ys[k]);
        suffix[k] = running.abs_deviation();
    }

    (prefix, suffix)
}

/// `S * ln(S / n)`, the node-dependent part of the Poisson deviance
fn xlogx_mean(sum: f64, n: usize) -> f64 {
    sum * (sum / n as f64).ln()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::Rng;
    use std::time::{Duration, Instant};

    fn random_data(n: usize, n_features: usize, seed: u64) -> (Array2<f64>, Array1<f64>) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let x = Array2::from_shape_fn((n, n_features), |_| rng.gen_range(0.0..10.0));
        let y = x.rows().into_iter().map(|r| r.sum() + rng.gen_range(-1.0..1.0)).collect();
        (x, y)
    }

    fn fastest_fit(criterion: Criterion, x: &Array2<f64>, y: &Array1<f64>) -> Duration {
        (0..2)
            .map(|_| {
                let mut tree = DecisionTreeRegressor::new().with_criterion(criterion);
                let start = Instant::now();
                tree.fit(x, y).unwrap();
                start.elapsed()
            })
            .min()
            .unwrap()
    }

    fn step_data() -> (Array2<f64>, Array1<f64>) {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0]];
        let y = array![1.0, 1.0, 1.0, 5.0, 5.0, 5.0];
        (x, y)
    }

    #[test]
    fn test_regressor_simple() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0]];
        let y = array![1.0, 2.0, 3.0, 4.0, 5.0];

        let mut tree = DecisionTreeRegressor::new();
        tree.fit(&x, &y).unwrap();

        let predictions = tree.predict(&x).unwrap();
        let mse: f64 = predictions
            .iter()
            .zip(y.iter())
            .map(|(p, a)| (p - a).powi(2))
            .sum::<f64>()
            / y.len() as f64;
        assert!(mse < 1e-12, "MSE too high: {}", mse);
    }

    #[test]
    fn test_all_criteria_find_the_step() {
        let (x, y) = step_data();
        for criterion in [
            Criterion::SquaredError,
            Criterion::FriedmanMse,
            Criterion::AbsoluteError,
            Criterion::Poisson,
        ] {
            let mut tree = DecisionTreeRegressor::new().with_criterion(criterion);
            tree.fit(&x, &y).unwrap();
            assert_eq!(tree.get_n_leaves(), 2, "criterion {}", criterion);
            let preds = tree.predict(&array![[2.0], [5.5]]).unwrap();
            assert_eq!(preds[0], 1.0);
            assert_eq!(preds[1], 5.0);
        }
    }

    #[test]
    fn test_absolute_error_leaf_is_median() {
        let x = array![[1.0], [1.0], [1.0]];
        let y = array![1.0, 2.0, 10.0];
        let mut tree = DecisionTreeRegressor::new().with_criterion(Criterion::AbsoluteError);
        tree.fit(&x, &y).unwrap();
        assert_eq!(tree.predict(&array![[1.0]]).unwrap()[0], 2.0);
    }

    #[test]
    fn test_poisson_rejects_negative_targets() {
        let x = array![[1.0], [2.0]];
        let y = array![-1.0, 2.0];
        let mut tree = DecisionTreeRegressor::new().with_criterion(Criterion::Poisson);
        assert!(matches!(
            tree.fit(&x, &y),
            Err(TrainerError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_max_depth() {
        let x = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [4.0, 4.0]];
        let y = array![0.0, 1.0, 2.0, 3.0];

        let mut tree = DecisionTreeRegressor::new().with_max_depth(1);
        tree.fit(&x, &y).unwrap();
        assert!(tree.get_depth() <= 2);
        assert_eq!(tree.get_n_leaves(), 2);
    }

    #[test]
    fn test_feature_importances() {
        let x = array![[1.0, 0.0], [2.0, 0.0], [3.0, 0.0], [4.0, 0.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut tree = DecisionTreeRegressor::new();
        tree.fit(&x, &y).unwrap();

        let importances = tree.feature_importances().unwrap();
        assert_eq!(importances[0], 1.0);
        assert_eq!(importances[1], 0.0);
    }

    #[test]
    fn test_predict_rejects_wrong_width() {
        let (x, y) = step_data();
        let mut tree = DecisionTreeRegressor::new();
        tree.fit(&x, &y).unwrap();
        assert!(matches!(
            tree.predict(&array![[1.0, 2.0]]),
            Err(TrainerError::ShapeError { .. })
        ));
    }

    #[test]
    fn test_set_params_criterion() {
        let mut tree = DecisionTreeRegressor::new();
        let mut params = Params::new();
        params.insert("criterion".into(), ParamValue::from("friedman_mse"));
        params.insert("max_depth".into(), ParamValue::Int(3));
        tree.set_params(&params).unwrap();
        assert_eq!(tree.criterion, Criterion::FriedmanMse);
        assert_eq!(tree.max_depth, Some(3));

        params.insert("criterion".into(), ParamValue::from("gini"));
        assert!(tree.set_params(&params).is_err());
    }

    #[test]
    fn test_running_abs_deviation_matches_direct() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let ys: Vec<f64> = (0..101).map(|_| rng.gen_range(-50.0..50.0)).collect();
        let (prefix, suffix) = prefix_suffix_abs_deviation(&ys);

        let direct = |part: &[f64]| -> f64 {
            let m = median(part);
            part.iter().map(|&v| (v - m).abs()).sum()
        };
        for k in 0..=ys.len() {
            assert!((prefix[k] - direct(&ys[..k])).abs() < 1e-8, "prefix {}", k);
            assert!((suffix[k] - direct(&ys[k..])).abs() < 1e-8, "suffix {}", k);
        }
    }

    #[test]
    fn test_absolute_error_fit_time_tracks_squared_error() {
        let (x, y) = random_data(4000, 4, 11);
        let squared = fastest_fit(Criterion::SquaredError, &x, &y);
        let absolute = fastest_fit(Criterion::AbsoluteError, &x, &y);
        assert!(
            absolute < squared * 20,
            "absolute_error {:?} vs squared_error {:?}",
            absolute,
            squared
        );
    }

    #[test]
    fn test_deep_tree_on_small_stack() {
        // Alternating labels make every split peel off a single row, so the
        // tree is about as deep as the data is long
        let n = 4000;
        let x = Array2::from_shape_fn((n, 1), |(i, _)| i as f64);
        let y = Array1::from_shape_fn(n, |i| (i % 2) as f64);

        let handle = std::thread::Builder::new()
            .stack_size(256 * 1024)
            .spawn(move || {
                let mut tree = DecisionTreeRegressor::new();
                tree.fit(&x, &y).unwrap();
                let depth = tree.get_depth();
                let preds = tree.predict(&x).unwrap();
                let encoded = bincode::serialize(&tree).unwrap();
                let decoded: DecisionTreeRegressor = bincode::deserialize(&encoded).unwrap();
                (depth, preds == y, decoded.predict(&x).unwrap() == preds, tree.get_n_leaves())
            })
            .unwrap();

        let (depth, exact, round_trip, n_leaves) = handle.join().unwrap();
        assert!(depth > n / 2, "depth {}", depth);
        assert!(exact);
        assert!(round_trip);
        assert_eq!(n_leaves, n);
    }
}
