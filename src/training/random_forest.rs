//! Random forest regressor

use super::decision_tree::DecisionTreeRegressor;
use super::models::{check_fit_input, check_predict_input, Regressor};
use super::params::{ParamValue, Params};
use crate::error::{Result, TrainerError};
use ndarray::{Array1, Array2, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Strategy for max features
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// Square root of n_features
    Sqrt,
    /// Log2 of n_features
    Log2,
    /// Fixed number
    Fixed(usize),
    /// All features
    All,
}

impl MaxFeatures {
    fn resolve(&self, n_features: usize) -> usize {
        match self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().floor() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().floor() as usize,
            MaxFeatures::Fixed(n) => (*n).min(n_features),
            MaxFeatures::All => n_features,
        }
        .max(1)
    }

    fn to_param(self) -> ParamValue {
        match self {
            MaxFeatures::Sqrt => ParamValue::from("sqrt"),
            MaxFeatures::Log2 => ParamValue::from("log2"),
            MaxFeatures::Fixed(n) => ParamValue::Int(n as i64),
            MaxFeatures::All => ParamValue::from("all"),
        }
    }

    fn from_param(name: &str, value: &ParamValue) -> Result<Self> {
        match value {
            ParamValue::Str(s) => match s.as_str() {
                "sqrt" => Ok(MaxFeatures::Sqrt),
                "log2" => Ok(MaxFeatures::Log2),
                "all" | "none" => Ok(MaxFeatures::All),
                other => Err(TrainerError::invalid_param(
                    name,
                    other,
                    "expected sqrt, log2, all or a positive integer",
                )),
            },
            other => match other.as_usize(name)? {
                0 => Err(TrainerError::invalid_param(name, 0, "must be positive")),
                n => Ok(MaxFeatures::Fixed(n)),
            },
        }
    }
}

/// Random forest regressor: bagged decision trees averaged at prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    /// Individual trees
    trees: Vec<DecisionTreeRegressor>,
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum depth per tree
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features considered per split
    pub max_features: MaxFeatures,
    /// Bootstrap sampling
    pub bootstrap: bool,
    /// Random state
    pub random_state: Option<u64>,
    feature_importances: Option<Array1<f64>>,
    n_features: usize,
}

impl Default for RandomForestRegressor {
    fn default() -> Self {
        Self::new(100)
    }
}

impl RandomForestRegressor {
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
            bootstrap: true,
            random_state: None,
            feature_importances: None,
            n_features: 0,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    /// Set max features strategy
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Enable/disable bootstrap sampling
    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
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

    /// Get number of trees
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn compute_feature_importances(&mut self) {
        let mut total_importances = vec![0.0; self.n_features];
        for tree in &self.trees {
            if let Some(imp) = tree.feature_importances() {
                for (total, &val) in total_importances.iter_mut().zip(imp.iter()) {
                    *total += val;
                }
            }
        }

        let total: f64 = total_importances.iter().sum();
        if total > 0.0 {
            for imp in &mut total_importances {
                *imp /= total;
            }
        }
        self.feature_importances = Some(Array1::from_vec(total_importances));
    }
}

impl Regressor for RandomForestRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        if self.n_estimators == 0 {
            return Err(TrainerError::invalid_param("n_estimators", 0, "must be positive"));
        }

        let n_samples = x.nrows();
        let n_features = x.ncols();
        let max_features = self.max_features.resolve(n_features);
        let base_seed = self.random_state.unwrap_or(42);

        // Build trees in parallel; collecting into Result keeps tree order and
        // surfaces the first failure
        let trees: Result<Vec<DecisionTreeRegressor>> = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let seed = base_seed.wrapping_add(tree_idx as u64);
                let mut rng = ChaCha8Rng::seed_from_u64(seed);

                let mut tree = DecisionTreeRegressor::new()
                    .with_min_samples_split(self.min_samples_split)
                    .with_min_samples_leaf(self.min_samples_leaf)
                    .with_max_features(max_features)
                    .with_random_state(seed);
                if let Some(d) = self.max_depth {
                    tree = tree.with_max_depth(d);
                }

                if self.bootstrap {
                    let sample_indices: Vec<usize> =
                        (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect();
                    let x_boot = x.select(Axis(0), &sample_indices);
                    let y_boot = y.select(Axis(0), &sample_indices);
                    tree.fit(&x_boot, &y_boot)?;
                } else {
                    tree.fit(x, y)?;
                }
                Ok(tree)
            })
            .collect();

        self.trees = trees?;
        self.n_features = n_features;
        self.compute_feature_importances();
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(TrainerError::ModelNotFitted);
        }
        check_predict_input(x, self.n_features)?;

        let all_predictions: Result<Vec<Array1<f64>>> =
            self.trees.par_iter().map(|tree| tree.predict(x)).collect();

        let mut sum = Array1::<f64>::zeros(x.nrows());
        for preds in all_predictions? {
            sum += &preds;
        }
        Ok(sum / self.trees.len() as f64)
    }

    fn get_params(&self) -> Params {
        let mut params = Params::new();
        params.insert("n_estimators".into(), ParamValue::Int(self.n_estimators as i64));
        params.insert("max_depth".into(), ParamValue::from_optional(self.max_depth));
        params.insert("min_samples_split".into(), ParamValue::Int(self.min_samples_split as i64));
        params.insert("min_samples_leaf".into(), ParamValue::Int(self.min_samples_leaf as i64));
        params.insert("max_features".into(), self.max_features.to_param());
        params.insert("bootstrap".into(), ParamValue::Bool(self.bootstrap));
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
                "max_depth" => self.max_depth = value.as_optional_usize(name)?,
                "min_samples_split" => self.min_samples_split = value.as_usize(name)?,
                "min_samples_leaf" => self.min_samples_leaf = value.as_usize(name)?,
                "max_features" => self.max_features = MaxFeatures::from_param(name, value)?,
                "bootstrap" => self.bootstrap = value.as_bool(name)?,
                "random_state" => {
                    self.random_state = value.as_optional_seed(name)?
                }
                _ => {
                    return Err(TrainerError::invalid_param(
                        name,
                        value,
                        "unknown parameter for RandomForestRegressor",
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
