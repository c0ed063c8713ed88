//! Closed set of regressor kinds and the tagged model wrapper

use super::adaboost::AdaBoostRegressor;
use super::catboost::CatBoostRegressor;
use super::decision_tree::DecisionTreeRegressor;
use super::gradient_boosting::GradientBoostingRegressor;
use super::linear_models::LinearRegression;
use super::models::Regressor;
use super::params::{ParamGrid, Params};
use super::random_forest::RandomForestRegressor;
use super::xgboost::XGBoostRegressor;
use crate::error::Result;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Regressor family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    RandomForest,
    DecisionTree,
    GradientBoosting,
    LinearRegression,
    XGBoost,
    CatBoost,
    AdaBoost,
}

impl ModelKind {
    /// Every kind, in default registry order
    pub const ALL: [ModelKind; 7] = [
        ModelKind::RandomForest,
        ModelKind::DecisionTree,
        ModelKind::GradientBoosting,
        ModelKind::LinearRegression,
        ModelKind::XGBoost,
        ModelKind::CatBoost,
        ModelKind::AdaBoost,
    ];

    /// Name the model is reported under
    pub fn display_name(&self) -> &'static str {
        match self {
            ModelKind::RandomForest => "Random Forest",
            ModelKind::DecisionTree => "Decision Tree",
            ModelKind::GradientBoosting => "Gradient Boosting",
            ModelKind::LinearRegression => "Linear Regression",
            ModelKind::XGBoost => "XGBRegressor",
            ModelKind::CatBoost => "CatBoosting Regressor",
            ModelKind::AdaBoost => "AdaBoost Regressor",
        }
    }

    /// Fresh, unfitted model with default hyperparameters
    pub fn create(&self) -> RegressorModel {
        match self {
            ModelKind::RandomForest => RegressorModel::RandomForest(RandomForestRegressor::default()),
            ModelKind::DecisionTree => RegressorModel::DecisionTree(DecisionTreeRegressor::default()),
            ModelKind::GradientBoosting => {
                RegressorModel::GradientBoosting(GradientBoostingRegressor::default())
            }
            ModelKind::LinearRegression => RegressorModel::LinearRegression(LinearRegression::default()),
            ModelKind::XGBoost => RegressorModel::XGBoost(XGBoostRegressor::default()),
            ModelKind::CatBoost => RegressorModel::CatBoost(CatBoostRegressor::default()),
            ModelKind::AdaBoost => RegressorModel::AdaBoost(AdaBoostRegressor::default()),
        }
    }

    /// Hyperparameter grid searched for this kind by default
    pub fn default_grid(&self) -> ParamGrid {
        match self {
            ModelKind::RandomForest => ParamGrid::new().with("n_estimators", vec![8i64, 16, 32]),
            ModelKind::DecisionTree => ParamGrid::new().with(
                "criterion",
                vec!["squared_error", "friedman_mse", "absolute_error", "poisson"],
            ),
            ModelKind::GradientBoosting => ParamGrid::new()
                .with("learning_rate", vec![0.1, 0.01, 0.05, 0.001])
                .with("subsample", vec![0.6, 0.7, 0.75, 0.8, 0.85, 0.9])
                .with("n_estimators", vec![8i64, 16, 32]),
            ModelKind::LinearRegression => ParamGrid::new(),
            ModelKind::XGBoost => ParamGrid::new()
                .with("learning_rate", vec![0.1, 0.01, 0.05, 0.001])
                .with("n_estimators", vec![8i64, 16, 32]),
            ModelKind::CatBoost => ParamGrid::new()
                .with("depth", vec![6i64, 8, 10])
                .with("learning_rate", vec![0.01, 0.05, 0.1])
                .with("iterations", vec![30i64, 50, 100]),
            ModelKind::AdaBoost => ParamGrid::new()
                .with("learning_rate", vec![0.1, 0.01, 0.5, 0.001])
                .with("n_estimators", vec![8i64, 16, 32]),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A regressor of any supported kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RegressorModel {
    RandomForest(RandomForestRegressor),
    DecisionTree(DecisionTreeRegressor),
    GradientBoosting(GradientBoostingRegressor),
    LinearRegression(LinearRegression),
    XGBoost(XGBoostRegressor),
    CatBoost(CatBoostRegressor),
    AdaBoost(AdaBoostRegressor),
}

impl RegressorModel {
    pub fn kind(&self) -> ModelKind {
        match self {
            RegressorModel::RandomForest(_) => ModelKind::RandomForest,
            RegressorModel::DecisionTree(_) => ModelKind::DecisionTree,
            RegressorModel::GradientBoosting(_) => ModelKind::GradientBoosting,
            RegressorModel::LinearRegression(_) => ModelKind::LinearRegression,
            RegressorModel::XGBoost(_) => ModelKind::XGBoost,
            RegressorModel::CatBoost(_) => ModelKind::CatBoost,
            RegressorModel::AdaBoost(_) => ModelKind::AdaBoost,
        }
    }

    fn inner(&self) -> &dyn Regressor {
        match self {
            RegressorModel::RandomForest(m) => m,
            RegressorModel::DecisionTree(m) => m,
            RegressorModel::GradientBoosting(m) => m,
            RegressorModel::LinearRegression(m) => m,
            RegressorModel::XGBoost(m) => m,
            RegressorModel::CatBoost(m) => m,
            RegressorModel::AdaBoost(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Regressor {
        match self {
            RegressorModel::RandomForest(m) => m,
            RegressorModel::DecisionTree(m) => m,
            RegressorModel::GradientBoosting(m) => m,
            RegressorModel::LinearRegression(m) => m,
            RegressorModel::XGBoost(m) => m,
            RegressorModel::CatBoost(m) => m,
            RegressorModel::AdaBoost(m) => m,
        }
    }
}

impl Regressor for RegressorModel {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.inner_mut().fit(x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.inner().predict(x)
    }

    fn get_params(&self) -> Params {
        self.inner().get_params()
    }

    fn set_params(&mut self, params: &Params) -> Result<()> {
        self.inner_mut().set_params(params)
    }

    fn is_fitted(&self) -> bool {
        self.inner().is_fitted()
    }
}
