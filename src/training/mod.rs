//! Model training
//!
//! Native regressors behind the [`Regressor`] trait, hyperparameter grids,
//! K-fold cross-validation and grid search:
//! - Linear regression (OLS)
//! - Decision trees and random forests
//! - Gradient boosting, XGBoost-style and CatBoost-style boosting
//! - AdaBoost.R2

mod models;
pub mod adaboost;
pub mod catboost;
pub mod cross_validation;
pub mod decision_tree;
pub mod gradient_boosting;
pub mod grid_search;
pub mod linear_models;
pub mod params;
pub mod random_forest;
pub mod regressor;
pub mod xgboost;

pub use adaboost::{AdaBoostLoss, AdaBoostRegressor};
pub use catboost::{CatBoostConfig, CatBoostRegressor};
pub use cross_validation::{CVResults, CVSplit, KFold};
pub use decision_tree::{Criterion, DecisionTreeRegressor, TreeNode};
pub use gradient_boosting::{GradientBoostingConfig, GradientBoostingRegressor};
pub use grid_search::{CandidateResult, GridSearch, SearchOutcome};
pub use linear_models::LinearRegression;
pub use models::{r2_score, RegressionMetrics, Regressor};
pub use params::{format_params, ParamGrid, ParamValue, Params};
pub use random_forest::{MaxFeatures, RandomForestRegressor};
pub use regressor::{ModelKind, RegressorModel};
pub use xgboost::{XGBoostConfig, XGBoostRegressor};
