//! model-trainer - regression model selection
//!
//! Given a training and a test matrix (label in the last column), every
//! candidate regressor is tuned by grid search with K-fold cross-validation,
//! scored by R² on the test split, and the best one is persisted if it clears
//! the acceptance threshold.
//!
//! # Modules
//!
//! - [`training`] - Native regressors, parameter grids, cross-validation and grid search
//! - [`selection`] - Model registry and the selection orchestrator
//! - [`export`] - Checksummed model artifacts with atomic writes
//! - [`cli`] - Command-line interface
//!
//! # Example
//!
//! ```no_run
//! use model_trainer::{ModelTrainer, ModelTrainerConfig};
//! use ndarray::Array2;
//!
//! # fn main() -> model_trainer::Result<()> {
//! let train: Array2<f64> = Array2::zeros((100, 4));
//! let test: Array2<f64> = Array2::zeros((20, 4));
//! let config = ModelTrainerConfig::default().with_artifact_path("artifacts/model.bin");
//! let r2 = ModelTrainer::new(config).select_best_model(&train, &test)?;
//! println!("R² = {:.4}", r2);
//! # Ok(())
//! # }
//! ```

pub mod error;

pub mod training;
pub mod selection;
pub mod export;

pub mod cli;

pub use error::{Result, Stage, TrainerError};
pub use export::{load_artifact, save_artifact, ArtifactMetadata, SerializationFormat};
pub use selection::{
    DatasetSplit, Evaluator, GridSearchEvaluator, ModelEvaluation, ModelSpec, ModelTrainer,
    ModelTrainerConfig, Registry, SelectionOutcome,
};
pub use training::{r2_score, ModelKind, ParamGrid, ParamValue, Params, Regressor, RegressorModel};
