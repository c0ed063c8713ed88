//! Model selection
//!
//! Evaluates every entry of a [`Registry`] on a train/test split, keeps the
//! best-scoring model if it clears the acceptance threshold, and persists it.

mod config;
mod dataset;
mod evaluate;
mod registry;
mod trainer;

pub use config::ModelTrainerConfig;
pub use dataset::DatasetSplit;
pub use evaluate::{Evaluator, GridSearchEvaluator, ModelEvaluation};
pub use registry::{ModelSpec, Registry};
pub use trainer::{BestParamsReport, ModelReport, ModelTrainer, SelectionOutcome};
