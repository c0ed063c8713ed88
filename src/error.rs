//! Error types for model training and selection

use std::fmt;
use thiserror::Error;

/// Result type alias for trainer operations
pub type Result<T> = std::result::Result<T, TrainerError>;

/// Pipeline stage an error surfaced from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Input shape and content checks
    Validation,
    /// Hyperparameter search, fitting and scoring of candidates
    Search,
    /// Acceptance threshold on the best score
    Threshold,
    /// Writing the selected model to disk
    Persist,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validation => "validation",
            Stage::Search => "search",
            Stage::Threshold => "threshold",
            Stage::Persist => "persist",
        };
        f.write_str(name)
    }
}

/// Main error type for the trainer
#[derive(Error, Debug)]
pub enum TrainerError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Computation error: {0}")]
    ComputationError(String),

    #[error("No acceptable model found: best was '{best_model}' with R² {best_score:.4}, threshold {threshold}")]
    NoAcceptableModel {
        best_model: String,
        best_score: f64,
        threshold: f64,
    },

    #[error("{stage} stage failed ({context}): {source}")]
    Stage {
        stage: Stage,
        context: String,
        #[source]
        source: Box<TrainerError>,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl TrainerError {
    /// Wrap an error with the stage it occurred in
    pub fn at_stage(stage: Stage, context: impl Into<String>, source: TrainerError) -> Self {
        TrainerError::Stage {
            stage,
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Stage this error belongs to, if any
    pub fn stage(&self) -> Option<Stage> {
        match self {
            TrainerError::Stage { stage, .. } => Some(*stage),
            TrainerError::ValidationError(_) | TrainerError::ShapeError { .. } => {
                Some(Stage::Validation)
            }
            TrainerError::NoAcceptableModel { .. } => Some(Stage::Threshold),
            _ => None,
        }
    }

    /// Innermost error, skipping stage wrappers
    pub fn root_cause(&self) -> &TrainerError {
        match self {
            TrainerError::Stage { source, .. } => source.root_cause(),
            other => other,
        }
    }

    pub(crate) fn invalid_param(
        name: impl Into<String>,
        value: impl fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        TrainerError::InvalidParameter {
            name: name.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for TrainerError {
    fn from(err: serde_json::Error) -> Self {
        TrainerError::SerializationError(err.to_string())
    }
}

impl From<bincode::Error> for TrainerError {
    fn from(err: bincode::Error) -> Self {
        TrainerError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for TrainerError {
    fn from(err: ndarray::ShapeError) -> Self {
        TrainerError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
