//! Configuration for the selection pipeline

use crate::error::{Result, TrainerError};
use crate::export::SerializationFormat;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Selection pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelTrainerConfig {
    /// Where the selected model is written
    pub artifact_path: PathBuf,
    /// Minimum test R² for a model to be accepted
    pub acceptance_threshold: f64,
    /// Cross-validation folds used by the grid search
    pub cv_folds: usize,
    /// Shuffle rows before cutting folds
    pub shuffle_folds: bool,
    /// Seed for fold shuffling
    pub random_state: Option<u64>,
    /// Evaluate candidates across the rayon pool
    pub parallel: bool,
    /// Artifact encoding
    pub format: SerializationFormat,
}

impl Default for ModelTrainerConfig {
    fn default() -> Self {
        Self {
            artifact_path: PathBuf::from("artifacts/model.bin"),
            acceptance_threshold: 0.6,
            cv_folds: 3,
            shuffle_folds: false,
            random_state: None,
            parallel: false,
            format: SerializationFormat::Binary,
        }
    }
}

impl ModelTrainerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_artifact_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.artifact_path = path.into();
        self
    }

    pub fn with_acceptance_threshold(mut self, threshold: f64) -> Self {
        self.acceptance_threshold = threshold;
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_shuffle_folds(mut self, shuffle: bool) -> Self {
        self.shuffle_folds = shuffle;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_format(mut self, format: SerializationFormat) -> Self {
        self.format = format;
        self
    }

    /// Load from a JSON file; missing fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path.as_ref(), serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !self.acceptance_threshold.is_finite() {
            return Err(TrainerError::ConfigError(format!(
                "acceptance_threshold must be finite, got {}",
                self.acceptance_threshold
            )));
        }
        if self.cv_folds < 2 {
            return Err(TrainerError::ConfigError(format!(
                "cv_folds must be at least 2, got {}",
                self.cv_folds
            )));
        }
        if self.artifact_path.as_os_str().is_empty() {
            return Err(TrainerError::ConfigError(
                "artifact_path must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
