//! Model registry: named candidates with their search grids

use crate::error::{Result, TrainerError};
use crate::training::{ModelKind, ParamGrid, RegressorModel};
use std::collections::HashSet;

/// One registry entry
#[derive(Debug, Clone)]
pub struct ModelSpec {
    /// Name the candidate is reported under
    pub name: String,
    pub kind: ModelKind,
    /// Hyperparameters searched for this candidate
    pub grid: ParamGrid,
}

impl ModelSpec {
    /// Entry for `kind` with its display name and default grid
    pub fn from_kind(kind: ModelKind) -> Self {
        Self {
            name: kind.display_name().to_string(),
            kind,
            grid: kind.default_grid(),
        }
    }

    pub fn new(name: impl Into<String>, kind: ModelKind, grid: ParamGrid) -> Self {
        Self {
            name: name.into(),
            kind,
            grid,
        }
    }

    /// Fresh unfitted model
    pub fn create(&self) -> RegressorModel {
        self.kind.create()
    }
}

/// Ordered set of candidates; order decides ties
#[derive(Debug, Clone)]
pub struct Registry {
    specs: Vec<ModelSpec>,
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            specs: ModelKind::ALL.iter().map(|&k| ModelSpec::from_kind(k)).collect(),
        }
    }
}

impl Registry {
    pub fn new(specs: Vec<ModelSpec>) -> Self {
        Self { specs }
    }

    pub fn with_spec(mut self, spec: ModelSpec) -> Self {
        self.specs.push(spec);
        self
    }

    pub fn specs(&self) -> &[ModelSpec] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ModelSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    /// Non-empty with unique names
    pub fn validate(&self) -> Result<()> {
        if self.specs.is_empty() {
            return Err(TrainerError::ValidationError(
                "Model registry is empty".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for spec in &self.specs {
            if !seen.insert(spec.name.as_str()) {
                return Err(TrainerError::ValidationError(format!(
                    "Duplicate model name in registry: {}",
                    spec.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_order() {
        let registry = Registry::default();
        let names: Vec<&str> = registry.specs().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Random Forest",
                "Decision Tree",
                "Gradient Boosting",
                "Linear Regression",
                "XGBRegressor",
                "CatBoosting Regressor",
                "AdaBoost Regressor",
            ]
        );
        assert!(registry.validate().is_ok());
        assert_eq!(registry.get("Gradient Boosting").unwrap().grid.n_combinations(), 72);
    }

    #[test]
    fn test_rejects_empty_and_duplicates() {
        assert!(Registry::new(Vec::new()).validate().is_err());
        let dup = Registry::new(vec![
            ModelSpec::from_kind(ModelKind::LinearRegression),
            ModelSpec::from_kind(ModelKind::LinearRegression),
        ]);
        assert!(dup.validate().is_err());
    }
}
