//! Regressor capability trait and evaluation metrics

use super::params::Params;
use crate::error::{Result, TrainerError};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Metrics for regression evaluation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Error
    pub mae: f64,
    /// R-squared
    pub r2: f64,
    /// Number of scored samples
    pub n_samples: usize,
}

impl RegressionMetrics {
    /// Compute regression metrics
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Self> {
        check_lengths(y_true, y_pred)?;

        let n = y_true.len() as f64;
        let errors: Vec<f64> = y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(t, p)| t - p)
            .collect();

        let mse = errors.iter().map(|e| e * e).sum::<f64>() / n;
        let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;

        Ok(Self {
            mse,
            rmse: mse.sqrt(),
            mae,
            r2: r2_from_errors(y_true, &errors),
            n_samples: y_true.len(),
        })
    }
}

/// Coefficient of determination.
///
/// Constant targets have no variance to explain; the score is `0.0` there
/// whatever the predictions are.
pub fn r2_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let errors: Vec<f64> = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| t - p)
        .collect();
    Ok(r2_from_errors(y_true, &errors))
}

fn r2_from_errors(y_true: &Array1<f64>, errors: &[f64]) -> f64 {
    let y_mean = y_true.mean().unwrap_or(0.0);
    let ss_tot: f64 = y_true.iter().map(|y| (y - y_mean).powi(2)).sum();
    let ss_res: f64 = errors.iter().map(|e| e * e).sum();

    if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else {
        0.0
    }
}

fn check_lengths(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<()> {
    if y_true.len() != y_pred.len() {
        return Err(TrainerError::ShapeError {
            expected: format!("y_pred length = {}", y_true.len()),
            actual: format!("y_pred length = {}", y_pred.len()),
        });
    }
    if y_true.is_empty() {
        return Err(TrainerError::ValidationError(
            "Cannot score an empty target".to_string(),
        ));
    }
    Ok(())
}

/// Capability shared by every regressor kind
pub trait Regressor: Send + Sync {
    /// Fit the model to training data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Make predictions
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Current hyperparameters
    fn get_params(&self) -> Params;

    /// Overwrite hyperparameters; unknown names are rejected
    fn set_params(&mut self, params: &Params) -> Result<()>;

    /// Whether `fit` has completed
    fn is_fitted(&self) -> bool;

    /// R² of predictions on `x` against `y`
    fn score(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<f64> {
        let y_pred = self.predict(x)?;
        r2_score(y, &y_pred)
    }
}

/// Shared input checks for `fit`
pub(crate) fn check_fit_input(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    let n_samples = x.nrows();
    if n_samples != y.len() {
        return Err(TrainerError::ShapeError {
            expected: format!("y length = {}", n_samples),
            actual: format!("y length = {}", y.len()),
        });
    }
    if n_samples == 0 || x.ncols() == 0 {
        return Err(TrainerError::ValidationError(format!(
            "Cannot fit on an empty matrix ({} x {})",
            n_samples,
            x.ncols()
        )));
    }
    Ok(())
}

/// Shared input checks for `predict`
pub(crate) fn check_predict_input(x: &Array2<f64>, n_features: usize) -> Result<()> {
    if x.ncols() != n_features {
        return Err(TrainerError::ShapeError {
            expected: format!("{} features", n_features),
            actual: format!("{} features", x.ncols()),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_regression_metrics() {
        let y_true = array![1.0, 2.0, 3.0, 4.0, 5.0];
        let y_pred = array![1.1, 2.0, 2.9, 4.1, 5.0];

        let metrics = RegressionMetrics::compute(&y_true, &y_pred).unwrap();

        assert!(metrics.mse < 0.01);
        assert!((metrics.rmse - metrics.mse.sqrt()).abs() < 1e-12);
        assert!(metrics.r2 > 0.9);
        assert_eq!(metrics.n_samples, 5);
    }

    #[test]
    fn test_r2_perfect_and_mean_baseline() {
        let y = array![1.0, 2.0, 3.0];
        assert_eq!(r2_score(&y, &y).unwrap(), 1.0);

        let mean = array![2.0, 2.0, 2.0];
        assert!(r2_score(&y, &mean).unwrap().abs() < 1e-12);

        let bad = array![3.0, 2.0, 1.0];
        assert!(r2_score(&y, &bad).unwrap() < 0.0);
    }

    #[test]
    fn test_r2_constant_target_is_zero() {
        let y = array![4.0, 4.0, 4.0];
        assert_eq!(r2_score(&y, &y).unwrap(), 0.0);
        assert_eq!(r2_score(&y, &array![1.0, 2.0, 3.0]).unwrap(), 0.0);
    }

    #[test]
    fn test_r2_rejects_bad_input() {
        let y = array![1.0, 2.0];
        assert!(matches!(
            r2_score(&y, &array![1.0]),
            Err(TrainerError::ShapeError { .. })
        ));
        let empty = Array1::<f64>::zeros(0);
        assert!(r2_score(&empty, &empty).is_err());
    }
}
