//! Ordinary least squares linear regression

use super::models::{check_fit_input, check_predict_input, Regressor};
use super::params::{ParamValue, Params};
use crate::error::{Result, TrainerError};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Cholesky solve of the symmetric system `a * x = b`.
/// Returns `None` when `a` is not positive definite.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let sum: f64 = (0..j).map(|k| l[[i, k]] * l[[j, k]]).sum();
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 || !diag.is_finite() {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // Forward substitution: L * z = b
    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let sum: f64 = (0..i).map(|j| l[[i, j]] * z[j]).sum();
        z[i] = (b[i] - sum) / l[[i, i]];
    }

    // Backward substitution: L^T * x = z
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let sum: f64 = ((i + 1)..n).map(|j| l[[j, i]] * x[j]).sum();
        x[i] = (z[i] - sum) / l[[i, i]];
    }

    Some(x)
}

/// Gauss-Jordan elimination with partial pivoting
fn gauss_jordan_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    let mut aug = Array2::<f64>::zeros((n, n + 1));
    for i in 0..n {
        for j in 0..n {
            aug[[i, j]] = a[[i, j]];
        }
        aug[[i, n]] = b[i];
    }

    for col in 0..n {
        let pivot_row = (col..n).max_by(|&r1, &r2| {
            aug[[r1, col]]
                .abs()
                .partial_cmp(&aug[[r2, col]].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        if aug[[pivot_row, col]].abs() < 1e-10 {
            return None;
        }
        if pivot_row != col {
            for j in 0..=n {
                aug.swap([col, j], [pivot_row, j]);
            }
        }

        let pivot = aug[[col, col]];
        for j in 0..=n {
            aug[[col, j]] /= pivot;
        }
        for row in 0..n {
            if row != col {
                let factor = aug[[row, col]];
                for j in 0..=n {
                    aug[[row, j]] -= factor * aug[[col, j]];
                }
            }
        }
    }

    Some(aug.column(n).to_owned())
}

/// Solve the normal equations `(X^T X) w = X^T y`.
///
/// Singular systems get a small ridge on the diagonal, which drives the
/// solution toward the minimum-norm one (zero weight on constant or
/// duplicated features).
fn solve_normal_equations(xtx: &Array2<f64>, xty: &Array1<f64>) -> Result<Array1<f64>> {
    if let Some(w) = cholesky_solve(xtx, xty) {
        return Ok(w);
    }

    let n = xtx.nrows();
    let mean_diag = xtx.diag().iter().map(|v| v.abs()).sum::<f64>() / n.max(1) as f64;
    let ridge = (1e-8 * mean_diag).max(1e-12);
    let mut regularized = xtx.clone();
    for i in 0..n {
        regularized[[i, i]] += ridge;
    }

    cholesky_solve(&regularized, xty)
        .or_else(|| gauss_jordan_solve(&regularized, xty))
        .ok_or_else(|| {
            TrainerError::ComputationError(
                "Matrix is singular, cannot solve least squares".to_string(),
            )
        })
}

/// Linear regression model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegression {
    /// Fitted coefficients (weights)
    pub coefficients: Option<Array1<f64>>,
    /// Fitted intercept (bias)
    pub intercept: Option<f64>,
    /// Whether to fit intercept
    pub fit_intercept: bool,
    n_features: usize,
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearRegression {
    /// Create a new linear regression model
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: None,
            fit_intercept: true,
            n_features: 0,
        }
    }

    /// Enable/disable fitting intercept
    pub fn with_fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }
}

impl Regressor for LinearRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;

        // Center data if fitting intercept
        let (x_work, y_work, means) = if self.fit_intercept {
            let x_mean = x
                .mean_axis(Axis(0))
                .ok_or_else(|| TrainerError::ValidationError("Empty feature matrix".into()))?;
            let y_mean = y.mean().unwrap_or(0.0);
            let x_centered = x - &x_mean.view().insert_axis(Axis(0));
            let y_centered = y - y_mean;
            (x_centered, y_centered, Some((x_mean, y_mean)))
        } else {
            (x.clone(), y.clone(), None)
        };

        let xtx = x_work.t().dot(&x_work);
        let xty = x_work.t().dot(&y_work);
        let coefficients = solve_normal_equations(&xtx, &xty)?;

        let intercept = match means {
            Some((x_mean, y_mean)) => y_mean - coefficients.dot(&x_mean),
            None => 0.0,
        };

        self.n_features = x.ncols();
        self.coefficients = Some(coefficients);
        self.intercept = Some(intercept);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = self.coefficients.as_ref().ok_or(TrainerError::ModelNotFitted)?;
        check_predict_input(x, self.n_features)?;
        Ok(x.dot(coefficients) + self.intercept.unwrap_or(0.0))
    }

    fn get_params(&self) -> Params {
        let mut params = Params::new();
        params.insert("fit_intercept".into(), ParamValue::Bool(self.fit_intercept));
        params
    }

    fn set_params(&mut self, params: &Params) -> Result<()> {
        for (name, value) in params {
            match name.as_str() {
                "fit_intercept" => self.fit_intercept = value.as_bool(name)?,
                _ => {
                    return Err(TrainerError::invalid_param(
                        name,
                        value,
                        "unknown parameter for LinearRegression",
                    ))
                }
            }
        }
        Ok(())
    }

    fn is_fitted(&self) -> bool {
        self.coefficients.is_some()
    }
}
