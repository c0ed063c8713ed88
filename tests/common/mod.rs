//! Shared fixtures for integration tests

#![allow(dead_code)]

use ndarray::Array2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Rows of `n_features` uniform features followed by a linear label with
/// a little noise
pub fn linear_matrix(n_rows: usize, n_features: usize, seed: u64) -> Array2<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut data = Array2::<f64>::zeros((n_rows, n_features + 1));
    for i in 0..n_rows {
        let mut label = 3.0;
        for j in 0..n_features {
            let value: f64 = rng.gen_range(-2.0..2.0);
            data[[i, j]] = value;
            label += (j as f64 + 1.0) * value * if j % 2 == 0 { 1.0 } else { -0.5 };
        }
        data[[i, n_features]] = label + rng.gen_range(-0.05..0.05);
    }
    data
}

/// Features with no relation to the label
pub fn noise_matrix(n_rows: usize, n_features: usize, seed: u64) -> Array2<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    Array2::from_shape_fn((n_rows, n_features + 1), |_| rng.gen_range(-1.0..1.0))
}

/// Linear features with a constant label
pub fn constant_label_matrix(n_rows: usize, n_features: usize, seed: u64) -> Array2<f64> {
    let mut data = linear_matrix(n_rows, n_features, seed);
    data.column_mut(n_features).fill(5.0);
    data
}
