//! Train/test split with the label in the last column

use crate::error::{Result, TrainerError};
use ndarray::{s, Array1, Array2};

/// Validated feature/label split of the train and test matrices
#[derive(Debug, Clone)]
pub struct DatasetSplit {
    pub x_train: Array2<f64>,
    pub y_train: Array1<f64>,
    pub x_test: Array2<f64>,
    pub y_test: Array1<f64>,
}

impl DatasetSplit {
    /// Validate both matrices and split each at its last column
    pub fn from_arrays(train: &Array2<f64>, test: &Array2<f64>) -> Result<Self> {
        check_matrix("train", train)?;
        check_matrix("test", test)?;

        if train.ncols() != test.ncols() {
            return Err(TrainerError::ShapeError {
                expected: format!("test with {} columns", train.ncols()),
                actual: format!("test with {} columns", test.ncols()),
            });
        }

        let (x_train, y_train) = split_label(train);
        let (x_test, y_test) = split_label(test);
        Ok(Self {
            x_train,
            y_train,
            x_test,
            y_test,
        })
    }

    pub fn n_features(&self) -> usize {
        self.x_train.ncols()
    }

    pub fn n_train(&self) -> usize {
        self.x_train.nrows()
    }

    pub fn n_test(&self) -> usize {
        self.x_test.nrows()
    }
}

fn check_matrix(name: &str, data: &Array2<f64>) -> Result<()> {
    if data.nrows() < 2 {
        return Err(TrainerError::ValidationError(format!(
            "{} split needs at least 2 rows, got {}",
            name,
            data.nrows()
        )));
    }
    if data.ncols() < 2 {
        return Err(TrainerError::ValidationError(format!(
            "{} split needs at least one feature column plus the label, got {} columns",
            name,
            data.ncols()
        )));
    }
    if let Some(pos) = data.iter().position(|v| !v.is_finite()) {
        let (row, col) = (pos / data.ncols(), pos % data.ncols());
        return Err(TrainerError::ValidationError(format!(
            "{} split has a non-finite value at row {}, column {}",
            name, row, col
        )));
    }
    Ok(())
}

fn split_label(data: &Array2<f64>) -> (Array2<f64>, Array1<f64>) {
    let label = data.ncols() - 1;
    (
        data.slice(s![.., ..label]).to_owned(),
        data.column(label).to_owned(),
    )
}
