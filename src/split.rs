use log::{debug, info};
use polars::prelude::*;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::model_selection::train_test_split;

use crate::error::{HeartAppError, Result};

/// Features and labels partitioned into train and test rows.
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub x_train: DenseMatrix<f64>,
    pub x_test: DenseMatrix<f64>,
    pub y_train: Vec<i32>,
    pub y_test: Vec<i32>,
}

impl TrainTestSplit {
    pub fn train_rows(&self) -> usize {
        self.y_train.len()
    }

    pub fn test_rows(&self) -> usize {
        self.y_test.len()
    }
}

/// Selects the named feature columns and the single target column. Any other
/// column of `in_df` is left out of both.
pub fn feature_and_target<S: AsRef<str>>(
    in_df: &DataFrame,
    features: &[S],
    target: &str,
) -> Result<(DataFrame, DataFrame)> {
    let names = in_df.get_column_names();
    for column in features.iter().map(|f| f.as_ref()).chain([target]) {
        if !names.contains(&column) {
            return Err(HeartAppError::MissingColumn {
                column: column.to_string(),
            });
        }
    }

    let features = in_df.select(features.iter().map(|f| f.as_ref()))?;
    let target = in_df.select([target])?;

    Ok((features, target))
}

/// Converts a feature frame into a smartcore matrix, one matrix column per
/// frame column.
pub fn features_to_matrix(in_df: &DataFrame) -> Result<DenseMatrix<f64>> {
    let nrows = in_df.height();
    let ncols = in_df.width();
    if nrows == 0 || ncols == 0 {
        return Err(HeartAppError::EmptyDataset);
    }

    // column major: every series is appended whole
    let mut xs: Vec<f64> = Vec::with_capacity(nrows * ncols);
    for series in in_df.get_columns() {
        let values = series.cast(&DataType::Float64)?;
        let values = values.f64()?;
        if values.null_count() > 0 {
            return Err(HeartAppError::MissingValue {
                column: series.name().to_string(),
                count: values.null_count(),
            });
        }
        xs.extend(values.into_no_null_iter());
    }

    debug!("feature matrix {}x{}", nrows, ncols);
    Ok(DenseMatrix::new(nrows, ncols, xs, true))
}

/// Extracts binary labels from the target column.
pub fn target_to_labels(in_df: &DataFrame, target: &str) -> Result<Vec<i32>> {
    let column = in_df
        .column(target)
        .map_err(|_| HeartAppError::MissingColumn {
            column: target.to_string(),
        })?
        .cast(&DataType::Int32)?;
    let labels = column.i32()?;
    if labels.null_count() > 0 {
        return Err(HeartAppError::MissingValue {
            column: target.to_string(),
            count: labels.null_count(),
        });
    }

    let y: Vec<i32> = labels.into_no_null_iter().collect();
    if let Some(&value) = y.iter().find(|&&v| v != 0 && v != 1) {
        return Err(HeartAppError::InvalidLabel {
            column: target.to_string(),
            value,
        });
    }
    Ok(y)
}

/// Number of test rows smartcore draws for `n` samples.
pub fn test_row_count(n: usize, test_size: f32) -> usize {
    (n as f32 * test_size) as usize
}

/// Deterministically partitions rows into train and test subsets. The same
/// seed always yields the same partition.
pub fn split_train_test(
    x: &DenseMatrix<f64>,
    y: &Vec<i32>,
    test_size: f32,
    seed: u64,
) -> Result<TrainTestSplit> {
    let n = y.len();
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(HeartAppError::InvalidSplit {
            reason: format!("test size {} outside (0, 1)", test_size),
        });
    }
    let n_test = test_row_count(n, test_size);
    if n_test == 0 || n_test >= n {
        return Err(HeartAppError::InvalidSplit {
            reason: format!("{} rows with test size {} leaves an empty side", n, test_size),
        });
    }

    let (x_train, x_test, y_train, y_test) = train_test_split(x, y, test_size, true, Some(seed));

    info!(
        "split {} rows into {} train / {} test (seed {})",
        n,
        y_train.len(),
        y_test.len(),
        seed
    );
    Ok(TrainTestSplit {
        x_train,
        x_test,
        y_train,
        y_test,
    })
}
