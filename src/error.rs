use std::path::PathBuf;

use polars::prelude::PolarsError;
use smartcore::error::Failed;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HeartAppError {
    #[error("invalid input format {path:?}")]
    InputFormat { path: PathBuf },
    #[error("missing column {column:?}")]
    MissingColumn { column: String },
    #[error("column {column:?} has {count} missing values")]
    MissingValue { column: String, count: usize },
    #[error("unknown value {value:?} in column {column:?}")]
    UnknownCategory { column: String, value: String },
    #[error("invalid label {value} in column {column:?}, expected 0 or 1")]
    InvalidLabel { column: String, value: i32 },
    #[error("invalid split: {reason}")]
    InvalidSplit { reason: String },
    #[error("dataset is empty")]
    EmptyDataset,
    #[error("could not draw {path:?}: {message}")]
    Plot { path: PathBuf, message: String },
    #[error(transparent)]
    Polars(#[from] PolarsError),
    #[error("model failure: {0}")]
    Model(#[from] Failed),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HeartAppError>;
