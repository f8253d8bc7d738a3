use std::ops::{DivAssign, MulAssign, SubAssign};

use log::debug;
use num::Num;
use polars::export::num::NumCast;
use polars::prelude::*;

use crate::error::{HeartAppError, Result};

/// Name of the indicator column for one category value.
pub fn indicator_name(column: &str, value: &str) -> String {
    format!("{}_{}", column, value)
}

/// Replaces a string column by one `1.0`/`0.0` indicator column per known
/// category, appended in `categories` order. Every category gets a column
/// even when no row holds it, so `famhist` always becomes `famhist_Absent`
/// and `famhist_Present`.
pub fn one_hot_encode(df: &DataFrame, column: &str, categories: &[&str]) -> Result<DataFrame> {
    let utf8 = df
        .column(column)
        .map_err(|_| HeartAppError::MissingColumn {
            column: column.to_string(),
        })?
        .utf8()?;

    if utf8.null_count() > 0 {
        return Err(HeartAppError::MissingValue {
            column: column.to_string(),
            count: utf8.null_count(),
        });
    }
    if let Some(value) = utf8.into_no_null_iter().find(|val| !categories.contains(val)) {
        return Err(HeartAppError::UnknownCategory {
            column: column.to_string(),
            value: value.to_string(),
        });
    }
    debug!("encoding {:?} into {} indicators", column, categories.len());

    let mut encoded = df.drop(column)?;
    for &category in categories {
        let indicator: Vec<f64> = utf8
            .into_no_null_iter()
            .map(|val| if val == category { 1.0 } else { 0.0 })
            .collect();
        encoded.with_column(Series::new(&indicator_name(column, category), indicator))?;
    }

    Ok(encoded)
}

/// Rescales the given numeric columns into [0, 1].
pub fn min_max_scale(df: DataFrame, columns: &[&str]) -> Result<DataFrame> {
    let mut lazy = df.lazy();
    for name in columns {
        lazy = lazy.with_column(
            col(name)
                .cast(DataType::Float64)
                .alias(name)
                .apply(min_max_series::<f64>, GetOutput::from_type(DataType::Float64)),
        );
    }
    Ok(lazy.collect()?)
}

fn min_max_series<T: Num + Copy + MulAssign + SubAssign + DivAssign + PartialOrd>(
    column: Series,
) -> PolarsResult<Option<Series>>
where
    T: NumCast,
{
    let (min, max) = match (column.min::<T>(), column.max::<T>()) {
        (Some(min), Some(max)) => (min, max),
        _ => return Ok(Some(column)),
    };
    let range = max - min;
    if range == T::zero() {
        return Ok(Some(column - min));
    }
    Ok(Some((column - min) / range))
}
