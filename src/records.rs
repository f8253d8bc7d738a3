use polars::prelude::{DataType, Field, Schema};

use crate::encode::indicator_name;

/// Outcome label: coronary heart disease, 0 or 1.
pub const TARGET_COLUMN: &str = "chd";

/// Family history of heart disease, `Present` or `Absent`.
pub const CATEGORICAL_COLUMN: &str = "famhist";

/// Every value `famhist` may take, in indicator column order.
pub const FAMHIST_CATEGORIES: [&str; 2] = ["Absent", "Present"];

pub const NUMERIC_COLUMNS: [&str; 8] = [
    "sbp",
    "tobacco",
    "ldl",
    "adiposity",
    "typea",
    "obesity",
    "alcohol",
    "age",
];

pub struct HeartRecord {}

impl HeartRecord {
    /// Dtypes of the raw CSV columns. The leading row index column is not
    /// listed; its name varies between copies of the dataset.
    pub fn raw_schema() -> Schema {
        Schema::from_iter(vec![
            Field::new("sbp", DataType::Float64),
            Field::new("tobacco", DataType::Float64),
            Field::new("ldl", DataType::Float64),
            Field::new("adiposity", DataType::Float64),
            Field::new(CATEGORICAL_COLUMN, DataType::Utf8),
            Field::new("typea", DataType::Int64),
            Field::new("obesity", DataType::Float64),
            Field::new("alcohol", DataType::Float64),
            Field::new("age", DataType::Int64),
            Field::new(TARGET_COLUMN, DataType::Int32),
        ])
    }

    /// Columns every loaded frame must carry before encoding.
    pub fn required_columns() -> Vec<&'static str> {
        let mut columns = NUMERIC_COLUMNS.to_vec();
        columns.push(CATEGORICAL_COLUMN);
        columns.push(TARGET_COLUMN);
        columns
    }

    /// Model inputs after encoding: the numeric columns followed by one
    /// indicator per `famhist` category.
    pub fn feature_columns() -> Vec<String> {
        NUMERIC_COLUMNS
            .iter()
            .map(|name| name.to_string())
            .chain(
                FAMHIST_CATEGORIES
                    .iter()
                    .map(|value| indicator_name(CATEGORICAL_COLUMN, value)),
            )
            .collect()
    }
}
