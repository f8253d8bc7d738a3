use std::fs::File;
use std::path::Path;

use log::{debug, info};
use polars::prelude::*;
use polars_io::parquet::{ParquetReader, ParquetWriter};

use crate::error::{HeartAppError, Result};
use crate::records::HeartRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    Parquet,
}

impl InputFormat {
    pub fn infer(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match extension.as_deref() {
            Some("csv") => Ok(InputFormat::Csv),
            Some("parquet") => Ok(InputFormat::Parquet),
            _ => Err(HeartAppError::InputFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

pub async fn read_parquet<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
    let file = File::open(path)?;

    Ok(ParquetReader::new(file).finish()?)
}

/// Reads the raw heart disease CSV: header row, comma separated. The leading
/// row index column is dropped and the remaining columns are cast to
/// [`HeartRecord::raw_schema`].
pub async fn read_csv<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
    let file = File::open(path)?;

    let df = CsvReader::new(file)
        .has_header(true)
        .with_delimiter(b',')
        .finish()?;

    apply_raw_schema(drop_index_column(df)?)
}

pub async fn write_csv<P: AsRef<Path>>(path: P, df: &mut DataFrame) -> Result<()> {
    let mut file = File::create(path)?;

    CsvWriter::new(&mut file).finish(df)?;

    Ok(())
}

pub async fn write_parquet<P: AsRef<Path>>(path: P, df: &mut DataFrame) -> Result<()> {
    let mut file = File::create(path)?;

    ParquetWriter::new(&mut file).finish(df)?;

    Ok(())
}

/// Loads a dataset, dispatching on the file extension, and checks that every
/// column of the heart record is present. The frame is narrowed to exactly
/// those columns, so row indexes and extra columns never reach encoding.
pub async fn load_dataset(path: &Path) -> Result<DataFrame> {
    let df = match InputFormat::infer(path)? {
        InputFormat::Csv => read_csv(path).await?,
        InputFormat::Parquet => apply_raw_schema(read_parquet(path).await?)?,
    };

    let names = df.get_column_names();
    for required in HeartRecord::required_columns() {
        if !names.contains(&required) {
            return Err(HeartAppError::MissingColumn {
                column: required.to_string(),
            });
        }
    }
    if df.height() == 0 {
        return Err(HeartAppError::EmptyDataset);
    }
    let df = df.select(HeartRecord::required_columns())?;

    info!(
        "loaded {} rows x {} columns from {}",
        df.height(),
        df.width(),
        path.display()
    );
    Ok(df)
}

/// Drops the first column when it is not a heart record column. Copies of
/// the dataset name it `row.names`, an empty string, or nothing at all.
pub fn drop_index_column(df: DataFrame) -> Result<DataFrame> {
    let first = match df.get_column_names().first() {
        Some(name) => name.to_string(),
        None => return Err(HeartAppError::EmptyDataset),
    };

    if HeartRecord::required_columns().contains(&first.as_str()) {
        return Ok(df);
    }
    debug!("dropping row index column {:?}", first);
    Ok(df.drop(&first)?)
}

/// Casts the heart record columns present in `df` to their raw dtypes.
/// Absent columns are left for [`load_dataset`] to report.
pub fn apply_raw_schema(mut df: DataFrame) -> Result<DataFrame> {
    let schema = HeartRecord::raw_schema();
    for (name, dtype) in schema.iter() {
        let cast = match df.column(name) {
            Ok(column) if column.dtype() != dtype => column.cast(dtype)?,
            _ => continue,
        };
        df.with_column(cast)?;
    }
    Ok(df)
}
