//! Ground-truth labels from CSV tables

use crate::error::{NliError, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// Read a header-first CSV table
pub fn load_label_table(dir: &Path, filename: &str) -> Result<DataFrame> {
    let path = dir.join(filename);
    let file = File::open(&path).map_err(|e| NliError::from_io(&path, e))?;

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(100))
        .into_reader_with_file_handle(file)
        .finish()
        .map_err(|e| NliError::DataFormat {
            path: path.clone(),
            line: 0,
            reason: e.to_string(),
        })?;

    debug!(path = %path.display(), rows = df.height(), cols = df.width(), "Read label table");
    Ok(df)
}

/// Extract a column as row-ordered string labels
pub fn label_column(df: &DataFrame, column: &str) -> Result<Vec<String>> {
    let series = df
        .column(column)
        .map_err(|_| NliError::FeatureNotFound(column.to_string()))?;
    let as_text = series.cast(&DataType::String)?;

    as_text
        .str()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            value.map(str::to_string).ok_or_else(|| {
                NliError::DataError(format!("missing {} value in row {}", column, row))
            })
        })
        .collect()
}

/// Read a table and return its label column
pub fn load_labels(dir: &Path, filename: &str, column: &str) -> Result<Vec<String>> {
    let df = load_label_table(dir, filename)?;
    label_column(&df, column)
}
