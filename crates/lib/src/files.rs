//! # Flat Files
//!
//! Reading and writing extracted tables as CSV or Parquet.
//!
//! - CSV: a header row followed by one record per row. NULL cells are written
//!   as empty fields and empty fields read back as NULL.
//! - Parquet: one nullable UTF-8 column per table column, in a single row group
//!   written by the Arrow writer. Any column type is accepted on read and
//!   rendered to text with Arrow's display formatting.

use crate::types::{ExtractedTable, FlatFileFormat};
use arrow_array::{Array, ArrayRef, RecordBatch, StringArray};
use arrow_schema::{ArrowError, DataType, Field, Schema};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::errors::ParquetError;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Custom error types for flat-file reading and writing.
#[derive(Error, Debug)]
pub enum FlatFileError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),
    #[error("Unsupported flat file: '{0}'")]
    Unsupported(String),
}

/// Writes `table` to `path` in the requested format.
pub fn write_table(
    table: &ExtractedTable,
    path: &Path,
    format: FlatFileFormat,
) -> Result<(), FlatFileError> {
    match format {
        FlatFileFormat::Csv => write_csv(table, path),
        FlatFileFormat::Parquet => write_parquet(table, path),
    }
}

/// Reads a table back, choosing the format from the file extension.
///
/// The table name is the file stem (`Sales.csv` -> `Sales`).
pub fn read_table(path: &Path) -> Result<ExtractedTable, FlatFileError> {
    let format = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(FlatFileFormat::from_extension)
        .ok_or_else(|| FlatFileError::Unsupported(path.display().to_string()))?;
    match format {
        FlatFileFormat::Csv => read_csv(path),
        FlatFileFormat::Parquet => read_parquet(path),
    }
}

pub fn write_csv(table: &ExtractedTable, path: &Path) -> Result<(), FlatFileError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))?;
    }
    writer.flush().map_err(|source| FlatFileError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(())
}

pub fn read_csv(path: &Path) -> Result<ExtractedTable, FlatFileError> {
    let mut reader = csv::Reader::from_path(path)?;
    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut table = ExtractedTable::new(table_name_from_path(path), columns);

    for record in reader.records() {
        let record = record?;
        let row = record
            .iter()
            .map(|field| {
                if field.is_empty() {
                    None
                } else {
                    Some(field.to_string())
                }
            })
            .collect();
        table.rows.push(row);
    }
    Ok(table)
}

pub fn write_parquet(table: &ExtractedTable, path: &Path) -> Result<(), FlatFileError> {
    let fields: Vec<Field> = table
        .columns
        .iter()
        .map(|name| Field::new(name, DataType::Utf8, true))
        .collect();
    let schema = Arc::new(Schema::new(fields));

    let arrays: Vec<ArrayRef> = (0..table.columns.len())
        .map(|index| Arc::new(StringArray::from_iter(table.column_values(index))) as ArrayRef)
        .collect();
    let batch = RecordBatch::try_new(schema.clone(), arrays)?;

    let file = File::create(path).map_err(|source| FlatFileError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

pub fn read_parquet(path: &Path) -> Result<ExtractedTable, FlatFileError> {
    let file = File::open(path).map_err(|source| FlatFileError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().to_string())
        .collect();
    let reader = builder.build()?;

    let mut table = ExtractedTable::new(table_name_from_path(path), columns);
    for batch in reader {
        let batch = batch?;
        for row_index in 0..batch.num_rows() {
            let mut row = Vec::with_capacity(batch.num_columns());
            for column in batch.columns() {
                row.push(cell_to_string(column.as_ref(), row_index)?);
            }
            table.rows.push(row);
        }
    }
    Ok(table)
}

fn cell_to_string(array: &dyn Array, row: usize) -> Result<Option<String>, ArrowError> {
    if array.is_null(row) {
        return Ok(None);
    }
    if let Some(strings) = array.as_any().downcast_ref::<StringArray>() {
        return Ok(Some(strings.value(row).to_string()));
    }
    arrow_cast::display::array_value_to_string(array, row).map(Some)
}

fn table_name_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}
