//! # Table Extraction
//!
//! Pulls every configured table out of the warehouse with `SELECT *` and writes
//! one flat file per table. Any failure aborts the whole run: there is no
//! per-table retry and no partial-success bookkeeping.

use crate::files::{write_table, FlatFileError};
use crate::providers::warehouse::{validate_table_name, Warehouse, WarehouseError};
use crate::types::FlatFileFormat;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info};

/// Custom error types for the extraction process.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Warehouse error while extracting '{table}': {source}")]
    Warehouse {
        table: String,
        source: WarehouseError,
    },
    #[error("Failed to write '{table}': {source}")]
    Write {
        table: String,
        source: FlatFileError,
    },
    #[error("Failed to create output directory '{path}': {source}")]
    OutputDir {
        path: String,
        source: std::io::Error,
    },
    #[error("No tables configured for extraction")]
    NoTables,
}

/// Summary of one extracted table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractReport {
    pub table: String,
    pub path: PathBuf,
    pub columns: usize,
    pub rows: usize,
}

/// Extracts `tables` from `warehouse` into `output_dir`.
///
/// Files are named `{table}.{csv|parquet}`. The first error stops the run.
pub async fn extract_tables(
    warehouse: &dyn Warehouse,
    tables: &[String],
    output_dir: &Path,
    format: FlatFileFormat,
) -> Result<Vec<ExtractReport>, ExtractError> {
    if tables.is_empty() {
        return Err(ExtractError::NoTables);
    }
    // Validate everything up front so a typo late in the list doesn't leave a half-written run.
    for table in tables {
        validate_table_name(table).map_err(|source| ExtractError::Warehouse {
            table: table.clone(),
            source,
        })?;
    }

    std::fs::create_dir_all(output_dir).map_err(|source| ExtractError::OutputDir {
        path: output_dir.display().to_string(),
        source,
    })?;

    info!(
        "Extracting {} tables from {} into '{}' as {format}",
        tables.len(),
        warehouse.name(),
        output_dir.display()
    );

    let mut reports = Vec::with_capacity(tables.len());
    for table in tables {
        let extracted = warehouse.fetch_table(table).await.map_err(|source| {
            error!("Extraction of '{table}' failed: {source}");
            ExtractError::Warehouse {
                table: table.clone(),
                source,
            }
        })?;

        let path = output_dir.join(format!("{table}.{}", format.extension()));
        write_table(&extracted, &path, format).map_err(|source| ExtractError::Write {
            table: table.clone(),
            source,
        })?;

        info!(
            "Data from '{table}' saved to '{}' ({} rows)",
            path.display(),
            extracted.rows.len()
        );
        reports.push(ExtractReport {
            table: table.clone(),
            path,
            columns: extracted.columns.len(),
            rows: extracted.rows.len(),
        });
    }

    Ok(reports)
}
