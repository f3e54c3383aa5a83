//! # Warehouse Providers
//!
//! A warehouse is anything that can return the full contents of a named table.
//! Extraction only ever issues `SELECT *`, so the trait is deliberately narrow.

#[cfg(feature = "bigquery")]
pub mod bigquery;

use crate::types::ExtractedTable;
use async_trait::async_trait;
use dyn_clone::DynClone;
use regex::Regex;
use std::fmt::Debug;
use thiserror::Error;

#[cfg(feature = "bigquery")]
pub use bigquery::BigQueryWarehouse;

/// Errors raised while connecting to or querying the warehouse.
#[derive(Error, Debug)]
pub enum WarehouseError {
    #[error("Failed to connect to the warehouse: {0}")]
    Connection(String),
    #[error("Warehouse query failed: {0}")]
    Query(String),
    #[error("Invalid table name: '{0}'")]
    InvalidTableName(String),
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

/// A source of whole tables.
#[async_trait]
pub trait Warehouse: Send + Sync + Debug + DynClone {
    /// Returns the name of the warehouse (e.g., "BigQuery").
    fn name(&self) -> &str;

    /// Runs `SELECT *` against `table` and returns every row.
    async fn fetch_table(&self, table: &str) -> Result<ExtractedTable, WarehouseError>;
}

dyn_clone::clone_trait_object!(Warehouse);

/// Rejects anything that is not a plain SQL identifier.
///
/// Table names end up interpolated into `SELECT * FROM ...`, so only
/// letters, digits and underscores are allowed.
pub fn validate_table_name(table: &str) -> Result<(), WarehouseError> {
    let re = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$")?;
    if re.is_match(table) {
        Ok(())
    } else {
        Err(WarehouseError::InvalidTableName(table.to_string()))
    }
}

/// Renders a warehouse cell as text, keeping NULL distinct from the empty string.
pub(crate) fn json_cell_to_string(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}
