//! # Document Builders
//!
//! Turns an [`ExtractedTable`] into the documents stored in the vector index:
//! one schema summary per table and one document per row.

use crate::types::{Document, DocumentKind, ExtractedTable};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;

const DATETIME_FORMATS: [&str; 3] = ["%-m/%-d/%Y %-H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%-m/%-d/%Y"];

/// Metadata keys every row document carries besides its columns.
pub const RESERVED_ROW_KEYS: [&str; 2] = ["source", "row_index"];

/// The id of the schema document for `filename`.
pub fn schema_document_id(filename: &str) -> String {
    format!("schema_{filename}")
}

/// Builds the schema summary for a table.
///
/// The content has a `Table:` header and exactly one `Column:` line per
/// column, carrying the inferred type and the first non-null value as a sample.
pub fn build_schema_document(filename: &str, table: &ExtractedTable) -> Document {
    let mut lines = Vec::with_capacity(table.columns.len() + 1);
    lines.push(format!("Table: {}", table.name));

    for (index, column) in table.columns.iter().enumerate() {
        let column_type = infer_column_type(table.column_values(index));
        let sample = table
            .column_values(index)
            .flatten()
            .next()
            .unwrap_or("NULL");
        lines.push(format!(
            "Column: {column} (type: {column_type}, sample: {sample})"
        ));
    }

    let mut metadata = BTreeMap::new();
    metadata.insert("type".to_string(), "schema".to_string());
    metadata.insert("source".to_string(), filename.to_string());

    Document {
        id: schema_document_id(filename),
        kind: DocumentKind::Schema,
        source: filename.to_string(),
        content: lines.join("\n"),
        metadata,
    }
}

/// Builds one document per row.
///
/// Content is `column: value` for every non-null cell, newline-joined. The
/// metadata keeps every column (nulls as empty strings) plus `source` and
/// `row_index`. A column whose name is one of those keys is stored as
/// `column.<name>`, which no SQL identifier can collide with.
pub fn build_row_documents(filename: &str, table: &ExtractedTable) -> Vec<Document> {
    table
        .rows
        .iter()
        .enumerate()
        .map(|(row_index, row)| {
            let mut content_lines = Vec::new();
            let mut metadata = BTreeMap::new();

            for (column, cell) in table.columns.iter().zip(row.iter()) {
                if let Some(value) = cell {
                    content_lines.push(format!("{column}: {value}"));
                }
                metadata.insert(column_metadata_key(column), cell.clone().unwrap_or_default());
            }
            metadata.insert("source".to_string(), filename.to_string());
            metadata.insert("row_index".to_string(), row_index.to_string());

            Document {
                id: format!("{filename}_{row_index}"),
                kind: DocumentKind::Row,
                source: filename.to_string(),
                content: content_lines.join("\n"),
                metadata,
            }
        })
        .collect()
}

fn column_metadata_key(column: &str) -> String {
    if RESERVED_ROW_KEYS.contains(&column) {
        format!("column.{column}")
    } else {
        column.to_string()
    }
}

/// Infers a column type from its non-null values.
///
/// Returns the narrowest of `INTEGER`, `REAL`, `BOOLEAN`, `DATETIME`, `DATE`
/// that every value parses as, falling back to `TEXT`. An all-null column is `TEXT`.
pub fn infer_column_type<'a>(values: impl Iterator<Item = Option<&'a str>>) -> &'static str {
    let values: Vec<&str> = values.flatten().map(str::trim).collect();
    if values.is_empty() {
        return "TEXT";
    }
    if values.iter().all(|v| v.parse::<i64>().is_ok()) {
        return "INTEGER";
    }
    if values.iter().all(|v| v.parse::<f64>().is_ok()) {
        return "REAL";
    }
    if values
        .iter()
        .all(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "false"))
    {
        return "BOOLEAN";
    }
    if values.iter().all(|v| {
        DATETIME_FORMATS
            .iter()
            .any(|fmt| NaiveDateTime::parse_from_str(v, fmt).is_ok())
    }) {
        return "DATETIME";
    }
    if values.iter().all(|v| {
        DATE_FORMATS
            .iter()
            .any(|fmt| NaiveDate::parse_from_str(v, fmt).is_ok())
    }) {
        return "DATE";
    }
    "TEXT"
}
