use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A fully materialized result set: column names plus rows of optional cells.
///
/// `None` marks a SQL NULL. This is the shape handed from the warehouse to the
/// flat-file writers, and from the flat-file readers to the indexer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedTable {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl ExtractedTable {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Iterates over the cells of one column, top to bottom.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = Option<&str>> {
        self.rows
            .iter()
            .map(move |row| row.get(index).and_then(|cell| cell.as_deref()))
    }
}

/// The on-disk format used for extracted tables.
#[derive(Default, Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FlatFileFormat {
    #[default]
    Csv,
    Parquet,
}

impl FlatFileFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            FlatFileFormat::Csv => "csv",
            FlatFileFormat::Parquet => "parquet",
        }
    }

    /// Maps a file extension back to a format, ignoring case.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(FlatFileFormat::Csv),
            "parquet" => Some(FlatFileFormat::Parquet),
            _ => None,
        }
    }
}

impl fmt::Display for FlatFileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Distinguishes synthesized schema summaries from per-row documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Schema,
    Row,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Schema => "schema",
            DocumentKind::Row => "row",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "schema" => Some(DocumentKind::Schema),
            "row" => Some(DocumentKind::Row),
            _ => None,
        }
    }
}

/// A single entry of the vector store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// `{filename}_{row_index}` for rows, `schema_{filename}` for schemas.
    pub id: String,
    pub kind: DocumentKind,
    /// The flat file the document was built from, e.g. `Sales.csv`.
    pub source: String,
    pub content: String,
    pub metadata: BTreeMap<String, String>,
}

/// A document returned by a similarity search, with its cosine distance.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub document: Document,
    pub distance: f64,
}
