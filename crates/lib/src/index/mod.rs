//! # Index Building
//!
//! Reads the extracted flat files, turns them into documents, embeds them in
//! fixed-size batches and writes them to the vector store.
//!
//! A build is skipped when the store already records a marker matching the
//! current data (see [`marker`]); a skipped build performs no writes.

pub mod documents;
pub mod marker;

use crate::cache::QueryCache;
use crate::errors::PromptError;
use crate::files::read_table;
use crate::providers::ai::Embedder;
use crate::providers::db::{StoreError, VectorStore};
use crate::types::{Document, ExtractedTable};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

pub use documents::{build_row_documents, build_schema_document, schema_document_id};

/// Custom error types for the indexing process.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Embedding generation failed: {0}")]
    Embedding(#[from] PromptError),
    #[error("Failed to read data directory '{path}': {source}")]
    DataDir {
        path: String,
        source: std::io::Error,
    },
    #[error("Batch size must be greater than zero")]
    InvalidBatchSize,
}

/// Parameters of a build.
#[derive(Debug, Clone)]
pub struct IndexOptions {
    pub data_dir: PathBuf,
    pub batch_size: usize,
    /// Prefix each table's rows with a schema summary document.
    pub schema_docs: bool,
    /// Rebuild even if the marker matches.
    pub force: bool,
    /// Query cache to remove after a rebuild. Skipped builds leave it alone.
    pub cache_file: Option<PathBuf>,
}

impl IndexOptions {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            batch_size: crate::constants::DEFAULT_BATCH_SIZE,
            schema_docs: true,
            force: false,
            cache_file: None,
        }
    }
}

/// What a call to [`build_index`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexOutcome {
    /// The store already matched the data; nothing was written.
    Skipped { marker: String },
    Built {
        marker: String,
        tables: usize,
        documents: usize,
    },
}

/// Loads every flat file in `data_dir`, sorted by file name.
///
/// Files that fail to parse are logged and skipped. Returns `(filename, table)` pairs.
pub fn load_tables(data_dir: &Path) -> Result<Vec<(String, ExtractedTable)>, IndexError> {
    let files = marker::list_data_files(data_dir).map_err(|source| IndexError::DataDir {
        path: data_dir.display().to_string(),
        source,
    })?;

    let mut tables = Vec::with_capacity(files.len());
    for path in files {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        info!("Loading: {}", path.display());
        match read_table(&path) {
            Ok(table) => tables.push((filename, table)),
            Err(e) => warn!("Failed to read {filename}: {e}"),
        }
    }
    Ok(tables)
}

/// Builds all documents for the given tables: schema documents first, then rows.
pub fn build_documents(tables: &[(String, ExtractedTable)], schema_docs: bool) -> Vec<Document> {
    let mut documents = Vec::new();
    if schema_docs {
        documents.extend(
            tables
                .iter()
                .map(|(filename, table)| build_schema_document(filename, table)),
        );
    }
    for (filename, table) in tables {
        documents.extend(build_row_documents(filename, table));
    }
    documents
}

/// Builds (or skips rebuilding) the store's collection from `options.data_dir`.
pub async fn build_index(
    store: &VectorStore,
    embedder: &dyn Embedder,
    options: &IndexOptions,
) -> Result<IndexOutcome, IndexError> {
    if options.batch_size == 0 {
        return Err(IndexError::InvalidBatchSize);
    }

    let data_dir_error = |source: std::io::Error| IndexError::DataDir {
        path: options.data_dir.display().to_string(),
        source,
    };
    let files = marker::list_data_files(&options.data_dir).map_err(data_dir_error)?;
    let marker = marker::compute_marker(&files, embedder.model(), options.schema_docs)
        .map_err(data_dir_error)?;

    if !options.force && store.marker().await?.as_deref() == Some(marker.as_str()) {
        info!(
            "Vector DB collection '{}' is up to date. Skipping rebuild.",
            store.collection()
        );
        return Ok(IndexOutcome::Skipped { marker });
    }

    info!("Creating vector database collection '{}'...", store.collection());
    let tables = load_tables(&options.data_dir)?;
    let documents = build_documents(&tables, options.schema_docs);

    store.clear().await?;
    let mut inserted = 0;
    for (batch_number, batch) in documents.chunks(options.batch_size).enumerate() {
        let inputs: Vec<String> = batch.iter().map(|d| d.content.clone()).collect();
        let embeddings = embedder.embed(&inputs).await?;
        inserted += store.add_documents(batch, &embeddings).await?;
        info!(
            "Indexed batch {} ({inserted}/{} documents)",
            batch_number + 1,
            documents.len()
        );
    }
    store.set_marker(&marker, inserted).await?;

    // Cached answers were produced from the old data.
    if let Some(cache_path) = &options.cache_file {
        if let Err(e) = QueryCache::remove_file(cache_path) {
            warn!("Failed to clear query cache '{}' after rebuild: {e}", cache_path.display());
        }
    }

    info!(
        "Built collection '{}' from {} tables ({inserted} documents).",
        store.collection(),
        tables.len()
    );
    Ok(IndexOutcome::Built {
        marker,
        tables: tables.len(),
        documents: inserted,
    })
}

/// Closes the store and removes the query cache file.
///
/// Best-effort: every failure is logged and the teardown carries on.
pub async fn teardown(store: VectorStore, cache_path: &Path) {
    if let Err(e) = store.close().await {
        warn!("Failed to close vector store cleanly: {e}");
    }
    if let Err(e) = QueryCache::remove_file(cache_path) {
        warn!("Failed to remove query cache '{}': {e}", cache_path.display());
    }
}
