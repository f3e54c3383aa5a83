//! # Command Handlers
//!
//! Wires the configuration into the library's providers and runs each
//! pipeline step.

use crate::chat;
use crate::config::AppConfig;
use anyhow::{Context, Result};
use tablerag::providers::ai::{LocalAiProvider, OpenAiEmbedder};
use tablerag::providers::warehouse::BigQueryWarehouse;
use tablerag::{
    build_index, extract_tables, teardown, ExtractReport, IndexOptions, IndexOutcome,
    RetrieveOptions, Retriever, VectorStore,
};
use tracing::{error, info, warn};

/// Treats an empty string (e.g. an unset `${VAR}`) as absent.
fn non_empty(value: &Option<String>) -> Option<String> {
    value.clone().filter(|v| !v.trim().is_empty())
}

fn build_embedder(config: &AppConfig) -> Result<OpenAiEmbedder> {
    Ok(OpenAiEmbedder::new(
        config.embedding.api_url.clone(),
        config.embedding.model_name.clone(),
        non_empty(&config.embedding.api_key),
    )?)
}

fn build_ai_provider(config: &AppConfig) -> Result<LocalAiProvider> {
    Ok(LocalAiProvider::new(
        config.llm.api_url.clone(),
        non_empty(&config.llm.api_key),
        Some(config.llm.model_name.clone()),
    )?)
}

async fn open_store(config: &AppConfig) -> Result<VectorStore> {
    VectorStore::open(&config.index.store_dir, &config.index.collection)
        .await
        .with_context(|| {
            format!(
                "Failed to open vector store at '{}'",
                config.index.store_dir.display()
            )
        })
}

/// Pulls every configured table into the configured data directory.
pub async fn extract(config: &AppConfig) -> Result<Vec<ExtractReport>> {
    let warehouse = &config.warehouse;
    if warehouse.project_id.is_empty() || warehouse.dataset.is_empty() {
        anyhow::bail!(
            "warehouse.project_id and warehouse.dataset must be set (TABLERAG_WAREHOUSE__PROJECT_ID, TABLERAG_WAREHOUSE__DATASET)"
        );
    }

    let client = BigQueryWarehouse::new(
        warehouse.project_id.clone(),
        warehouse.dataset.clone(),
        non_empty(&warehouse.key_file).as_deref(),
    )
    .await?;

    let output_dir = config.extract.data_dir();
    let reports = extract_tables(
        &client,
        &warehouse.tables,
        output_dir,
        config.extract.format,
    )
    .await?;

    for report in &reports {
        println!(
            "{}: {} rows x {} columns -> {}",
            report.table,
            report.rows,
            report.columns,
            report.path.display()
        );
    }
    println!("Data extraction completed.");
    Ok(reports)
}

/// Builds the index, clearing the query cache when the collection changes.
pub async fn index(config: &AppConfig, force: bool) -> Result<IndexOutcome> {
    let store = open_store(config).await?;
    let embedder = build_embedder(config)?;

    let mut options = IndexOptions::new(config.extract.data_dir());
    options.batch_size = config.index.batch_size;
    options.schema_docs = config.index.schema_docs;
    options.force = force;
    options.cache_file = Some(config.cache_file.clone());

    let outcome = build_index(&store, &embedder, &options).await?;
    match &outcome {
        IndexOutcome::Skipped { .. } => {
            println!(
                "Collection '{}' is up to date. Skipping rebuild.",
                config.index.collection
            );
        }
        IndexOutcome::Built {
            tables, documents, ..
        } => {
            println!(
                "Indexed {documents} documents from {tables} tables into '{}'.",
                config.index.collection
            );
        }
    }

    if let Err(e) = store.close().await {
        warn!("Failed to close vector store cleanly: {e}");
    }
    Ok(outcome)
}

/// Opens the chat window; tears the store and cache down on exit.
pub async fn chat(config: &AppConfig) -> Result<()> {
    let store = open_store(config).await?;
    let document_count = store.count().await?;
    if document_count == 0 {
        warn!("Collection '{}' is empty", config.index.collection);
    }

    let options = RetrieveOptions {
        top_k: config.retrieve.top_k,
        widen_factor: config.retrieve.widen_factor,
        prompt_template: config.llm.prompt_template.clone(),
    };
    let retriever = Retriever::new(
        store,
        Box::new(build_embedder(config)?),
        Box::new(build_ai_provider(config)?),
        options,
    )?
    .with_cache(&config.cache_file)?;

    info!("Starting chat over {document_count} documents");
    let retriever = chat::run(retriever, document_count).await?;

    teardown(retriever.into_store(), &config.cache_file).await;
    Ok(())
}

/// Runs extract, index and chat in order, stopping at the first failure.
pub async fn run(config: &AppConfig) -> Result<()> {
    info!("Running data extraction...");
    if let Err(e) = extract(config).await {
        error!("Data extraction failed: {e:#}");
        return Err(e.context("Data extraction failed"));
    }

    info!("Running vector index build...");
    if let Err(e) = index(config, false).await {
        error!("Index build failed: {e:#}");
        return Err(e.context("Index build failed"));
    }

    info!("Launching chat...");
    chat(config).await
}

/// Closes the store and deletes the query cache.
pub async fn clean(config: &AppConfig) -> Result<()> {
    let store = open_store(config).await?;
    teardown(store, &config.cache_file).await;
    println!("Closed vector store and removed '{}'.", config.cache_file.display());
    Ok(())
}
