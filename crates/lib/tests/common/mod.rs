#![allow(dead_code)]
//! # Common Test Utilities
//!
//! Mock providers shared by the integration tests, so indexing and answering
//! can be exercised without a warehouse, an embeddings server or a model.

use async_trait::async_trait;
use dotenvy::dotenv;
use std::collections::HashMap;
use std::sync::{Arc, Once, RwLock};
use tablerag::providers::ai::{AiProvider, Embedder};
use tablerag::providers::warehouse::{Warehouse, WarehouseError};
use tablerag::{ExtractedTable, PromptError};

static INIT: Once = Once::new();

/// Initializes the tracing subscriber and loads .env for tests.
pub fn setup_tracing() {
    INIT.call_once(|| {
        dotenv().ok();
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

/// Builds a table from string literals; `""` becomes NULL.
pub fn table(name: &str, columns: &[&str], rows: &[&[&str]]) -> ExtractedTable {
    let mut table = ExtractedTable::new(name, columns.iter().map(|c| c.to_string()).collect());
    table.rows = rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|cell| (!cell.is_empty()).then(|| cell.to_string()))
                .collect()
        })
        .collect();
    table
}

// --- Mock AI Provider ---

#[derive(Clone, Debug)]
pub struct MockAiProvider {
    pub call_history: Arc<RwLock<Vec<(String, String)>>>,
    pub responses: Arc<RwLock<Vec<String>>>,
}

impl MockAiProvider {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            call_history: Arc::new(RwLock::new(Vec::new())),
            responses: Arc::new(RwLock::new(responses.into_iter().rev().collect())),
        }
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.call_history.read().unwrap().clone()
    }
}

#[async_trait]
impl AiProvider for MockAiProvider {
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String, PromptError> {
        self.call_history
            .write()
            .unwrap()
            .push((system_prompt.to_string(), user_prompt.to_string()));

        if let Some(response) = self.responses.write().unwrap().pop() {
            Ok(response)
        } else {
            Ok("Default mock response".to_string())
        }
    }
}

// --- Mock Embedder ---

pub const MOCK_DIMENSIONS: usize = 16;

/// A deterministic bag-of-words embedder.
///
/// Every word is hashed into one of [`MOCK_DIMENSIONS`] buckets, so texts that
/// share words end up close under cosine distance. Each call records its batch size.
#[derive(Clone, Debug)]
pub struct MockEmbedder {
    model: String,
    pub batches: Arc<RwLock<Vec<usize>>>,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self::with_model("mock-embed")
    }

    pub fn with_model(model: &str) -> Self {
        Self {
            model: model.to_string(),
            batches: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn call_count(&self) -> usize {
        self.batches.read().unwrap().len()
    }

    pub fn vector_for(text: &str) -> Vec<f32> {
        let mut vector = vec![0.01_f32; MOCK_DIMENSIONS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let digest = md5::compute(word.to_lowercase());
            vector[digest.0[0] as usize % MOCK_DIMENSIONS] += 1.0;
        }
        vector
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, PromptError> {
        self.batches.write().unwrap().push(inputs.len());
        Ok(inputs.iter().map(|text| Self::vector_for(text)).collect())
    }
}

// --- Mock Warehouse ---

#[derive(Clone, Debug, Default)]
pub struct MockWarehouse {
    pub tables: HashMap<String, ExtractedTable>,
    /// Fetching this table fails with a query error.
    pub failing_table: Option<String>,
    pub fetched: Arc<RwLock<Vec<String>>>,
}

impl MockWarehouse {
    pub fn new(tables: Vec<ExtractedTable>) -> Self {
        Self {
            tables: tables.into_iter().map(|t| (t.name.clone(), t)).collect(),
            ..Default::default()
        }
    }

    pub fn failing_on(mut self, table: &str) -> Self {
        self.failing_table = Some(table.to_string());
        self
    }
}

#[async_trait]
impl Warehouse for MockWarehouse {
    fn name(&self) -> &str {
        "MockWarehouse"
    }

    async fn fetch_table(&self, table: &str) -> Result<ExtractedTable, WarehouseError> {
        self.fetched.write().unwrap().push(table.to_string());
        if self.failing_table.as_deref() == Some(table) {
            return Err(WarehouseError::Query(format!("table '{table}' is unavailable")));
        }
        self.tables
            .get(table)
            .cloned()
            .ok_or_else(|| WarehouseError::Query(format!("table '{table}' not found")))
    }
}
