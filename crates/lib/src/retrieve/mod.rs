//! # Retrieval and Answering
//!
//! Answers a question in up to five steps:
//! 1.  **Table mentions**: regex extraction of table names from the question.
//! 2.  **Similarity search**: top-k documents for the question embedding. When
//!     tables are named, the search is widened and rows from those tables are
//!     moved to the front before truncating to k.
//! 3.  **Schema context**: schema documents of the named tables are prepended.
//! 4.  **Column shortcut**: a column question about exactly one known table is
//!     answered straight from its schema document, without the model.
//! 5.  **Generation**: otherwise the context and question are rendered into the
//!     prompt template and sent to the model.

pub mod question;

use crate::cache::{CacheError, QueryCache};
use crate::constants::{DEFAULT_TOP_K, DEFAULT_WIDEN_FACTOR};
use crate::errors::PromptError;
use crate::prompts::{render_answer_prompt, DEFAULT_ANSWER_PROMPT};
use crate::providers::ai::{AiProvider, Embedder};
use crate::providers::db::{StoreError, VectorStore};
use crate::types::{Document, DocumentKind, SearchResult};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

pub use question::QuestionAnalyzer;

/// Custom error types for the retrieval process.
#[derive(Error, Debug)]
pub enum RetrieveError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Embedding generation failed: {0}")]
    Embedding(PromptError),
    #[error("Language model call failed: {0}")]
    Generation(PromptError),
    #[error("Query cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
    #[error("Embedding API returned no vector for the question")]
    EmptyEmbedding,
}

/// Tuning knobs for retrieval.
#[derive(Debug, Clone)]
pub struct RetrieveOptions {
    pub top_k: usize,
    pub widen_factor: usize,
    pub prompt_template: String,
}

impl Default for RetrieveOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            widen_factor: DEFAULT_WIDEN_FACTOR,
            prompt_template: DEFAULT_ANSWER_PROMPT.to_string(),
        }
    }
}

/// Where an answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerSource {
    /// Listed from a schema document without calling the model.
    ColumnListing,
    Model,
    Cache,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
    pub source: AnswerSource,
}

/// The context assembled for one question.
#[derive(Debug, Clone, Default)]
pub struct RetrievedContext {
    pub table_names: Vec<String>,
    /// Schema documents matching `table_names`, in mention order.
    pub schemas: Vec<Document>,
    pub results: Vec<SearchResult>,
}

impl RetrievedContext {
    /// Renders schemas first, then each retrieved document under its id.
    pub fn render(&self) -> String {
        let mut sections: Vec<String> = self.schemas.iter().map(|d| d.content.clone()).collect();
        sections.extend(
            self.results
                .iter()
                .map(|r| format!("[{}]\n{}", r.document.id, r.document.content)),
        );
        sections.join("\n\n")
    }
}

/// Owns everything needed to answer questions.
#[derive(Debug)]
pub struct Retriever {
    store: VectorStore,
    embedder: Box<dyn Embedder>,
    ai_provider: Box<dyn AiProvider>,
    analyzer: QuestionAnalyzer,
    options: RetrieveOptions,
    cache: Option<QueryCache>,
}

impl Retriever {
    pub fn new(
        store: VectorStore,
        embedder: Box<dyn Embedder>,
        ai_provider: Box<dyn AiProvider>,
        options: RetrieveOptions,
    ) -> Result<Self, RetrieveError> {
        Ok(Self {
            store,
            embedder,
            ai_provider,
            analyzer: QuestionAnalyzer::new()?,
            options,
            cache: None,
        })
    }

    /// Serves and records answers through the cache file at `path`.
    pub fn with_cache(mut self, path: impl AsRef<Path>) -> Result<Self, RetrieveError> {
        self.cache = Some(QueryCache::load(path.as_ref())?);
        Ok(self)
    }

    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    /// Gives the store back, e.g. for teardown.
    pub fn into_store(self) -> VectorStore {
        self.store
    }

    /// Finds schema documents whose file stem equals one of `table_names`.
    async fn matching_schemas(&self, table_names: &[String]) -> Result<Vec<Document>, RetrieveError> {
        if table_names.is_empty() {
            return Ok(Vec::new());
        }
        let all_schemas = self.store.documents_of_kind(DocumentKind::Schema).await?;
        let mut matched = Vec::new();
        for name in table_names {
            if let Some(doc) = all_schemas
                .iter()
                .find(|doc| source_matches_table(&doc.source, name))
            {
                matched.push(doc.clone());
            }
        }
        Ok(matched)
    }

    /// Runs steps 1 to 3: table mentions, similarity search, schema lookup.
    pub async fn retrieve(&self, question: &str) -> Result<RetrievedContext, RetrieveError> {
        let table_names = self.analyzer.extract_table_names(question);
        debug!(?table_names, "Table names mentioned in question");

        let query_vector = self
            .embedder
            .embed(&[question.to_string()])
            .await
            .map_err(RetrieveError::Embedding)?
            .into_iter()
            .next()
            .ok_or(RetrieveError::EmptyEmbedding)?;

        let top_k = self.options.top_k;
        let limit = if table_names.is_empty() {
            top_k
        } else {
            top_k * self.options.widen_factor.max(1)
        };
        let mut results = self.store.similarity_search(&query_vector, limit).await?;

        let schemas = self.matching_schemas(&table_names).await?;
        // Schemas are rendered separately; don't repeat them among the results.
        let schema_ids: Vec<&str> = schemas.iter().map(|d| d.id.as_str()).collect();
        results.retain(|r| !schema_ids.contains(&r.document.id.as_str()));

        if !table_names.is_empty() {
            // Stable sort: rows from named tables first, each group still by distance.
            results.sort_by_key(|r| {
                !table_names
                    .iter()
                    .any(|name| source_matches_table(&r.document.source, name))
            });
        }
        results.truncate(top_k);

        Ok(RetrievedContext {
            table_names,
            schemas,
            results,
        })
    }

    /// Answers a question, using the cache, the column shortcut or the model.
    pub async fn answer(&mut self, question: &str) -> Result<Answer, RetrieveError> {
        let question = question.trim();
        if let Some(cached) = self.cache.as_ref().and_then(|c| c.get(question)) {
            info!("Answer served from query cache");
            return Ok(Answer {
                text: cached.to_string(),
                source: AnswerSource::Cache,
            });
        }

        if let Some(answer) = self.column_listing(question).await? {
            return Ok(answer);
        }

        let context = self.retrieve(question).await?;
        let prompt = render_answer_prompt(&self.options.prompt_template, &context.render(), question);
        info!(
            "Sending question to model with {} schema(s) and {} document(s) of context",
            context.schemas.len(),
            context.results.len()
        );
        let text = self
            .ai_provider
            .generate("", &prompt)
            .await
            .map_err(RetrieveError::Generation)?;

        if let Some(cache) = self.cache.as_mut() {
            if let Err(e) = cache.insert(question, &text) {
                warn!("Failed to record answer in query cache: {e}");
            }
        }

        Ok(Answer {
            text,
            source: AnswerSource::Model,
        })
    }

    /// Answers "what are the columns of table X" straight from X's schema document.
    ///
    /// Returns `None` unless the question is about columns, names exactly one
    /// table, and that table has a schema document.
    pub async fn column_listing(&self, question: &str) -> Result<Option<Answer>, RetrieveError> {
        if !self.analyzer.is_column_question(question) {
            return Ok(None);
        }
        let table_names = self.analyzer.extract_table_names(question);
        let [table] = table_names.as_slice() else {
            return Ok(None);
        };

        let Some(schema) = self.matching_schemas(std::slice::from_ref(table)).await?.pop() else {
            return Ok(None);
        };
        let columns = self.analyzer.extract_column_names(&schema.content);
        if columns.is_empty() {
            return Ok(None);
        }

        info!("Listing columns of '{table}' from its schema document");
        let mut text = format!("The table {table} has {} columns:", columns.len());
        for column in &columns {
            text.push_str(&format!("\n- {column}"));
        }
        Ok(Some(Answer {
            text,
            source: AnswerSource::ColumnListing,
        }))
    }
}

/// True when `source` (e.g. `Sales.csv`) belongs to `table` (e.g. `sales`).
fn source_matches_table(source: &str, table: &str) -> bool {
    let stem = source.rsplit_once('.').map_or(source, |(stem, _)| stem);
    stem.eq_ignore_ascii_case(table)
}
