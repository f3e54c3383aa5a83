//! # Retrieval and Answering Tests
//!
//! Builds a small index with the mock embedder, then answers questions with a
//! mock model to check context assembly, the column shortcut and the cache.

mod common;

use crate::common::{setup_tracing, table, MockAiProvider, MockEmbedder};
use std::path::Path;
use tablerag::files::write_csv;
use tablerag::{
    build_index, AnswerSource, IndexOptions, RetrieveOptions, Retriever, VectorStore,
};
use tempfile::{tempdir, TempDir};

async fn indexed_store(dir: &Path, schema_docs: bool) -> VectorStore {
    let data_dir = dir.join("csv_data");
    std::fs::create_dir_all(&data_dir).unwrap();
    write_csv(
        &table(
            "Sales",
            &["sale_id", "store_id", "total"],
            &[
                &["1", "10", "19.99"],
                &["2", "11", "5.00"],
                &["3", "10", "120.50"],
                &["4", "12", ""],
            ],
        ),
        &data_dir.join("Sales.csv"),
    )
    .unwrap();
    write_csv(
        &table(
            "Stores",
            &["store_id", "city"],
            &[&["10", "Lisbon"], &["11", "Porto"], &["12", "Faro"]],
        ),
        &data_dir.join("Stores.csv"),
    )
    .unwrap();

    let store = VectorStore::open(dir.join("vector_db"), "table_rows")
        .await
        .unwrap();
    let mut options = IndexOptions::new(&data_dir);
    options.schema_docs = schema_docs;
    build_index(&store, &MockEmbedder::new(), &options)
        .await
        .unwrap();
    store
}

struct Fixture {
    _dir: TempDir,
    retriever: Retriever,
    ai: MockAiProvider,
    embedder: MockEmbedder,
}

async fn fixture(responses: Vec<&str>, options: RetrieveOptions, schema_docs: bool) -> Fixture {
    setup_tracing();
    let dir = tempdir().unwrap();
    let store = indexed_store(dir.path(), schema_docs).await;
    let ai = MockAiProvider::new(responses.into_iter().map(String::from).collect());
    let embedder = MockEmbedder::new();
    let retriever = Retriever::new(
        store,
        Box::new(embedder.clone()),
        Box::new(ai.clone()),
        options,
    )
    .unwrap();
    Fixture {
        _dir: dir,
        retriever,
        ai,
        embedder,
    }
}

/// Column questions about one indexed table never reach the model.
#[tokio::test]
async fn test_column_question_is_answered_from_schema() {
    let mut f = fixture(vec![], RetrieveOptions::default(), true).await;

    let answer = f
        .retriever
        .answer("What are the columns of table Sales?")
        .await
        .unwrap();

    assert_eq!(answer.source, AnswerSource::ColumnListing);
    assert_eq!(
        answer.text,
        "The table Sales has 3 columns:\n- sale_id\n- store_id\n- total"
    );
    assert!(f.ai.calls().is_empty());
    assert_eq!(f.embedder.call_count(), 0);
}

/// Without schema documents the shortcut has nothing to list from.
#[tokio::test]
async fn test_column_question_without_schema_uses_model() {
    let mut f = fixture(
        vec!["sale_id, store_id and total"],
        RetrieveOptions::default(),
        false,
    )
    .await;

    let answer = f
        .retriever
        .answer("What are the columns of table Sales?")
        .await
        .unwrap();

    assert_eq!(answer.source, AnswerSource::Model);
    assert_eq!(answer.text, "sale_id, store_id and total");
    assert_eq!(f.ai.calls().len(), 1);
}

/// Named tables get their schema prepended and their rows moved to the front.
#[tokio::test]
async fn test_named_table_context_and_prompt() {
    let options = RetrieveOptions {
        top_k: 2,
        widen_factor: 10,
        ..Default::default()
    };
    let mut f = fixture(vec!["Store 10 sold the most."], options, true).await;
    let question = "Which store sold the most in table Sales?";

    let context = f.retriever.retrieve(question).await.unwrap();
    assert_eq!(context.table_names, vec!["Sales"]);
    assert_eq!(context.schemas.len(), 1);
    assert_eq!(context.schemas[0].id, "schema_Sales.csv");
    assert_eq!(context.results.len(), 2);
    assert!(context
        .results
        .iter()
        .all(|r| r.document.source == "Sales.csv"));

    let answer = f.retriever.answer(question).await.unwrap();
    assert_eq!(answer.source, AnswerSource::Model);
    assert_eq!(answer.text, "Store 10 sold the most.");

    let calls = f.ai.calls();
    assert_eq!(calls.len(), 1);
    let (system, user) = &calls[0];
    assert!(system.is_empty());
    assert!(user.contains("Relevant data: Table: Sales\nColumn: sale_id (type: INTEGER, sample: 1)"));
    assert!(user.ends_with(&format!("Question: {question}\n")));
    assert!(!user.contains("{context}"));
}

#[tokio::test]
async fn test_unnamed_question_has_no_schema_context() {
    let options = RetrieveOptions {
        top_k: 3,
        ..Default::default()
    };
    let f = fixture(vec![], options, true).await;

    let context = f.retriever.retrieve("Where is Porto?").await.unwrap();

    assert!(context.table_names.is_empty());
    assert!(context.schemas.is_empty());
    assert_eq!(context.results.len(), 3);
    let distances: Vec<f64> = context.results.iter().map(|r| r.distance).collect();
    assert!(distances.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn test_custom_prompt_template() {
    let options = RetrieveOptions {
        prompt_template: "Q: {question}".to_string(),
        ..Default::default()
    };
    let mut f = fixture(vec!["ok"], options, true).await;

    f.retriever.answer("  How many stores?  ").await.unwrap();

    assert_eq!(f.ai.calls()[0].1, "Q: How many stores?");
}

/// The second identical question is served from the cache file.
#[tokio::test]
async fn test_answers_are_cached() {
    let f = fixture(vec!["Lisbon"], RetrieveOptions::default(), true).await;
    let cache_path = f._dir.path().join("query_cache.json");
    let mut retriever = f.retriever.with_cache(&cache_path).unwrap();

    let first = retriever.answer("Where is store 10?").await.unwrap();
    let second = retriever.answer("where is STORE 10?").await.unwrap();

    assert_eq!(first.source, AnswerSource::Model);
    assert_eq!(second.source, AnswerSource::Cache);
    assert_eq!(second.text, "Lisbon");
    assert_eq!(f.ai.calls().len(), 1);
    assert!(cache_path.exists());
}
