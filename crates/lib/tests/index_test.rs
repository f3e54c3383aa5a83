//! # Index Build Tests
//!
//! Builds a store from flat files with a mock embedder and verifies batching,
//! the rebuild marker, cache clearing, and teardown.

mod common;

use crate::common::{setup_tracing, table, MockEmbedder};
use std::path::Path;
use tablerag::files::write_csv;
use tablerag::index::load_tables;
use tablerag::{build_index, teardown, IndexError, IndexOptions, IndexOutcome, VectorStore};
use tempfile::tempdir;

fn write_fixture(data_dir: &Path) {
    std::fs::create_dir_all(data_dir).unwrap();
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
}

#[tokio::test]
async fn test_build_index_embeds_in_batches() {
    setup_tracing();
    let dir = tempdir().unwrap();
    let data_dir = dir.path().join("csv_data");
    write_fixture(&data_dir);
    let store = VectorStore::open(dir.path().join("vector_db"), "table_rows")
        .await
        .unwrap();
    let embedder = MockEmbedder::new();

    let mut options = IndexOptions::new(&data_dir);
    options.batch_size = 3;
    let outcome = build_index(&store, &embedder, &options).await.unwrap();

    // 2 schema documents + 4 + 3 rows.
    match outcome {
        IndexOutcome::Built {
            tables, documents, ..
        } => {
            assert_eq!(tables, 2);
            assert_eq!(documents, 9);
        }
        other => panic!("Expected a build, got {other:?}"),
    }
    assert_eq!(*embedder.batches.read().unwrap(), vec![3, 3, 3]);
    assert_eq!(store.count().await.unwrap(), 9);

    let row = store.get("Sales.csv_3").await.unwrap().unwrap();
    assert_eq!(row.content, "sale_id: 4\nstore_id: 12");
    assert!(store.get("schema_Stores.csv").await.unwrap().is_some());
}

/// A second build over unchanged data is skipped and writes nothing.
#[tokio::test]
async fn test_second_build_is_skipped() {
    setup_tracing();
    let dir = tempdir().unwrap();
    let data_dir = dir.path().join("csv_data");
    write_fixture(&data_dir);
    let store_dir = dir.path().join("vector_db");
    let embedder = MockEmbedder::new();
    let options = IndexOptions::new(&data_dir);

    let store = VectorStore::open(&store_dir, "table_rows").await.unwrap();
    let first = build_index(&store, &embedder, &options).await.unwrap();
    let IndexOutcome::Built { marker, .. } = first else {
        panic!("First build should not be skipped");
    };
    let calls_after_first = embedder.call_count();
    store.close().await.unwrap();

    // Reopen to make sure the marker was persisted.
    let store = VectorStore::open(&store_dir, "table_rows").await.unwrap();
    let second = build_index(&store, &embedder, &options).await.unwrap();

    assert_eq!(second, IndexOutcome::Skipped { marker });
    assert_eq!(embedder.call_count(), calls_after_first);
    assert_eq!(store.count().await.unwrap(), 9);
}

#[tokio::test]
async fn test_changed_data_triggers_rebuild() {
    setup_tracing();
    let dir = tempdir().unwrap();
    let data_dir = dir.path().join("csv_data");
    write_fixture(&data_dir);
    let store = VectorStore::open(dir.path().join("vector_db"), "table_rows")
        .await
        .unwrap();
    let embedder = MockEmbedder::new();
    let options = IndexOptions::new(&data_dir);

    build_index(&store, &embedder, &options).await.unwrap();

    write_csv(
        &table("Stores", &["store_id", "city"], &[&["10", "Lisbon"]]),
        &data_dir.join("Stores.csv"),
    )
    .unwrap();
    let outcome = build_index(&store, &embedder, &options).await.unwrap();

    assert!(matches!(outcome, IndexOutcome::Built { documents: 7, .. }));
    assert_eq!(store.count().await.unwrap(), 7);
    assert!(store.get("Stores.csv_2").await.unwrap().is_none());
}

#[tokio::test]
async fn test_force_and_model_change_rebuild() {
    setup_tracing();
    let dir = tempdir().unwrap();
    let data_dir = dir.path().join("csv_data");
    write_fixture(&data_dir);
    let store = VectorStore::open(dir.path().join("vector_db"), "table_rows")
        .await
        .unwrap();
    let mut options = IndexOptions::new(&data_dir);

    build_index(&store, &MockEmbedder::new(), &options).await.unwrap();

    let other_model = MockEmbedder::with_model("other-embed");
    let outcome = build_index(&store, &other_model, &options).await.unwrap();
    assert!(matches!(outcome, IndexOutcome::Built { .. }));

    options.force = true;
    let outcome = build_index(&store, &other_model, &options).await.unwrap();
    assert!(matches!(outcome, IndexOutcome::Built { .. }));
    assert_eq!(store.count().await.unwrap(), 9);
}

/// A rebuild removes the query cache; a skipped build keeps it.
#[tokio::test]
async fn test_rebuild_clears_query_cache() {
    setup_tracing();
    let dir = tempdir().unwrap();
    let data_dir = dir.path().join("csv_data");
    write_fixture(&data_dir);
    let store = VectorStore::open(dir.path().join("vector_db"), "table_rows")
        .await
        .unwrap();
    let embedder = MockEmbedder::new();
    let cache_path = dir.path().join("query_cache.json");
    let mut options = IndexOptions::new(&data_dir);
    options.cache_file = Some(cache_path.clone());

    std::fs::write(&cache_path, r#"{"entries":{}}"#).unwrap();
    let outcome = build_index(&store, &embedder, &options).await.unwrap();
    assert!(matches!(outcome, IndexOutcome::Built { .. }));
    assert!(!cache_path.exists());

    std::fs::write(&cache_path, r#"{"entries":{}}"#).unwrap();
    let outcome = build_index(&store, &embedder, &options).await.unwrap();
    assert!(matches!(outcome, IndexOutcome::Skipped { .. }));
    assert!(cache_path.exists());
}

/// An unreadable file is skipped and the readable ones are still indexed.
#[tokio::test]
async fn test_unreadable_file_is_skipped() {
    setup_tracing();
    let dir = tempdir().unwrap();
    let data_dir = dir.path().join("csv_data");
    write_fixture(&data_dir);
    std::fs::write(data_dir.join("Broken.parquet"), b"not a parquet file").unwrap();
    let store = VectorStore::open(dir.path().join("vector_db"), "table_rows")
        .await
        .unwrap();

    let tables = load_tables(&data_dir).unwrap();
    let names: Vec<&str> = tables.iter().map(|(filename, _)| filename.as_str()).collect();
    assert_eq!(names, vec!["Sales.csv", "Stores.csv"]);

    let outcome = build_index(&store, &MockEmbedder::new(), &IndexOptions::new(&data_dir))
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        IndexOutcome::Built {
            tables: 2,
            documents: 9,
            ..
        }
    ));
    assert!(store.get("schema_Broken.parquet").await.unwrap().is_none());
}

#[tokio::test]
async fn test_zero_batch_size_is_rejected() {
    let dir = tempdir().unwrap();
    let store = VectorStore::open(dir.path(), "table_rows").await.unwrap();
    let mut options = IndexOptions::new(dir.path());
    options.batch_size = 0;

    let result = build_index(&store, &MockEmbedder::new(), &options).await;
    assert!(matches!(result, Err(IndexError::InvalidBatchSize)));
}

#[tokio::test]
async fn test_missing_data_dir_is_an_error() {
    let dir = tempdir().unwrap();
    let store = VectorStore::open(dir.path().join("vector_db"), "table_rows")
        .await
        .unwrap();
    let options = IndexOptions::new(dir.path().join("does_not_exist"));

    let result = build_index(&store, &MockEmbedder::new(), &options).await;
    assert!(matches!(result, Err(IndexError::DataDir { .. })));
}

#[tokio::test]
async fn test_teardown_removes_query_cache() {
    setup_tracing();
    let dir = tempdir().unwrap();
    let store = VectorStore::open(dir.path().join("vector_db"), "table_rows")
        .await
        .unwrap();
    let cache_path = dir.path().join("query_cache.json");
    std::fs::write(&cache_path, r#"{"entries":{}}"#).unwrap();

    teardown(store, &cache_path).await;
    assert!(!cache_path.exists());

    // Nothing left to remove; teardown still completes.
    let store = VectorStore::open(dir.path().join("vector_db"), "table_rows")
        .await
        .unwrap();
    teardown(store, &cache_path).await;
}
