//! # Configuration Tests
//!
//! `tablerag-cli` is a binary crate, so the config module is included directly
//! from its source file.

#[path = "../src/config.rs"]
mod config;

use self::config::{get_config, ConfigError};
use std::env;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use tablerag::FlatFileFormat;
use tempfile::NamedTempFile;

// Environment variables are process-global; tests that touch them run one at a time.
static ENV_LOCK: Mutex<()> = Mutex::new(());

const ENV_VARS: &[&str] = &[
    "TABLERAG_WAREHOUSE__PROJECT_ID",
    "TABLERAG_WAREHOUSE__DATASET",
    "TABLERAG_WAREHOUSE__TABLES",
    "TABLERAG_INDEX__BATCH_SIZE",
    "TABLERAG_EXTRACT__FORMAT",
    "GOOGLE_CLOUD_PROJECT",
    "TEST_TABLERAG_DATASET",
];

fn clear_env_vars() {
    for var in ENV_VARS {
        env::remove_var(var);
    }
}

fn yaml_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_defaults_without_config_file() {
    let _lock = ENV_LOCK.lock().unwrap();
    clear_env_vars();

    let config = get_config(None).expect("Defaults should load");

    assert_eq!(config.warehouse.tables.len(), 10);
    assert_eq!(config.warehouse.tables[0], "Customers");
    assert_eq!(config.warehouse.tables[9], "Ratings");
    assert_eq!(config.extract.format, FlatFileFormat::Csv);
    assert_eq!(config.extract.data_dir(), &PathBuf::from("csv_data"));
    assert_eq!(config.embedding.model_name, "mxbai-embed-large");
    assert_eq!(config.llm.model_name, "llama3.2");
    assert!(config.llm.prompt_template.contains("{question}"));
    assert_eq!(config.index.store_dir, PathBuf::from("vector_db"));
    assert_eq!(config.index.collection, "table_rows");
    assert_eq!(config.index.batch_size, 64);
    assert!(config.index.schema_docs);
    assert_eq!(config.retrieve.top_k, 10);
    assert_eq!(config.retrieve.widen_factor, 3);
    assert_eq!(config.cache_file, PathBuf::from("query_cache.json"));
    assert!(config.warehouse.key_file.is_none());
}

#[test]
fn test_yaml_file_with_substitution() {
    let _lock = ENV_LOCK.lock().unwrap();
    clear_env_vars();
    env::set_var("TEST_TABLERAG_DATASET", "retail");

    let file = yaml_file(
        r#"
warehouse:
  project_id: my-project
  dataset: ${TEST_TABLERAG_DATASET}
  tables: [Sales, Stores]
extract:
  format: parquet
index:
  batch_size: 16
retrieve:
  top_k: 4
"#,
    );
    let config = get_config(file.path().to_str()).expect("Config file should load");

    assert_eq!(config.warehouse.project_id, "my-project");
    assert_eq!(config.warehouse.dataset, "retail");
    assert_eq!(config.warehouse.tables, vec!["Sales", "Stores"]);
    assert_eq!(config.extract.format, FlatFileFormat::Parquet);
    assert_eq!(config.extract.data_dir(), &PathBuf::from("parquet_data"));
    assert_eq!(config.index.batch_size, 16);
    assert_eq!(config.retrieve.top_k, 4);
    // Untouched sections keep their defaults.
    assert_eq!(config.retrieve.widen_factor, 3);

    clear_env_vars();
}

#[test]
fn test_env_overrides_file() {
    let _lock = ENV_LOCK.lock().unwrap();
    clear_env_vars();
    env::set_var("TABLERAG_WAREHOUSE__DATASET", "from_env");
    env::set_var("TABLERAG_WAREHOUSE__TABLES", "Sales,Ratings");
    env::set_var("TABLERAG_INDEX__BATCH_SIZE", "8");

    let file = yaml_file("warehouse:\n  dataset: from_file\n");
    let config = get_config(file.path().to_str()).unwrap();

    assert_eq!(config.warehouse.dataset, "from_env");
    assert_eq!(config.warehouse.tables, vec!["Sales", "Ratings"]);
    assert_eq!(config.index.batch_size, 8);

    clear_env_vars();
}

#[test]
fn test_project_id_falls_back_to_google_cloud_project() {
    let _lock = ENV_LOCK.lock().unwrap();
    clear_env_vars();
    env::set_var("GOOGLE_CLOUD_PROJECT", "adc-project");

    let config = get_config(None).unwrap();
    assert_eq!(config.warehouse.project_id, "adc-project");

    clear_env_vars();
}

#[test]
fn test_missing_explicit_config_file() {
    let _lock = ENV_LOCK.lock().unwrap();
    clear_env_vars();

    let result = get_config(Some("/definitely/not/here/config.yml"));
    assert!(matches!(result, Err(ConfigError::NotFound(_))));
}
