//! # Application Configuration
//!
//! Loads the `tablerag` configuration in layers:
//! 1. programmatic defaults from the library constants;
//! 2. an optional YAML file (`config.yml` in the working directory, or the
//!    `--config` override) with `${VAR}` substitution;
//! 3. `TABLERAG_...` environment variables (e.g. `TABLERAG_WAREHOUSE__DATASET`).

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::PathBuf;
use tablerag::constants::{
    DEFAULT_BATCH_SIZE, DEFAULT_CACHE_FILE, DEFAULT_COLLECTION, DEFAULT_CSV_DIR,
    DEFAULT_PARQUET_DIR, DEFAULT_STORE_DIR, DEFAULT_TABLES, DEFAULT_TOP_K, DEFAULT_WIDEN_FACTOR,
};
use tablerag::prompts::DEFAULT_ANSWER_PROMPT;
use tablerag::FlatFileFormat;
use tracing::info;

const DEFAULT_CONFIG_FILE: &str = "config.yml";

/// A custom error type for configuration issues.
#[derive(Debug)]
pub enum ConfigError {
    /// Indicates an error from the underlying `config` crate.
    General(String),
    /// Indicates an explicitly requested configuration file was not found.
    NotFound(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::General(msg) => write!(f, "Configuration error: {msg}"),
            ConfigError::NotFound(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::General(err.to_string())
    }
}

/// The root configuration structure, mapping directly to `config.yml`.
#[derive(Debug, Deserialize, Clone)]
#[allow(dead_code)]
pub struct AppConfig {
    pub warehouse: WarehouseConfig,
    pub extract: ExtractConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub index: IndexConfig,
    pub retrieve: RetrieveConfig,
    pub cache_file: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
#[allow(dead_code)]
pub struct WarehouseConfig {
    /// Falls back to `GOOGLE_CLOUD_PROJECT` when empty.
    #[serde(default)]
    pub project_id: String,
    pub dataset: String,
    pub tables: Vec<String>,
    /// Service-account key file. Application default credentials otherwise.
    #[serde(default)]
    pub key_file: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractConfig {
    pub format: FlatFileFormat,
    pub csv_dir: PathBuf,
    pub parquet_dir: PathBuf,
}

impl ExtractConfig {
    /// The directory the configured format is written to and indexed from.
    pub fn data_dir(&self) -> &PathBuf {
        match self.format {
            FlatFileFormat::Csv => &self.csv_dir,
            FlatFileFormat::Parquet => &self.parquet_dir,
        }
    }
}

/// Configuration for the embedding model provider.
#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    pub api_url: String,
    pub model_name: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Configuration for the local chat model.
#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    pub api_url: String,
    pub model_name: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub prompt_template: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    pub store_dir: PathBuf,
    pub collection: String,
    pub batch_size: usize,
    pub schema_docs: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrieveConfig {
    pub top_k: usize,
    pub widen_factor: usize,
}

// Helper to read a file, substitute env vars, and return its content.
// Returns Ok(None) if the file does not exist, or an error if it fails to read.
fn read_and_substitute(path: &str) -> Result<Option<String>, ConfigError> {
    if !std::path::Path::new(path).exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .map_err(|e| ConfigError::General(format!("Failed to read config file '{path}': {e}")))?;

    let re = Regex::new(r"\$\{(?P<var>[A-Z0-9_]+)\}")
        .map_err(|e| ConfigError::General(e.to_string()))?;
    let expanded_content = re.replace_all(&content, |caps: &regex::Captures| {
        let var_name = &caps["var"];
        env::var(var_name).unwrap_or_default()
    });

    Ok(Some(expanded_content.to_string()))
}

/// Loads the application configuration.
///
/// A missing default `config.yml` is fine (defaults and env apply); a missing
/// `--config` file is an error.
pub fn get_config(config_path_override: Option<&str>) -> Result<AppConfig, ConfigError> {
    let default_tables: Vec<String> = DEFAULT_TABLES.iter().map(|t| t.to_string()).collect();

    let mut builder = ConfigBuilder::builder()
        // Layer 1: Programmatic defaults.
        .set_default("warehouse.project_id", "")?
        .set_default("warehouse.dataset", "")?
        .set_default("warehouse.tables", default_tables)?
        .set_default("extract.format", "csv")?
        .set_default("extract.csv_dir", DEFAULT_CSV_DIR)?
        .set_default("extract.parquet_dir", DEFAULT_PARQUET_DIR)?
        .set_default("embedding.api_url", "http://localhost:11434/v1/embeddings")?
        .set_default("embedding.model_name", "mxbai-embed-large")?
        .set_default("llm.api_url", "http://localhost:11434/v1/chat/completions")?
        .set_default("llm.model_name", "llama3.2")?
        .set_default("llm.prompt_template", DEFAULT_ANSWER_PROMPT)?
        .set_default("index.store_dir", DEFAULT_STORE_DIR)?
        .set_default("index.collection", DEFAULT_COLLECTION)?
        .set_default("index.batch_size", DEFAULT_BATCH_SIZE as u64)?
        .set_default("index.schema_docs", true)?
        .set_default("retrieve.top_k", DEFAULT_TOP_K as u64)?
        .set_default("retrieve.widen_factor", DEFAULT_WIDEN_FACTOR as u64)?
        .set_default("cache_file", DEFAULT_CACHE_FILE)?;

    // Layer 2: YAML file.
    let config_path = config_path_override.unwrap_or(DEFAULT_CONFIG_FILE);
    match read_and_substitute(config_path)? {
        Some(content) => {
            info!("Loading configuration from '{config_path}'.");
            builder = builder.add_source(File::from_str(&content, FileFormat::Yaml));
        }
        None if config_path_override.is_some() => {
            return Err(ConfigError::NotFound(format!(
                "Config file not found at '{config_path}'."
            )));
        }
        None => info!("'{config_path}' not found. Using defaults and environment."),
    }

    let settings = builder
        // Layer 3: Prefixed environment variables for overrides.
        .add_source(
            Environment::with_prefix("TABLERAG")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("warehouse.tables"),
        )
        .build()?;

    let mut config: AppConfig = settings.try_deserialize()?;

    if config.warehouse.project_id.is_empty() {
        if let Ok(project) = env::var("GOOGLE_CLOUD_PROJECT") {
            config.warehouse.project_id = project;
        }
    }

    Ok(config)
}
