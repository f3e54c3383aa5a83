//! # Query Cache
//!
//! A small JSON file mapping questions to the answers already produced for
//! them. Keys are the md5 of the trimmed, lowercased question. The cache is
//! removed on teardown and whenever the index is rebuilt.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Query cache I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Query cache is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheFile {
    entries: HashMap<String, String>,
}

#[derive(Debug)]
pub struct QueryCache {
    path: PathBuf,
    file: CacheFile,
}

impl QueryCache {
    /// Loads the cache at `path`; a missing file is an empty cache.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let path = path.into();
        let file = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            CacheFile::default()
        };
        debug!(
            "Loaded query cache '{}' with {} entries",
            path.display(),
            file.entries.len()
        );
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.file.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.file.entries.is_empty()
    }

    pub fn get(&self, question: &str) -> Option<&str> {
        self.file
            .entries
            .get(&cache_key(question))
            .map(String::as_str)
    }

    /// Stores an answer and writes the cache back to disk.
    pub fn insert(&mut self, question: &str, answer: &str) -> Result<(), CacheError> {
        self.file
            .entries
            .insert(cache_key(question), answer.to_string());
        self.save()
    }

    fn save(&self) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&self.file)?)?;
        Ok(())
    }

    /// Deletes the cache file. A missing file is not an error.
    pub fn remove_file(path: &Path) -> Result<(), CacheError> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn cache_key(question: &str) -> String {
    format!("{:x}", md5::compute(question.trim().to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_normalizes_case_and_whitespace() {
        assert_eq!(cache_key("  Total Sales? "), cache_key("total sales?"));
        assert_ne!(cache_key("total sales"), cache_key("total stores"));
    }

    #[test]
    fn test_insert_persists_and_remove_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache").join("query_cache.json");

        let mut cache = QueryCache::load(&path).unwrap();
        assert!(cache.is_empty());
        cache.insert("How many stores?", "Three.").unwrap();

        let reloaded = QueryCache::load(&path).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.get("how many stores?"), Some("Three."));

        QueryCache::remove_file(&path).unwrap();
        assert!(!path.exists());
        QueryCache::remove_file(&path).unwrap();
    }
}
