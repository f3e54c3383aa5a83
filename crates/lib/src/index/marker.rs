//! # Index Marker
//!
//! A collection is rebuilt only when the data it was built from changes. The
//! marker is an md5 digest over every flat file (name and bytes, in name
//! order), the embedding model, and whether schema documents are included.

use std::path::{Path, PathBuf};

/// Lists the `.csv` and `.parquet` files of `data_dir`, sorted by file name.
pub fn list_data_files(data_dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(data_dir)? {
        let path = entry?.path();
        let is_data_file = path.is_file()
            && path
                .extension()
                .and_then(|e| e.to_str())
                .and_then(crate::types::FlatFileFormat::from_extension)
                .is_some();
        if is_data_file {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Computes the marker for `files` (already sorted).
pub fn compute_marker(
    files: &[PathBuf],
    embedding_model: &str,
    schema_docs: bool,
) -> std::io::Result<String> {
    let mut buffer = Vec::new();
    buffer.extend_from_slice(format!("model={embedding_model};schema={schema_docs};").as_bytes());

    for path in files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let bytes = std::fs::read(path)?;
        buffer.extend_from_slice(format!("{name}:{}:", bytes.len()).as_bytes());
        buffer.extend_from_slice(&bytes);
    }

    Ok(format!("{:x}", md5::compute(&buffer)))
}
