//! # Vector Store SQL
//!
//! This module centralizes the SQL used by the vector store. This keeps the
//! Rust side of the store free of schema details.

/// Holds every document of every collection.
pub const CREATE_DOCUMENTS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS documents (
        collection TEXT NOT NULL,
        id TEXT NOT NULL,
        kind TEXT NOT NULL,
        source TEXT NOT NULL,
        content TEXT NOT NULL,
        metadata TEXT NOT NULL,
        embedding BLOB NOT NULL,
        PRIMARY KEY (collection, id)
    );
";

/// One marker row per collection, describing the data it was built from.
pub const CREATE_INDEX_META_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS index_meta (
        collection TEXT PRIMARY KEY,
        marker TEXT NOT NULL,
        document_count INTEGER NOT NULL,
        built_at TEXT NOT NULL
    );
";

pub const ALL_TABLE_CREATION_SQL: [&str; 2] = [CREATE_DOCUMENTS_TABLE, CREATE_INDEX_META_TABLE];

pub const INSERT_DOCUMENT: &str = "
    INSERT INTO documents (collection, id, kind, source, content, metadata, embedding)
    VALUES (?, ?, ?, ?, ?, ?, ?);
";

pub const SELECT_DOCUMENT_BY_ID: &str = "
    SELECT id, kind, source, content, metadata
    FROM documents
    WHERE collection = ? AND id = ?;
";

pub const SELECT_DOCUMENTS_BY_KIND: &str = "
    SELECT id, kind, source, content, metadata
    FROM documents
    WHERE collection = ? AND kind = ?
    ORDER BY id ASC;
";

pub const COUNT_DOCUMENTS: &str = "SELECT COUNT(*) FROM documents WHERE collection = ?;";

pub const DELETE_COLLECTION_DOCUMENTS: &str = "DELETE FROM documents WHERE collection = ?;";

pub const SELECT_MARKER: &str = "SELECT marker FROM index_meta WHERE collection = ?;";

pub const DELETE_MARKER: &str = "DELETE FROM index_meta WHERE collection = ?;";

pub const INSERT_MARKER: &str = "
    INSERT INTO index_meta (collection, marker, document_count, built_at)
    VALUES (?, ?, ?, ?);
";

/// Returns the cosine-distance search over one collection.
///
/// Turso's vector functions expect the query vector as a literal, so the caller
/// formats it with [`vector_literal`]. The collection is bound as `?`.
pub fn similarity_search(query_vector: &str, limit: usize) -> String {
    format!(
        "
        SELECT id, kind, source, content, metadata,
               vector_distance_cos(embedding, {query_vector}) AS distance
        FROM documents
        WHERE collection = ?
        ORDER BY distance ASC
        LIMIT {limit};
    "
    )
}

/// Formats a vector as a `vector32('[...]')` literal.
pub fn vector_literal(vector: &[f32]) -> String {
    format!(
        "vector32('[{}]')",
        vector
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    )
}
